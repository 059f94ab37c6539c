//! Preparation tool for bucket to bucket S3 migrations.
//!
//! This tool reads a CSV of source/target bucket pairs, resolves the S3
//! credentials of the owning users through the storage admin APIs, and
//! writes a `migration.properties.<bucket>` file per pair for use by the
//! migration job itself. Please see the main documentation in the
//! repository for the configuration format.
#[macro_use]
extern crate log as logger;

use std::process;

mod admin;
mod cli;
mod config;
mod credentials;
mod log;
mod probe;
mod types;

mod prepare;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // build the CLI and grab all arguments
    let args = cli::build().get_matches();

    // initialize logging
    if let Err(err) = log::init(&args) {
        eprintln!("Unable to initialize logging: {}", err);
        process::exit(1);
    }

    // delegate to the pipeline, any failure is fatal
    if let Err(err) = prepare::exec(&args).await {
        error!("{}", err);
        logger::logger().flush();
        process::exit(1);
    }
}
