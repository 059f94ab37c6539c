//! CLI bindings for the preparation pipeline.
//!
//! This module focuses on the CLI bindings required to drive the pipeline,
//! as well as utilities for fetching and validating common switches and
//! values before any work begins.
use clap::{App, AppSettings, Arg, ArgMatches};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::credentials::CreateKeys;
use crate::log::DEFAULT_LOG_FILE;
use crate::types::{UtilError, UtilResult};

/// Constructs a new CLI application using Clap.
///
/// All metadata is fetched dynamically from Cargo and shouldn't require to
/// be updated (ever).
pub fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("")
        .name(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .args(&[
            Arg::with_name("csv")
                .help("A CSV file describing source/target bucket pairs")
                .index(1)
                .required(true),
            Arg::with_name("config")
                .help("Path to the JSON admin endpoint configuration")
                .short("c")
                .long("config")
                .takes_value(true)
                .default_value(DEFAULT_CONFIG_FILE),
            Arg::with_name("output-dir")
                .help("Directory to write properties files into")
                .short("o")
                .long("output-dir")
                .takes_value(true)
                .default_value("."),
            Arg::with_name("log-file")
                .help("Path of the rotating log file")
                .short("l")
                .long("log-file")
                .takes_value(true)
                .default_value(DEFAULT_LOG_FILE),
            Arg::with_name("create-keys")
                .help("Whether to create S3 keys for users without any active")
                .long("create-keys")
                .takes_value(true)
                .possible_values(&["ask", "always", "never"])
                .default_value("ask"),
            Arg::with_name("probe-timeout")
                .help("Timeout for endpoint reachability checks (e.g. 5s)")
                .long("probe-timeout")
                .takes_value(true),
            Arg::with_name("require-reachable")
                .help("Abort when an endpoint reachability check fails")
                .long("require-reachable"),
            Arg::with_name("dry")
                .help("Resolve all credentials without writing files")
                .short("d")
                .long("dry-run"),
            Arg::with_name("quiet")
                .help("Only prints errors during execution")
                .short("q")
                .long("quiet")
                .conflicts_with("verbose"),
            Arg::with_name("verbose")
                .help("Prints progress messages during execution")
                .short("v")
                .long("verbose"),
        ])
        .settings(&[AppSettings::ArgRequiredElseHelp])
}

/// Fetches and validates the CSV input path.
///
/// The path must carry a `.csv` extension and point to an existing file;
/// this runs before any configuration or network access happens.
pub fn get_csv_path(args: &ArgMatches<'_>) -> UtilResult<PathBuf> {
    // required, so clap guarantees presence
    let path = Path::new(args.value_of("csv").unwrap_or_default());

    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if !is_csv || !path.is_file() {
        return Err(UtilError::data(format!(
            "not in CSV format or CSV file not found: {}",
            path.display()
        )));
    }

    Ok(path.to_path_buf())
}

/// Fetches the configuration file path.
pub fn get_config_path(args: &ArgMatches<'_>) -> PathBuf {
    PathBuf::from(args.value_of("config").unwrap_or(DEFAULT_CONFIG_FILE))
}

/// Fetches the directory to write properties files into.
pub fn get_output_dir(args: &ArgMatches<'_>) -> PathBuf {
    PathBuf::from(args.value_of("output-dir").unwrap_or("."))
}

/// Fetches the key creation policy.
pub fn get_create_keys(args: &ArgMatches<'_>) -> UtilResult<CreateKeys> {
    args.value_of("create-keys").unwrap_or("ask").parse()
}

/// Fetches the optional reachability probe timeout.
pub fn get_probe_timeout(args: &ArgMatches<'_>) -> UtilResult<Option<Duration>> {
    match args.value_of("probe-timeout") {
        Some(value) => Ok(Some(humantime::parse_duration(value)?)),
        None => Ok(None),
    }
}

/// Determines if failed reachability checks should abort the run.
pub fn is_reachability_required(args: &ArgMatches<'_>) -> bool {
    args.is_present("require-reachable")
}

/// Determines if the dry-run switch was provided in this execution.
pub fn is_dry_run(args: &ArgMatches<'_>) -> bool {
    args.is_present("dry")
}
