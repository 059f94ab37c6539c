//! Generate migration properties from a CSV of bucket pairs.
//!
//! Each row of the CSV describes a source and a target bucket, along with
//! the endpoints, users and groups owning them. Credentials for both sides
//! are resolved through the admin APIs, and the result is written out as a
//! properties file per source bucket. Rows are handled strictly in order,
//! and the first failure halts the whole run.
use clap::ArgMatches;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::admin::{AdminTransport, HttpAdmin};
use crate::cli;
use crate::config::{AdminEndpoint, Config, Side};
use crate::credentials::{CredentialResolver, KeyProvisioning, UserCredentials};
use crate::probe::{Prober, Reachability, ADMIN_PORT, S3_PORT};
use crate::types::UtilResult;

pub mod properties;
pub mod row;

use self::properties::BucketInfo;
use self::row::{Location, RawRow};

/// Options controlling a preparation run.
#[derive(Clone, Debug)]
pub struct Options {
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

/// Executes the pipeline based on the parsed arguments from the CLI.
pub async fn exec(args: &ArgMatches<'_>) -> UtilResult<()> {
    // validate input before touching config or network
    let csv_path = cli::get_csv_path(args)?;
    info!("Got the {} file as input from the commandline", csv_path.display());

    let config_path = cli::get_config_path(args);
    info!("Reading the config file {}", config_path.display());

    let config = Config::load(&config_path)?;
    info!("Source details: {:?}", config.source);
    info!("Target details: {:?}", config.target);

    let provisioning = cli::get_create_keys(args)?;
    let prober = Prober::new(
        cli::get_probe_timeout(args)?,
        cli::is_reachability_required(args),
    );
    let options = Options {
        output_dir: cli::get_output_dir(args),
        dry_run: cli::is_dry_run(args),
    };

    let admin = HttpAdmin::new()?;
    let pipeline = Pipeline::new(&config, &admin, &provisioning, &prober, &options);
    let written = pipeline.run(&csv_path).await?;

    if options.dry_run {
        info!("Dry run complete, {} bucket(s) resolved", written.len());
    } else {
        info!("Wrote {} properties file(s)", written.len());
    }

    Ok(())
}

/// Row processor tying together probes, credentials and output.
pub struct Pipeline<'a, T, K, P> {
    config: &'a Config,
    resolver: CredentialResolver<'a, T, K>,
    prober: &'a P,
    options: &'a Options,
}

impl<'a, T, K, P> Pipeline<'a, T, K, P>
where
    T: AdminTransport,
    K: KeyProvisioning,
    P: Reachability,
{
    /// Constructs a new `Pipeline`.
    pub fn new(
        config: &'a Config,
        transport: &'a T,
        provisioning: &'a K,
        prober: &'a P,
        options: &'a Options,
    ) -> Self {
        Self {
            config,
            resolver: CredentialResolver::new(transport, provisioning),
            prober,
            options,
        }
    }

    /// Processes every row of the CSV file at the provided path.
    ///
    /// Returns the properties paths written (or, in a dry run, the paths
    /// which would have been written).
    pub async fn run(&self, csv_path: &Path) -> UtilResult<Vec<PathBuf>> {
        info!("Reading the CSV file {}", csv_path.display());

        let mut reader = csv::Reader::from_path(csv_path)?;
        let headers = reader.headers()?.clone();

        let mut written = Vec::new();

        for (idx, record) in reader.records().enumerate() {
            let raw = RawRow::from_record(&headers, &record?);
            written.push(self.process(raw, idx + 1).await?);
        }

        Ok(written)
    }

    /// Processes a single row, returning the properties path.
    pub async fn process(&self, raw: RawRow, row: usize) -> UtilResult<PathBuf> {
        let start = Instant::now();

        let source = raw.source.into_location(Side::Source, row)?;
        let target = raw.target.into_location(Side::Target, row)?;

        info!("Collecting the details of *** BUCKET: {} ***", source.bucket);

        // both sides must be located before any admin call
        let source_admin = self.locate(Side::Source, &source).await?;
        let target_admin = self.locate(Side::Target, &target).await?;

        let source_credentials = self.resolve(Side::Source, source_admin, &source).await?;
        let target_credentials = self.resolve(Side::Target, target_admin, &target).await?;

        let info = BucketInfo {
            source,
            target,
            source_credentials,
            target_credentials,
        };

        let path = if self.options.dry_run {
            let path = self
                .options
                .output_dir
                .join(properties::file_name(&info.source.bucket));
            info!("Dry run, skipping write of {}", path.display());
            path
        } else {
            info!("Generating properties file for {}", info.source.bucket);
            properties::write(&self.options.output_dir, &info, self.config)?
        };

        info!(
            "Properties for {} created at {} in {}",
            info.source.bucket,
            path.display(),
            humantime::format_duration(truncate_millis(start.elapsed()))
        );

        Ok(path)
    }

    /// Probes the endpoints of a location and finds its admin endpoint.
    async fn locate(&self, side: Side, location: &Location) -> UtilResult<&'a AdminEndpoint> {
        info!(
            "Checking if the {} s3 end point is reachable {}:{}",
            side, location.endpoint, S3_PORT
        );
        self.prober.check(&location.endpoint, S3_PORT).await?;

        let admin = self
            .config
            .side(side)
            .admin_for(side, &location.region)?;

        info!(
            "Checking if the {} admin end point is reachable {}:{}",
            side, admin.url, ADMIN_PORT
        );
        self.prober.check(&admin.host()?, ADMIN_PORT).await?;

        Ok(admin)
    }

    /// Resolves the credentials of a location through its admin endpoint.
    async fn resolve(
        &self,
        side: Side,
        admin: &AdminEndpoint,
        location: &Location,
    ) -> UtilResult<UserCredentials> {
        info!(
            "Connecting to {} admin service for credentials of user {}",
            side, location.user
        );
        self.resolver
            .resolve(admin, &location.user, &location.group)
            .await
    }
}

/// Drops sub-millisecond precision for friendlier duration output.
fn truncate_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
