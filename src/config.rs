//! Admin endpoint configuration for both sides of a migration.
//!
//! The configuration is a JSON document read once at startup. Its shape is
//! enforced entirely through deserialization, so anything reaching the rest
//! of the pipeline has every section it needs.
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

use crate::types::{UtilError, UtilResult};

/// Default location of the configuration, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".config.json";

/// Top level configuration, split by migration side.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub source: SideConfig,
    pub target: SideConfig,
    #[serde(rename = "connectiontimeout")]
    pub connection_timeout: Value,
}

/// Configuration of either the source or the target storage cluster.
#[derive(Debug, Deserialize)]
pub struct SideConfig {
    /// Admin endpoints keyed by region token.
    pub region: BTreeMap<String, AdminEndpoint>,
    /// Provider label handed through to the migration job.
    pub provider: String,
}

/// Location and password of a single admin API.
#[derive(Clone, Deserialize)]
pub struct AdminEndpoint {
    #[serde(rename = "adminurl")]
    pub url: String,
    #[serde(rename = "adminpass")]
    pub password: String,
}

/// Which side of the migration a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    /// Returns the key prefix used for this side.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Loads and parses the configuration from the provided path.
    pub fn load<P: AsRef<Path>>(path: P) -> UtilResult<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            UtilError::config(format!("unable to read {}: {}", path.display(), err))
        })?;
        Config::parse(&content)
            .map_err(|err| UtilError::config(format!("unable to parse {}: {}", path.display(), err)))
    }

    /// Parses a configuration from a JSON string.
    pub fn parse(content: &str) -> UtilResult<Config> {
        Ok(serde_json::from_str(content)?)
    }

    /// Retrieves the configuration for a side.
    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// Renders the client timeout as it should appear in properties.
    ///
    /// Strings are written without their quotes; everything else is
    /// written in its JSON form.
    pub fn client_timeout(&self) -> String {
        match &self.connection_timeout {
            Value::String(value) => value.clone(),
            other => other.to_string(),
        }
    }
}

impl SideConfig {
    /// Looks up the admin endpoint serving the provided region token.
    pub fn admin_for(&self, side: Side, region: &str) -> UtilResult<&AdminEndpoint> {
        self.region.get(region).ok_or_else(|| {
            UtilError::data(format!(
                "no {} admin endpoint configured for region '{}'",
                side, region
            ))
        })
    }
}

impl AdminEndpoint {
    /// Extracts the host name from the admin URL.
    ///
    /// Any scheme, port, path or credentials are stripped, leaving only
    /// the host to probe for reachability.
    pub fn host(&self) -> UtilResult<String> {
        let raw = self.url.trim();

        // bare `host:port` values parse as a scheme without one
        let parsed = if raw.contains("://") {
            Url::parse(raw)
        } else {
            Url::parse(&format!("https://{}", raw))
        };

        parsed
            .ok()
            .as_ref()
            .and_then(Url::host_str)
            .map(|host| host.trim_start_matches('[').trim_end_matches(']'))
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .ok_or_else(|| UtilError::config(format!("no host in admin url '{}'", self.url)))
    }
}

/// Debug implementation which keeps passwords out of the logs.
impl fmt::Debug for AdminEndpoint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("AdminEndpoint")
            .field("url", &self.url)
            .field("password", &"<redacted>")
            .finish()
    }
}
