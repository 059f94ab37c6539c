//! Rendering of migration properties files.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, Side};
use crate::credentials::UserCredentials;
use crate::types::{UtilError, UtilResult};

use super::row::Location;

/// Fully resolved bucket pair, ready to be written out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketInfo {
    pub source: Location,
    pub target: Location,
    pub source_credentials: UserCredentials,
    pub target_credentials: UserCredentials,
}

impl BucketInfo {
    fn side(&self, side: Side) -> (&Location, &UserCredentials) {
        match side {
            Side::Source => (&self.source, &self.source_credentials),
            Side::Target => (&self.target, &self.target_credentials),
        }
    }
}

/// Returns the file name of the properties for a source bucket.
pub fn file_name(bucket: &str) -> String {
    format!("migration.properties.{}", bucket)
}

/// Renders the properties content for a bucket pair.
pub fn render(info: &BucketInfo, config: &Config) -> String {
    let mut output = String::new();

    for side in [Side::Source, Side::Target] {
        let (location, creds) = info.side(side);
        let prefix = side.as_str();

        // writing into a String cannot fail
        let _ = writeln!(output, "{}.bucket={}", prefix, location.bucket);
        let _ = writeln!(output, "{}.endpoint=https://{}", prefix, location.endpoint);
        let _ = writeln!(output, "{}.region={}", prefix, location.region);
        let _ = writeln!(output, "{}.provider={}", prefix, config.side(side).provider);
        let _ = writeln!(output, "{}.access.key={}", prefix, creds.access_key);
        let _ = writeln!(output, "{}.secret.key={}", prefix, creds.secret_key);
        let _ = writeln!(output, "{}.user.id={}", prefix, creds.user_id);
        output.push('\n');
    }

    let _ = writeln!(
        output,
        "target.sourceUser.map={}|{}",
        info.source_credentials.user_id, info.target_credentials.user_id
    );
    let _ = writeln!(output, "client.timeout={}", config.client_timeout());

    output
}

/// Writes the properties for a bucket pair into the provided directory.
///
/// Any existing file is overwritten. The file is checked for existence
/// afterwards, and the path written is returned.
pub fn write(dir: &Path, info: &BucketInfo, config: &Config) -> UtilResult<PathBuf> {
    let path = dir.join(file_name(&info.source.bucket));

    fs::write(&path, render(info, config))?;

    if !path.is_file() {
        return Err(UtilError::from(format!(
            "Failed to create {}",
            path.display()
        )));
    }

    Ok(path)
}
