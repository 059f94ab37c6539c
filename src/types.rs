//! Types module for the main runtime, exposing error and result types.
//!
//! Most code in this module is based around coercion of error types into
//! a common error type, to be used as the general "Error" of this crate.
use logger::SetLoggerError;

use std::fmt::{self, Debug, Display, Formatter};
use std::io;

/// Public type alias for a result with a `UtilError` error type.
pub type UtilResult<T> = Result<T, UtilError>;

/// Delegating error wrapper for errors raised during preparation.
///
/// The internal `String` representation enables cheap coercion from
/// other error types by binding their error messages through. Every
/// error is fatal to the run, so there is no need to keep the source
/// error around once it has been rendered.
pub struct UtilError(String);

impl UtilError {
    /// Creates an error describing a bad or missing configuration value.
    pub fn config<T: Display>(msg: T) -> Self {
        UtilError(format!("Invalid configuration: {}", msg))
    }

    /// Creates an error describing missing or malformed input data.
    pub fn data<T: Display>(msg: T) -> Self {
        UtilError(format!("Invalid input data: {}", msg))
    }

    /// Creates an error describing an unexpected admin API response.
    pub fn api<T: Display>(msg: T) -> Self {
        UtilError(format!("Unexpected admin API response: {}", msg))
    }

    /// Creates an error describing an unreachable endpoint.
    pub fn network<T: Display>(msg: T) -> Self {
        UtilError(format!("Network failure: {}", msg))
    }
}

/// Debug implementation for `UtilError`.
impl Debug for UtilError {
    /// Formats an `UtilError` by delegating to `Display`.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Display implementation for `UtilError`.
impl Display for UtilError {
    /// Formats an `UtilError` by writing out the inner representation.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Macro to implement `From` for provided types.
macro_rules! derive_from {
    ($type:ty) => {
        impl<'a> From<$type> for UtilError {
            fn from(t: $type) -> UtilError {
                UtilError(t.to_string())
            }
        }
    };
}

// Easy derivations of derive_from.
derive_from!(&'a str);
derive_from!(io::Error);
derive_from!(clap::Error);
derive_from!(csv::Error);
derive_from!(dialoguer::Error);
derive_from!(humantime::DurationError);
derive_from!(reqwest::Error);
derive_from!(serde_json::Error);
derive_from!(SetLoggerError);
derive_from!(String);
