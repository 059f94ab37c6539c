//! TCP reachability checks for S3 and admin endpoints.
//!
//! A probe only opens and closes a connection; nothing is sent. The result
//! is advisory unless the prober was constructed as strict, in which case
//! an unreachable endpoint becomes an error.
use tokio::net::TcpStream;
use tokio::time;

use std::time::Duration;

use crate::types::{UtilError, UtilResult};

/// Port S3 endpoints are expected to listen on.
pub const S3_PORT: u16 = 443;

/// Port admin endpoints are expected to listen on.
pub const ADMIN_PORT: u16 = 19443;

/// Reachability checks run before talking to an endpoint.
#[allow(async_fn_in_trait)]
pub trait Reachability {
    /// Checks a host/port pair, returning an error if the run should stop.
    async fn check(&self, host: &str, port: u16) -> UtilResult<()>;
}

/// Connection prober with an optional timeout.
#[derive(Clone, Debug, Default)]
pub struct Prober {
    timeout: Option<Duration>,
    strict: bool,
}

impl Prober {
    /// Constructs a new `Prober`.
    ///
    /// Without a timeout, the platform default for TCP connects applies.
    pub fn new(timeout: Option<Duration>, strict: bool) -> Self {
        Self { timeout, strict }
    }

    /// Attempts a connection to the provided host/port pair.
    pub async fn is_open(&self, host: &str, port: u16) -> bool {
        let connect = TcpStream::connect((host, port));

        let result = match self.timeout {
            Some(timeout) => match time::timeout(timeout, connect).await {
                Ok(result) => result,
                Err(_) => {
                    error!("End point is not reachable {}:{} (timed out)", host, port);
                    return false;
                }
            },
            None => connect.await,
        };

        match result {
            Ok(_stream) => {
                info!("End point reachable {}:{}", host, port);
                true
            }
            Err(err) => {
                error!("End point is not reachable {}:{} ({})", host, port, err);
                false
            }
        }
    }
}

impl Reachability for Prober {
    /// Probes an endpoint, failing only when this prober is strict.
    async fn check(&self, host: &str, port: u16) -> UtilResult<()> {
        if self.is_open(host, port).await || !self.strict {
            return Ok(());
        }
        Err(UtilError::network(format!(
            "end point is not reachable {}:{}",
            host, port
        )))
    }
}
