//! HTTP access to the storage admin API.
//!
//! Every call is scoped to a user/group pair and authenticated with the
//! system administrator account of the targeted admin endpoint.
use reqwest::{Client, Method};

use crate::config::AdminEndpoint;
use crate::types::UtilResult;

/// Administrative account used for every admin API call.
const ADMIN_USER: &str = "sysadmin";

/// Status and raw body of an admin API response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminResponse {
    pub status: u16,
    pub body: String,
}

/// Transport used to issue admin API requests.
///
/// Implementations only need to carry out a request and hand back the
/// status and body; interpreting either is up to the caller.
#[allow(async_fn_in_trait)]
pub trait AdminTransport {
    /// Sends a request for `path` on behalf of a user/group pair.
    async fn send(
        &self,
        method: Method,
        endpoint: &AdminEndpoint,
        path: &str,
        user: &str,
        group: &str,
    ) -> UtilResult<AdminResponse>;
}

/// Admin transport backed by a `reqwest` client.
///
/// Admin endpoints typically present self-signed certificates, so
/// certificate validation is disabled for this client.
pub struct HttpAdmin {
    client: Client,
}

impl HttpAdmin {
    /// Constructs a new `HttpAdmin` client.
    pub fn new() -> UtilResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }
}

impl AdminTransport for HttpAdmin {
    async fn send(
        &self,
        method: Method,
        endpoint: &AdminEndpoint,
        path: &str,
        user: &str,
        group: &str,
    ) -> UtilResult<AdminResponse> {
        let url = admin_url(endpoint, path);

        let response = self
            .client
            .request(method, &url)
            .basic_auth(ADMIN_USER, Some(&endpoint.password))
            .query(&[("userId", user), ("groupId", group)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(AdminResponse { status, body })
    }
}

/// Joins an admin endpoint and a request path.
fn admin_url(endpoint: &AdminEndpoint, path: &str) -> String {
    format!("{}{}", endpoint.url.trim().trim_end_matches('/'), path)
}
