//! Resolution of S3 credentials through the admin API.
//!
//! Resolving a user/group pair is a two step affair: the canonical user ID
//! is looked up first, followed by the list of active S3 keys. When a user
//! has no active keys, a `KeyProvisioning` policy decides whether to create
//! a new pair rather than giving up.
use dialoguer::Confirm;
use reqwest::Method;
use serde::Deserialize;

use std::io::{self, BufRead, IsTerminal};
use std::str::FromStr;

use crate::admin::{AdminResponse, AdminTransport};
use crate::config::AdminEndpoint;
use crate::types::{UtilError, UtilResult};

/// Canonical user ID plus an active key pair for a user/group pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredentials {
    pub user_id: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Decision provider for users without any active S3 keys.
pub trait KeyProvisioning {
    /// Returns whether new keys should be created for the user/group pair.
    fn should_create(&self, user: &str, group: &str) -> UtilResult<bool>;
}

/// Key creation policies selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateKeys {
    /// Ask the operator on the terminal.
    Ask,
    /// Create keys without asking.
    Always,
    /// Never create keys.
    Never,
}

impl FromStr for CreateKeys {
    type Err = UtilError;

    fn from_str(value: &str) -> UtilResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ask" => Ok(CreateKeys::Ask),
            "always" => Ok(CreateKeys::Always),
            "never" => Ok(CreateKeys::Never),
            other => Err(UtilError::config(format!(
                "unknown key creation policy '{}'",
                other
            ))),
        }
    }
}

impl KeyProvisioning for CreateKeys {
    fn should_create(&self, user: &str, group: &str) -> UtilResult<bool> {
        match self {
            CreateKeys::Always => Ok(true),
            CreateKeys::Never => Ok(false),
            CreateKeys::Ask => {
                let prompt = format!(
                    "No active S3 keys found for {}/{}. Would you like to create one?",
                    group, user
                );

                // piped input (e.g. `yes | ...`) gets a plain line read
                if !io::stdin().is_terminal() {
                    eprintln!("{} (y/N): ", prompt);
                    return read_answer(io::stdin().lock());
                }

                Ok(Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()?)
            }
        }
    }
}

/// Reads a yes/no answer from a single line of input.
///
/// Only `y` and `yes` (in any case) count as agreement; anything else,
/// including the end of input, is treated as a refusal.
pub fn read_answer<R: BufRead>(mut input: R) -> UtilResult<bool> {
    let mut line = String::new();
    input.read_line(&mut line)?;

    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Canonical user lookup response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalUser {
    canonical_user_id: String,
    active: Option<ActiveFlag>,
}

/// Activity flag, which admin APIs emit as either a boolean or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ActiveFlag {
    Bool(bool),
    Text(String),
}

impl ActiveFlag {
    fn is_active(&self) -> bool {
        match self {
            ActiveFlag::Bool(active) => *active,
            ActiveFlag::Text(active) => !active.eq_ignore_ascii_case("false"),
        }
    }
}

/// S3 key pair as returned by the credential endpoints.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPair {
    access_key: String,
    secret_key: String,
}

/// Resolves credentials using a transport and a key provisioning policy.
pub struct CredentialResolver<'a, T, K> {
    transport: &'a T,
    provisioning: &'a K,
}

impl<'a, T, K> CredentialResolver<'a, T, K>
where
    T: AdminTransport,
    K: KeyProvisioning,
{
    /// Constructs a new `CredentialResolver`.
    pub fn new(transport: &'a T, provisioning: &'a K) -> Self {
        Self {
            transport,
            provisioning,
        }
    }

    /// Resolves the canonical ID and an active key pair for a user/group.
    pub async fn resolve(
        &self,
        endpoint: &AdminEndpoint,
        user: &str,
        group: &str,
    ) -> UtilResult<UserCredentials> {
        let user_id = self.canonical_user_id(endpoint, user, group).await?;
        let keys = self.active_keys(endpoint, user, group).await?;

        Ok(UserCredentials {
            user_id,
            access_key: keys.access_key,
            secret_key: keys.secret_key,
        })
    }

    /// Looks up the canonical user ID of a user/group pair.
    async fn canonical_user_id(
        &self,
        endpoint: &AdminEndpoint,
        user: &str,
        group: &str,
    ) -> UtilResult<String> {
        info!("Querying admin API for canonical user ID of {}/{}", group, user);

        let response = self
            .send(Method::GET, endpoint, "/user", user, group)
            .await?;

        match response.status {
            200 => {
                let found: CanonicalUser = parse(&response, user, group)?;

                if let Some(false) = found.active.as_ref().map(ActiveFlag::is_active) {
                    return Err(UtilError::data(format!(
                        "user {}/{} is not active",
                        group, user
                    )));
                }

                info!("Got canonical user ID for {}/{}", group, user);
                Ok(found.canonical_user_id)
            }
            204 => Err(UtilError::data(format!(
                "user/group {}/{} does not exist",
                user, group
            ))),
            status => Err(unexpected(status, "canonical user lookup", user, group)),
        }
    }

    /// Fetches the first active key pair, creating one if allowed.
    async fn active_keys(
        &self,
        endpoint: &AdminEndpoint,
        user: &str,
        group: &str,
    ) -> UtilResult<KeyPair> {
        info!("Querying admin API for active S3 credentials of {}/{}", group, user);

        let path = "/user/credentials/list/active";
        let response = self.send(Method::GET, endpoint, path, user, group).await?;

        let existing = match response.status {
            200 => parse::<Vec<KeyPair>>(&response, user, group)?.into_iter().next(),
            204 => None,
            status => return Err(unexpected(status, "active credentials lookup", user, group)),
        };

        if let Some(keys) = existing {
            info!("Got active S3 credentials for {}/{}", group, user);
            return Ok(keys);
        }

        warn!("No active S3 credentials found for {}/{}", group, user);

        if !self.provisioning.should_create(user, group)? {
            return Err(UtilError::data(format!(
                "no active S3 credentials for {}/{} and creation was declined",
                group, user
            )));
        }

        info!("Creating new S3 credentials for {}/{}", group, user);

        let response = self
            .send(Method::PUT, endpoint, "/user/credentials", user, group)
            .await?;

        if response.status != 200 {
            return Err(unexpected(response.status, "credentials creation", user, group));
        }

        let created: KeyPair = parse(&response, user, group)?;
        info!(
            "New S3 credentials created for {}/{}. AccessKey: {}",
            group, user, created.access_key
        );

        Ok(created)
    }

    /// Sends a request, attaching context to transport failures.
    async fn send(
        &self,
        method: Method,
        endpoint: &AdminEndpoint,
        path: &str,
        user: &str,
        group: &str,
    ) -> UtilResult<AdminResponse> {
        self.transport
            .send(method, endpoint, path, user, group)
            .await
            .map_err(|err| {
                UtilError::network(format!(
                    "admin request {} for {}/{} to {} failed: {}",
                    path, group, user, endpoint.url, err
                ))
            })
    }
}

/// Parses a JSON response body, attaching context on failure.
fn parse<'de, D>(response: &'de AdminResponse, user: &str, group: &str) -> UtilResult<D>
where
    D: Deserialize<'de>,
{
    serde_json::from_str(&response.body).map_err(|err| {
        UtilError::api(format!(
            "unable to parse response for {}/{}: {}",
            group, user, err
        ))
    })
}

/// Creates an error for an unexpected status code.
fn unexpected(status: u16, action: &str, user: &str, group: &str) -> UtilError {
    UtilError::api(format!(
        "{} for {}/{} returned HTTP status {}",
        action, group, user, status
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Admin transport replaying canned responses in order.
    #[derive(Default)]
    pub(crate) struct FakeAdmin {
        responses: RefCell<VecDeque<AdminResponse>>,
        pub(crate) requests: RefCell<Vec<(Method, String, String)>>,
    }

    impl FakeAdmin {
        pub(crate) fn new(responses: Vec<(u16, &str)>) -> Self {
            let responses = responses
                .into_iter()
                .map(|(status, body)| AdminResponse {
                    status,
                    body: body.to_string(),
                })
                .collect();

            Self {
                responses: RefCell::new(responses),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl AdminTransport for FakeAdmin {
        async fn send(
            &self,
            method: Method,
            endpoint: &AdminEndpoint,
            path: &str,
            _user: &str,
            _group: &str,
        ) -> UtilResult<AdminResponse> {
            self.requests
                .borrow_mut()
                .push((method, endpoint.url.clone(), path.to_string()));
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| UtilError::from("connection refused"))
        }
    }

    /// Policy which records whether it was consulted.
    struct Recorded {
        answer: bool,
        asked: RefCell<bool>,
    }

    impl KeyProvisioning for Recorded {
        fn should_create(&self, _user: &str, _group: &str) -> UtilResult<bool> {
            *self.asked.borrow_mut() = true;
            Ok(self.answer)
        }
    }

    fn endpoint() -> AdminEndpoint {
        AdminEndpoint {
            url: "https://admin-us.example.com:19443".to_string(),
            password: "s3cret".to_string(),
        }
    }

    async fn resolve(admin: &FakeAdmin, policy: CreateKeys) -> UtilResult<UserCredentials> {
        CredentialResolver::new(admin, &policy)
            .resolve(&endpoint(), "alice", "analytics")
            .await
    }

    #[tokio::test]
    async fn resolving_existing_credentials() {
        let admin = FakeAdmin::new(vec![
            (200, r#"{"canonicalUserId":"abc123","active":"true"}"#),
            (
                200,
                r#"[{"accessKey":"AK1","secretKey":"SK1"},{"accessKey":"AK2","secretKey":"SK2"}]"#,
            ),
        ]);

        let creds = resolve(&admin, CreateKeys::Never).await.unwrap();

        assert_eq!(
            creds,
            UserCredentials {
                user_id: "abc123".to_string(),
                access_key: "AK1".to_string(),
                secret_key: "SK1".to_string(),
            }
        );

        let requests = admin.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, Method::GET);
        assert_eq!(requests[0].2, "/user");
        assert_eq!(requests[1].2, "/user/credentials/list/active");
    }

    #[tokio::test]
    async fn failing_on_missing_user() {
        let admin = FakeAdmin::new(vec![(204, "")]);

        let err = resolve(&admin, CreateKeys::Always).await.unwrap_err();

        assert!(err.to_string().contains("does not exist"));
        assert_eq!(admin.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn failing_on_inactive_user() {
        let admin = FakeAdmin::new(vec![(200, r#"{"canonicalUserId":"abc123","active":false}"#)]);

        let err = resolve(&admin, CreateKeys::Always).await.unwrap_err();

        assert!(err.to_string().contains("not active"));
    }

    #[tokio::test]
    async fn failing_on_unexpected_status() {
        let admin = FakeAdmin::new(vec![(500, "boom")]);

        let err = resolve(&admin, CreateKeys::Always).await.unwrap_err();

        assert!(err.to_string().contains("HTTP status 500"));
    }

    #[tokio::test]
    async fn failing_on_malformed_body() {
        let admin = FakeAdmin::new(vec![(200, "<html>")]);

        let err = resolve(&admin, CreateKeys::Always).await.unwrap_err();

        assert!(err.to_string().starts_with("Unexpected admin API response"));
    }

    #[tokio::test]
    async fn failing_on_transport_errors() {
        let admin = FakeAdmin::new(vec![]);

        let err = resolve(&admin, CreateKeys::Always).await.unwrap_err();

        assert!(err.to_string().starts_with("Network failure"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn declining_creation_for_empty_list() {
        let admin = FakeAdmin::new(vec![
            (200, r#"{"canonicalUserId":"abc123"}"#),
            (200, "[]"),
        ]);
        let policy = Recorded {
            answer: false,
            asked: RefCell::new(false),
        };

        let result = CredentialResolver::new(&admin, &policy)
            .resolve(&endpoint(), "alice", "analytics")
            .await;

        assert!(result.is_err());
        assert!(*policy.asked.borrow());
        assert_eq!(admin.requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn declining_creation_for_no_content() {
        let admin = FakeAdmin::new(vec![(200, r#"{"canonicalUserId":"abc123"}"#), (204, "")]);

        let err = resolve(&admin, CreateKeys::Never).await.unwrap_err();

        assert!(err.to_string().contains("creation was declined"));
    }

    #[tokio::test]
    async fn creating_missing_credentials() {
        let admin = FakeAdmin::new(vec![
            (200, r#"{"canonicalUserId":"abc123"}"#),
            (204, ""),
            (200, r#"{"accessKey":"NEWAK","secretKey":"NEWSK","active":true}"#),
        ]);

        let creds = resolve(&admin, CreateKeys::Always).await.unwrap();

        assert_eq!(creds.user_id, "abc123");
        assert_eq!(creds.access_key, "NEWAK");
        assert_eq!(creds.secret_key, "NEWSK");

        let requests = admin.requests.borrow();
        assert_eq!(requests[2].0, Method::PUT);
        assert_eq!(requests[2].2, "/user/credentials");
    }

    #[tokio::test]
    async fn failing_when_creation_fails() {
        let admin = FakeAdmin::new(vec![
            (200, r#"{"canonicalUserId":"abc123"}"#),
            (204, ""),
            (403, ""),
        ]);

        let err = resolve(&admin, CreateKeys::Always).await.unwrap_err();

        assert!(err.to_string().contains("credentials creation"));
    }

    #[test]
    fn parsing_policies() {
        assert_eq!("ask".parse::<CreateKeys>().unwrap(), CreateKeys::Ask);
        assert_eq!("ALWAYS".parse::<CreateKeys>().unwrap(), CreateKeys::Always);
        assert_eq!("never".parse::<CreateKeys>().unwrap(), CreateKeys::Never);
        assert!("maybe".parse::<CreateKeys>().is_err());
    }

    #[test]
    fn reading_piped_answers() {
        use std::io::Cursor;

        assert!(read_answer(Cursor::new("y\n")).unwrap());
        assert!(read_answer(Cursor::new("YES\n")).unwrap());
        assert!(read_answer(Cursor::new("  yes  \ny\n")).unwrap());
        assert!(!read_answer(Cursor::new("n\n")).unwrap());
        assert!(!read_answer(Cursor::new("yep\n")).unwrap());
        assert!(!read_answer(Cursor::new("")).unwrap());
    }

    #[test]
    fn applying_fixed_policies() {
        assert!(CreateKeys::Always.should_create("alice", "analytics").unwrap());
        assert!(!CreateKeys::Never.should_create("alice", "analytics").unwrap());
    }
}
