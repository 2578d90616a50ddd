use crate::{
    AccountStatus, CreateResourceReply, RemoteConfig, RemoteError, RemoteResourceClient,
};
use async_trait::async_trait;
use cyclekeep_schema::{CallerHandle, ResourceId};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const CREATE_PATH: &str = "/resources";
const ACCOUNT_PATH: &str = "/account";

/// The byte string a caller signs to authenticate a request.
pub fn signing_message(method: &str, path: &str, timestamp: &str) -> String {
    format!("{method}\n{path}\n{timestamp}")
}

#[derive(Debug, Deserialize)]
struct ResourceStatus {
    cycles: u64,
}

/// HTTP-based remote service client.
///
/// Expects a small JSON API:
/// - `POST {url}/resources`                  : create a resource (signed)
/// - `GET  {url}/account`                    : account status (signed)
/// - `GET  {status_url}/resources/<id>/status`: balance of any resource
///
/// The agent is blocking; each call runs on the blocking pool so the async
/// caller is never stalled.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: RemoteConfig,
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(config: RemoteConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Self { config, agent }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Ids come from imported profiles, so they are always encoded as a
    /// single path segment.
    fn status_url(&self, resource_id: &str) -> String {
        format!(
            "{}/resources/{}/status",
            self.config.status_base(),
            urlencoding::encode(resource_id)
        )
    }

    fn signed_headers(caller: &CallerHandle, method: &str, path: &str) -> Vec<(&'static str, String)> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let signature = caller.sign(signing_message(method, path, &timestamp).as_bytes());
        vec![
            ("X-Cyclekeep-Caller", caller.account().to_string()),
            ("X-Cyclekeep-Public-Key", caller.public_key_hex()),
            ("X-Cyclekeep-Timestamp", timestamp),
            ("X-Cyclekeep-Signature", signature),
        ]
    }

    fn do_request<T: DeserializeOwned>(
        &self,
        method: &str,
        url: &str,
        headers: &[(&'static str, String)],
    ) -> Result<T, RemoteError> {
        let protocol = crate::PROTOCOL_VERSION.to_string();
        let result = if method == "POST" {
            let mut req = self
                .agent
                .post(url)
                .header("X-Cyclekeep-Protocol", &protocol);
            for (name, value) in headers {
                req = req.header(*name, value);
            }
            req.send_empty()
        } else {
            let mut req = self
                .agent
                .get(url)
                .header("X-Cyclekeep-Protocol", &protocol);
            for (name, value) in headers {
                req = req.header(*name, value);
            }
            req.call()
        };

        let resp = match result {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };

        let code = resp.status().as_u16();
        if code == 404 {
            return Err(RemoteError::NotFound(url.to_owned()));
        }
        if code >= 400 {
            return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
        }

        let body = resp
            .into_body()
            .read_to_string()
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Serialization(e.to_string()))
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(HttpClient) -> Result<T, RemoteError> + Send + 'static,
    {
        let client = self.clone();
        tokio::task::spawn_blocking(move || f(client))
            .await
            .map_err(|e| RemoteError::Io(format!("request task failed: {e}")))?
    }
}

#[async_trait]
impl RemoteResourceClient for HttpClient {
    async fn create_resource(
        &self,
        caller: &CallerHandle,
    ) -> Result<CreateResourceReply, RemoteError> {
        let url = format!("{}{CREATE_PATH}", self.config.url);
        tracing::debug!("POST {url}");
        let headers = Self::signed_headers(caller, "POST", CREATE_PATH);
        self.run_blocking(move |client| client.do_request("POST", &url, &headers))
            .await
    }

    async fn read_resource_quota(&self, resource_id: &ResourceId) -> Result<u64, RemoteError> {
        let url = self.status_url(resource_id);
        tracing::debug!("GET {url}");
        let status: ResourceStatus = self
            .run_blocking(move |client| client.do_request("GET", &url, &[]))
            .await?;
        Ok(status.cycles)
    }

    async fn read_account_status(
        &self,
        caller: &CallerHandle,
    ) -> Result<AccountStatus, RemoteError> {
        let url = format!("{}{ACCOUNT_PATH}", self.config.url);
        tracing::debug!("GET {url}");
        let headers = Self::signed_headers(caller, "GET", ACCOUNT_PATH);
        self.run_blocking(move |client| client.do_request("GET", &url, &headers))
            .await
    }
}
