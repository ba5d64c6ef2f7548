//! Base GCP HTTP client with OAuth2 token management.
//!
//! All GCP REST APIs follow a consistent pattern:
//! - Base URL: `https://{service}.googleapis.com` (or `{service}.mtls.googleapis.com`)
//! - Auth: `Authorization: Bearer {access_token}`
//! - Request/Response: JSON
//! - Pagination: `pageToken` / `nextPageToken`
//!
//! This client handles token acquisition, endpoint selection, and error
//! parsing. It never retries; callers decide.

use crate::auth::TokenManager;
use crate::config::GcpClientConfig;
use crate::error::{GcpError, GcpResult};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Identity, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("gdca-samples/", env!("CARGO_PKG_VERSION"));

/// Extra request headers, e.g. customer-supplied encryption keys.
pub type Headers = [(&'static str, String)];

/// Base GCP API client.
///
/// Cloning is cheap: the HTTP connection pool is shared, the token cache is
/// copied.
#[derive(Clone)]
pub struct GcpClient {
    http: Client,
    token_manager: TokenManager,
    project_id: String,
    endpoint_override: Option<String>,
    mtls: bool,
}

impl GcpClient {
    /// Create a new GCP client.
    pub fn new(config: GcpClientConfig) -> GcpResult<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT);

        let mtls = match config.client_certificate {
            Some(ref path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    GcpError::config(&format!(
                        "Cannot read client certificate {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let identity = Identity::from_pem(&pem).map_err(|e| {
                    GcpError::config(&format!("Invalid client certificate: {}", e))
                })?;
                builder = builder.identity(identity);
                true
            }
            None => false,
        };

        let http = builder
            .build()
            .map_err(|e| GcpError::config(&format!("Cannot build HTTP client: {}", e)))?;
        let token_manager = TokenManager::new(config.credentials, config.scopes, http.clone());

        Ok(Self {
            http,
            token_manager,
            project_id: config.project_id,
            endpoint_override: config.endpoint_override,
            mtls,
        })
    }

    /// Build a client from the process environment.
    pub fn from_env() -> GcpResult<Self> {
        Self::new(GcpClientConfig::from_env()?)
    }

    /// Get the default project ID.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Build the base URL for a service.
    pub fn base_url(&self, service: &str) -> String {
        if let Some(ref url) = self.endpoint_override {
            url.trim_end_matches('/').to_string()
        } else if self.mtls {
            format!("https://{}.mtls.googleapis.com", service)
        } else {
            format!("https://{}.googleapis.com", service)
        }
    }

    // ── Request execution ───────────────────────────────────────────

    /// Send one authenticated request and map HTTP errors.
    async fn execute(
        &mut self,
        service: &str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        headers: &Headers,
        body: Option<(Bytes, &str)>,
    ) -> GcpResult<Response> {
        let url = format!("{}{}", self.base_url(service), path);
        let token = self.token_manager.get_token().await?;
        log::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&token)
            .query(query);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        if let Some((data, content_type)) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GcpError::transport(service, e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let err = GcpError::from_api_response(service, status, &body);
            log::debug!("{} {} failed: {}", service, path, err);
            return Err(err);
        }
        Ok(response)
    }

    async fn json_body<T: DeserializeOwned>(service: &str, response: Response) -> GcpResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| GcpError::transport(service, e))?;
        // Some mutations answer 204 / empty body; decode those as `{}`.
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| GcpError::decode(service, e))
    }

    fn encode<B: Serialize>(service: &str, body: &B) -> GcpResult<Option<(Bytes, &'static str)>> {
        let data = serde_json::to_vec(body).map_err(|e| GcpError::decode(service, e))?;
        Ok(Some((Bytes::from(data), "application/json")))
    }

    // ── Generic REST methods ────────────────────────────────────────

    /// GET a GCP API path and deserialize the JSON response.
    pub async fn get<T: DeserializeOwned>(
        &mut self,
        service: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> GcpResult<T> {
        let response = self
            .execute(service, Method::GET, path, query, &[], None)
            .await?;
        Self::json_body(service, response).await
    }

    /// GET media content, with optional extra headers.
    pub async fn get_bytes(
        &mut self,
        service: &str,
        path: &str,
        query: &[(&str, &str)],
        headers: &Headers,
    ) -> GcpResult<Bytes> {
        let response = self
            .execute(service, Method::GET, path, query, headers, None)
            .await?;
        response
            .bytes()
            .await
            .map_err(|e| GcpError::transport(service, e))
    }

    /// POST JSON to a GCP API and deserialize the response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &mut self,
        service: &str,
        path: &str,
        body: &B,
    ) -> GcpResult<T> {
        self.post_with(service, path, &[], &[], body).await
    }

    /// POST JSON with query parameters and extra headers.
    pub async fn post_with<B: Serialize, T: DeserializeOwned>(
        &mut self,
        service: &str,
        path: &str,
        query: &[(&str, &str)],
        headers: &Headers,
        body: &B,
    ) -> GcpResult<T> {
        let payload = Self::encode(service, body)?;
        let response = self
            .execute(service, Method::POST, path, query, headers, payload)
            .await?;
        Self::json_body(service, response).await
    }

    /// POST JSON and discard the response body.
    pub async fn post_text<B: Serialize>(
        &mut self,
        service: &str,
        path: &str,
        body: &B,
    ) -> GcpResult<String> {
        let payload = Self::encode(service, body)?;
        let response = self
            .execute(service, Method::POST, path, &[], &[], payload)
            .await?;
        response
            .text()
            .await
            .map_err(|e| GcpError::transport(service, e))
    }

    /// PUT JSON to a GCP API.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &mut self,
        service: &str,
        path: &str,
        body: &B,
    ) -> GcpResult<T> {
        let payload = Self::encode(service, body)?;
        let response = self
            .execute(service, Method::PUT, path, &[], &[], payload)
            .await?;
        Self::json_body(service, response).await
    }

    /// PATCH JSON to a GCP API.
    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &mut self,
        service: &str,
        path: &str,
        body: &B,
        query: &[(&str, &str)],
    ) -> GcpResult<T> {
        let payload = Self::encode(service, body)?;
        let response = self
            .execute(service, Method::PATCH, path, query, &[], payload)
            .await?;
        Self::json_body(service, response).await
    }

    /// DELETE a resource. Returns the response body as text.
    pub async fn delete(
        &mut self,
        service: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> GcpResult<String> {
        let response = self
            .execute(service, Method::DELETE, path, query, &[], None)
            .await?;
        response
            .text()
            .await
            .map_err(|e| GcpError::transport(service, e))
    }

    /// Upload raw bytes (media upload) and deserialize the JSON response.
    pub async fn upload_media<T: DeserializeOwned>(
        &mut self,
        service: &str,
        path: &str,
        query: &[(&str, &str)],
        headers: &Headers,
        data: Bytes,
        content_type: &str,
    ) -> GcpResult<T> {
        let response = self
            .execute(
                service,
                Method::POST,
                path,
                query,
                headers,
                Some((data, content_type)),
            )
            .await?;
        Self::json_body(service, response).await
    }

    // ── Pagination helpers ──────────────────────────────────────────

    /// Fetch all pages of a paginated list endpoint.
    ///
    /// `extract` splits each page into its items and the next page token.
    pub async fn get_all_pages<P, T>(
        &mut self,
        service: &str,
        path: &str,
        base_query: &[(&str, String)],
        extract: fn(P) -> (Vec<T>, Option<String>),
    ) -> GcpResult<Vec<T>>
    where
        P: DeserializeOwned,
    {
        let mut all_items: Vec<T> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> =
                base_query.iter().map(|(k, v)| (*k, v.as_str())).collect();
            if let Some(ref pt) = page_token {
                query.push(("pageToken", pt.as_str()));
            }

            let page: P = self.get(service, path, &query).await?;
            let (items, next) = extract(page);
            all_items.extend(items);

            match next {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(all_items)
    }

    // ── Operation polling ───────────────────────────────────────────

    /// Poll a long-running operation until it completes.
    ///
    /// Understands both `done: true` (most APIs) and `status: "DONE"`
    /// (Compute Engine).
    pub async fn wait_for_operation(
        &mut self,
        service: &str,
        operation_path: &str,
        max_polls: u32,
        poll_interval: Duration,
    ) -> GcpResult<serde_json::Value> {
        for poll in 0..max_polls {
            let op: serde_json::Value = self.get(service, operation_path, &[]).await?;

            let done = op.get("done").and_then(|v| v.as_bool()).unwrap_or(false);
            let status = op.get("status").and_then(|v| v.as_str()).unwrap_or("");

            if done || status == "DONE" {
                if let Some(err) = operation_error(&op) {
                    return Err(err.into_service(service));
                }
                return Ok(op);
            }

            log::debug!(
                "{} operation {} still running (poll {}/{})",
                service,
                operation_path,
                poll + 1,
                max_polls
            );
            if poll + 1 < max_polls {
                tokio::time::sleep(poll_interval).await;
            }
        }

        Err(GcpError::new(
            service,
            504,
            "DEADLINE_EXCEEDED",
            "Operation timed out waiting for completion",
        ))
    }
}

/// Extract the error of a finished operation, if any.
///
/// Compute reports `error.errors[]`, other APIs a `google.rpc.Status`.
fn operation_error(op: &serde_json::Value) -> Option<OperationFailure> {
    let err = op.get("error")?;
    let message = err
        .get("message")
        .and_then(|v| v.as_str())
        .or_else(|| {
            err.get("errors")
                .and_then(|v| v.get(0))
                .and_then(|v| v.get("message"))
                .and_then(|v| v.as_str())
        })
        .unwrap_or("Operation failed")
        .to_string();
    let code = err
        .get("code")
        .and_then(|v| v.as_u64())
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(500);
    Some(OperationFailure { code, message })
}

struct OperationFailure {
    code: u16,
    message: String,
}

impl OperationFailure {
    fn into_service(self, service: &str) -> GcpError {
        GcpError::new(service, self.code, "OPERATION_FAILED", &self.message)
    }
}

/// Everything except RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode one path segment (object names may contain `/`).
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn client(endpoint: Option<&str>) -> GcpClient {
        let mut config =
            GcpClientConfig::new("sample-project", Credentials::AccessToken("t".into()));
        if let Some(e) = endpoint {
            config = config.with_endpoint_override(e);
        }
        GcpClient::new(config).unwrap()
    }

    #[test]
    fn default_endpoint_per_service() {
        let c = client(None);
        assert_eq!(c.base_url("compute"), "https://compute.googleapis.com");
        assert_eq!(c.base_url("storage"), "https://storage.googleapis.com");
    }

    #[test]
    fn override_wins_and_is_trimmed() {
        let c = client(Some("http://127.0.0.1:8085/"));
        assert_eq!(c.base_url("pubsub"), "http://127.0.0.1:8085");
    }

    #[test]
    fn missing_client_certificate_is_a_config_error() {
        let config = GcpClientConfig::new("p", Credentials::AccessToken("t".into()))
            .with_client_certificate("/definitely/not/here.pem");
        let err = GcpClient::new(config).err().unwrap();
        assert_eq!(err.service, "config");
        assert!(err.message.contains("here.pem"));
    }

    #[test]
    fn encodes_object_names() {
        assert_eq!(encode_segment("foo/a.txt"), "foo%2Fa.txt");
        assert_eq!(encode_segment("my object?"), "my%20object%3F");
        assert_eq!(encode_segment("plain"), "plain");
    }

    #[test]
    fn compute_operation_errors_are_extracted() {
        let op = serde_json::json!({
            "status": "DONE",
            "error": { "errors": [{ "code": "QUOTA_EXCEEDED", "message": "Quota 'CPUS' exceeded" }] }
        });
        let failure = operation_error(&op).unwrap();
        assert_eq!(failure.message, "Quota 'CPUS' exceeded");
        assert_eq!(failure.code, 500);
    }

    #[test]
    fn rpc_status_errors_are_extracted() {
        let op = serde_json::json!({
            "done": true,
            "error": { "code": 409, "message": "Database already exists" }
        });
        let err = operation_error(&op).unwrap().into_service("spanner");
        assert_eq!(err.code, 409);
        assert_eq!(err.status, "OPERATION_FAILED");
    }

    #[test]
    fn successful_operation_has_no_error() {
        let op = serde_json::json!({ "done": true, "response": {} });
        assert!(operation_error(&op).is_none());
    }
}
