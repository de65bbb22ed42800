use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::diag::DiagnosticLog;
use crate::config::Settings;

/// Header telling the policy manager a protected object may be overwritten
pub const OVERWRITE_HEADER: &str = "X-Allow-Overwrite";

/// Path of the policy tree under the manager host
const API_PREFIX: &str = "/policy/api/v1/infra";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error: {method} {url} returned {status} - {body}")]
    Status {
        status: u16,
        method: String,
        url: String,
        body: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Diagnostic log error: {0}")]
    DiagnosticLog(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status of the failed call, when the manager answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transient failures worth another attempt on an idempotent call
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_timeout() || e.is_connect(),
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Root URL of the policy API for a manager host.
///
/// A bare host name gets `https://`; an explicit scheme is kept as given.
pub fn api_root(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}{}", host, API_PREFIX)
    } else {
        format!("https://{}{}", host, API_PREFIX)
    }
}

/// Verbs that change state on the manager
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::PUT | Method::PATCH | Method::POST | Method::DELETE
    )
}

/// Exponential backoff: `base * 2^attempt`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}

/// Split a list page into its items and the cursor of the next page
pub fn page_items(page: Value) -> (Vec<Value>, Option<String>) {
    let cursor = page
        .get("cursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    let items = match page {
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    (items, cursor)
}

fn parse_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

// ============================================================================
// SBIO: Trait for abstraction (allows mocking in tests)
// ============================================================================

/// Access to the policy tree, with paths relative to the API root
#[async_trait]
pub trait PolicyApi: Send + Sync {
    /// Fetch a document, or one page of a list when `cursor` is given
    async fn get_page(&self, path: &str, cursor: Option<&str>) -> Result<Value, ApiError>;

    /// Send a mutating request. `overwrite` asks for the overwrite header.
    async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        overwrite: bool,
    ) -> Result<Value, ApiError>;

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.get_page(path, None).await
    }

    /// Fetch every item of a list, following cursors in API order
    async fn list(&self, path: &str) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.get_page(path, cursor.as_deref()).await?;
            let (mut batch, next) = page_items(page);
            items.append(&mut batch);
            match next {
                // a manager repeating the same cursor would loop forever
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(items)
    }
}

// ============================================================================
// SBIO: I/O implementation (real HTTP client)
// ============================================================================

pub struct NsxClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    max_retries: u32,
    retry_delay: Duration,
    diag: Option<DiagnosticLog>,
}

impl NsxClient {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(settings.insecure)
            .timeout(settings.timeout)
            .build()?;

        let diag = if settings.debug {
            Some(DiagnosticLog::create(&settings.debug_log)?)
        } else {
            None
        };

        Ok(Self {
            http,
            base_url: settings.api_root(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay,
            diag,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn diagnostic_log(&self) -> Option<&DiagnosticLog> {
        self.diag.as_ref()
    }

    fn url(&self, path: &str, cursor: Option<&str>) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::Url(format!("{}{}: {}", self.base_url, path, e)))?;
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("cursor", cursor);
        }
        Ok(url)
    }

    /// Send with the retry policy: only GET is ever retried
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        overwrite: bool,
    ) -> Result<Value, ApiError> {
        let retries = if method == Method::GET {
            self.max_retries
        } else {
            0
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&method, &url, body, overwrite).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < retries && e.is_retryable() => {
                    let delay = backoff_delay(self.retry_delay, attempt);
                    warn!(
                        "{} {} failed ({}), retrying in {:?} ({}/{})",
                        method,
                        url,
                        e,
                        delay,
                        attempt + 1,
                        retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        overwrite: bool,
    ) -> Result<Value, ApiError> {
        let mut req = self
            .http
            .request(method.clone(), url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json");

        if overwrite && is_mutating(method) {
            req = req.header(OVERWRITE_HEADER, "true");
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        if let Some(log) = &self.diag {
            log.record_request(method.as_str(), url.as_str(), body)?;
        }
        debug!("{} {} (overwrite: {})", method, url, overwrite);

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if let Some(log) = &self.diag {
            log.record_response(status.as_u16(), &text)?;
        }
        debug!("{} {} -> {}", method, url, status);

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                method: method.to_string(),
                url: url.to_string(),
                body: text,
            });
        }

        parse_body(&text)
    }
}

#[async_trait]
impl PolicyApi for NsxClient {
    async fn get_page(&self, path: &str, cursor: Option<&str>) -> Result<Value, ApiError> {
        let url = self.url(path, cursor)?;
        self.execute(Method::GET, url, None, false).await
    }

    async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        overwrite: bool,
    ) -> Result<Value, ApiError> {
        let url = self.url(path, None)?;
        self.execute(method, url, Some(body), overwrite).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_root_bare_host() {
        assert_eq!(
            api_root("nsx-manager.lab.local"),
            "https://nsx-manager.lab.local/policy/api/v1/infra"
        );
    }

    #[test]
    fn test_api_root_keeps_scheme() {
        assert_eq!(
            api_root("http://127.0.0.1:8080/"),
            "http://127.0.0.1:8080/policy/api/v1/infra"
        );
    }

    #[test]
    fn test_is_mutating() {
        assert!(is_mutating(&Method::PUT));
        assert!(is_mutating(&Method::PATCH));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
    }

    #[test]
    fn test_page_items_with_cursor() {
        let page = json!({"results": [{"id": "a"}, {"id": "b"}], "cursor": "00012"});
        let (items, cursor) = page_items(page);
        assert_eq!(items.len(), 2);
        assert_eq!(cursor.as_deref(), Some("00012"));
    }

    #[test]
    fn test_page_items_empty_cursor_is_last_page() {
        let (items, cursor) = page_items(json!({"results": [], "cursor": ""}));
        assert!(items.is_empty());
        assert!(cursor.is_none());
    }

    #[test]
    fn test_page_items_missing_results() {
        let (items, cursor) = page_items(json!({"result_count": 0}));
        assert!(items.is_empty());
        assert!(cursor.is_none());
    }

    #[test]
    fn test_parse_body_empty_is_null() {
        assert_eq!(parse_body("").unwrap(), Value::Null);
        assert_eq!(parse_body("{\"a\": 1}").unwrap(), json!({"a": 1}));
        assert!(parse_body("not json").is_err());
    }

    #[test]
    fn test_status_error_retryable() {
        let err = ApiError::Status {
            status: 503,
            method: "GET".to_string(),
            url: "https://nsx/x".to_string(),
            body: String::new(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(503));

        let err = ApiError::Status {
            status: 412,
            method: "PUT".to_string(),
            url: "https://nsx/x".to_string(),
            body: String::new(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_url_keeps_encoded_ids_in_the_path() {
        let client = NsxClient::new(&Settings::new("nsx01", "admin", "pw")).unwrap();
        let url = client
            .url(&crate::policy::paths::locale_services("gw?x#y z"), Some("c1"))
            .unwrap();
        assert_eq!(
            url.path(),
            "/policy/api/v1/infra/tier-1s/gw%3Fx%23y%20z/locale-services"
        );
        assert_eq!(url.query(), Some("cursor=c1"));
        assert!(url.fragment().is_none());
    }

    #[tokio::test]
    async fn test_list_follows_cursors() {
        let api = crate::client::mock::MockPolicyApi::new()
            .with_document("/tier-1s", json!({"results": [{"id": "a"}], "cursor": "2"}))
            .with_document("/tier-1s?cursor=2", json!({"results": [{"id": "b"}], "cursor": "3"}))
            .with_document("/tier-1s?cursor=3", json!({"results": [{"id": "c"}]}));

        let items = api.list("/tier-1s").await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_list_stops_on_repeated_cursor() {
        let api = crate::client::mock::MockPolicyApi::new()
            .with_document("/tier-1s", json!({"results": [{"id": "a"}], "cursor": "2"}))
            .with_document("/tier-1s?cursor=2", json!({"results": [{"id": "b"}], "cursor": "2"}));

        let items = api.list("/tier-1s").await.unwrap();
        assert_eq!(items.len(), 2);
    }
}
