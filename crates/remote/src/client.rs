//! HTTP client for the saved-items backend.
//!
//! Thin contract over account persistence: list/add/remove of saved items
//! plus the account lookups the identity resolver needs. The backend stores
//! saved items as a set per account; this client preserves that idempotency
//! at the wire level (a 409 "already saved" and a 404 on a delete target are
//! both success).

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use studyshelf_core::saved_items::{
    AccountDirectory, AccountRef, EntityKind, OwnerIdentity, SavedItemKey, SavedItemRecord,
    SavedItemsStoreTrait,
};

use crate::error::{RemoteError, Result};
use crate::types::{AccountResponse, ApiErrorResponse, SavedItemsResponse};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Error code the backend uses when the account itself is missing, as
/// opposed to a missing item within an existing account's collection.
const ACCOUNT_NOT_FOUND_CODE: &str = "ACCOUNT_NOT_FOUND";

/// Client for the saved-items backend API.
#[derive(Debug, Clone)]
pub struct SavedItemsClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl SavedItemsClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the backend (e.g., "https://api.studyshelf.app")
    /// * `access_token` - Session bearer token issued by the auth subsystem
    pub fn new(base_url: &str, access_token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn log_response(status: StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Create headers for an API request.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|_| RemoteError::invalid_request("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            RemoteError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    fn api_error(status: StatusCode, body: &str) -> RemoteError {
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
            return RemoteError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            );
        }
        RemoteError::api(status.as_u16(), format!("Request failed: {}", body))
    }

    fn is_account_not_found(body: &str) -> bool {
        serde_json::from_str::<ApiErrorResponse>(body)
            .map(|error| error.code == ACCOUNT_NOT_FOUND_CODE)
            .unwrap_or(false)
    }

    fn native_id(identity: &OwnerIdentity) -> Result<&str> {
        identity
            .native_id()
            .ok_or_else(|| RemoteError::invalid_request("Local identity cannot address the server store"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Account lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch an account by its native id. `None` on 404.
    ///
    /// GET /api/v1/accounts/{nativeId}
    pub async fn fetch_account(&self, native_id: &str) -> Result<Option<AccountResponse>> {
        let url = format!(
            "{}/api/v1/accounts/{}",
            self.base_url,
            urlencoding::encode(native_id)
        );
        let response = self.client.get(&url).headers(self.headers()?).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::parse_response(response).await?))
    }

    /// Fetch an account by the auth provider's opaque id. `None` on 404.
    ///
    /// GET /api/v1/accounts/by-external/{externalAuthId}
    pub async fn fetch_account_by_external(
        &self,
        external_auth_id: &str,
    ) -> Result<Option<AccountResponse>> {
        let url = format!(
            "{}/api/v1/accounts/by-external/{}",
            self.base_url,
            urlencoding::encode(external_auth_id)
        );
        let response = self.client.get(&url).headers(self.headers()?).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::parse_response(response).await?))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Saved items
    // ─────────────────────────────────────────────────────────────────────────

    /// List saved items of one kind, most-recent first.
    ///
    /// GET /api/v1/accounts/{nativeId}/saved-items?kind={kind}
    pub async fn list_items(
        &self,
        native_id: &str,
        kind: EntityKind,
    ) -> Result<Vec<SavedItemRecord>> {
        let url = format!(
            "{}/api/v1/accounts/{}/saved-items",
            self.base_url,
            urlencoding::encode(native_id)
        );
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("kind", kind.as_str())])
            .send()
            .await?;

        let parsed: SavedItemsResponse = Self::parse_response(response).await?;
        Ok(parsed.items)
    }

    /// Add a saved item. Set-add: a 409 "already saved" is success and the
    /// current collection is fetched instead.
    ///
    /// POST /api/v1/accounts/{nativeId}/saved-items
    pub async fn add_item(
        &self,
        native_id: &str,
        record: &SavedItemRecord,
    ) -> Result<Vec<SavedItemRecord>> {
        let url = format!(
            "{}/api/v1/accounts/{}/saved-items",
            self.base_url,
            urlencoding::encode(native_id)
        );
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(record)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!(
                "Item {}/{} already saved; treating as success",
                record.entity_kind.as_str(),
                record.external_key
            );
            return self.list_items(native_id, record.entity_kind).await;
        }

        let parsed: SavedItemsResponse = Self::parse_response(response).await?;
        Ok(parsed.items)
    }

    /// Remove a saved item. A 404 on the item (account present) is success:
    /// absence is already true.
    ///
    /// DELETE /api/v1/accounts/{nativeId}/saved-items/{kind}/{externalKey}
    pub async fn remove_item(
        &self,
        native_id: &str,
        key: &SavedItemKey,
    ) -> Result<Vec<SavedItemRecord>> {
        let url = format!(
            "{}/api/v1/accounts/{}/saved-items/{}/{}",
            self.base_url,
            urlencoding::encode(native_id),
            key.entity_kind.as_str(),
            urlencoding::encode(&key.external_key)
        );
        let response = self.client.delete(&url).headers(self.headers()?).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await?;
            Self::log_response(status, &body);
            if Self::is_account_not_found(&body) {
                return Err(Self::api_error(status, &body));
            }
            debug!(
                "Delete target {}/{} already absent; treating as success",
                key.entity_kind.as_str(),
                key.external_key
            );
            return self.list_items(native_id, key.entity_kind).await;
        }

        let parsed: SavedItemsResponse = Self::parse_response(response).await?;
        Ok(parsed.items)
    }
}

#[async_trait]
impl SavedItemsStoreTrait for SavedItemsClient {
    async fn list(
        &self,
        identity: &OwnerIdentity,
        kind: EntityKind,
    ) -> studyshelf_core::Result<Vec<SavedItemRecord>> {
        let native_id = Self::native_id(identity)?;
        Ok(self.list_items(native_id, kind).await?)
    }

    async fn add(
        &self,
        identity: &OwnerIdentity,
        record: SavedItemRecord,
    ) -> studyshelf_core::Result<Vec<SavedItemRecord>> {
        let native_id = Self::native_id(identity)?;
        Ok(self.add_item(native_id, &record).await?)
    }

    async fn remove(
        &self,
        identity: &OwnerIdentity,
        key: &SavedItemKey,
    ) -> studyshelf_core::Result<Vec<SavedItemRecord>> {
        let native_id = Self::native_id(identity)?;
        Ok(self.remove_item(native_id, key).await?)
    }
}

#[async_trait]
impl AccountDirectory for SavedItemsClient {
    async fn find_by_native_id(
        &self,
        native_id: &str,
    ) -> studyshelf_core::Result<Option<AccountRef>> {
        Ok(self
            .fetch_account(native_id)
            .await?
            .map(AccountRef::from))
    }

    async fn find_by_external_auth_id(
        &self,
        external_auth_id: &str,
    ) -> studyshelf_core::Result<Option<AccountRef>> {
        Ok(self
            .fetch_account_by_external(external_auth_id)
            .await?
            .map(AccountRef::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        method: String,
        path: String,
    }

    #[derive(Debug, Clone)]
    struct MockResponse {
        status: u16,
        body: String,
    }

    fn items_body(keys: &[&str]) -> String {
        let items = keys
            .iter()
            .map(|key| {
                format!(
                    r#"{{"entityKind":"exam","externalKey":"{}","display":{{"name":"{}"}},"addedAt":"2026-08-01T10:00:00Z"}}"#,
                    key,
                    key.to_uppercase()
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        format!(r#"{{"items":[{}]}}"#, items)
    }

    fn api_error_body(code: &str, message: &str) -> String {
        format!(
            r#"{{"error":"error","code":"{}","message":"{}"}}"#,
            code, message
        )
    }

    fn status_text(status: u16) -> &'static str {
        match status {
            200 => "OK",
            201 => "Created",
            400 => "Bad Request",
            404 => "Not Found",
            409 => "Conflict",
            500 => "Internal Server Error",
            _ => "Error",
        }
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if buffer.windows(4).any(|window| window == b"\r\n\r\n") {
                break;
            }
        }

        let header_end = buffer.windows(4).position(|window| window == b"\r\n\r\n")?;
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let request_line = head.lines().next()?.to_string();

        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);

        // Drain the body before responding.
        let mut body_read = buffer.len().saturating_sub(header_end + 4);
        while body_read < content_length {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body_read = body_read.saturating_add(read);
        }

        let mut parts = request_line.split_whitespace();
        Some(CapturedRequest {
            method: parts.next()?.to_string(),
            path: parts.next()?.to_string(),
        })
    }

    async fn start_mock_server(
        outcomes: Vec<MockResponse>,
    ) -> (
        String,
        Arc<TokioMutex<Vec<CapturedRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(TokioMutex::new(Vec::<CapturedRequest>::new()));
        let scripted = Arc::new(TokioMutex::new(VecDeque::from(outcomes)));
        let captured_clone = Arc::clone(&captured);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let Some(request) = read_request(&mut stream).await else {
                    continue;
                };
                captured_clone.lock().await.push(request);

                let outcome = scripted.lock().await.pop_front().unwrap_or(MockResponse {
                    status: 500,
                    body: api_error_body("INTERNAL", "unexpected request"),
                });
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    outcome.status,
                    status_text(outcome.status),
                    outcome.body.len(),
                    outcome.body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.flush().await;
            }
        });

        (format!("http://{}", addr), captured, handle)
    }

    fn record(key: &str) -> SavedItemRecord {
        SavedItemRecord::new(EntityKind::Exam, key, key.to_uppercase())
    }

    #[tokio::test]
    async fn list_parses_items_and_sends_kind_query() {
        let (base_url, captured, server) = start_mock_server(vec![MockResponse {
            status: 200,
            body: items_body(&["e1", "e2"]),
        }])
        .await;

        let client = SavedItemsClient::new(&base_url, "token");
        let items = client.list_items("u-1", EntityKind::Exam).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_key, "e1");
        let requests = captured.lock().await.clone();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/api/v1/accounts/u-1/saved-items?kind=exam");

        server.abort();
    }

    #[tokio::test]
    async fn add_conflict_is_success_via_follow_up_list() {
        let (base_url, captured, server) = start_mock_server(vec![
            MockResponse {
                status: 409,
                body: api_error_body("ALREADY_SAVED", "item already in collection"),
            },
            MockResponse {
                status: 200,
                body: items_body(&["e1"]),
            },
        ])
        .await;

        let client = SavedItemsClient::new(&base_url, "token");
        let items = client.add_item("u-1", &record("e1")).await.unwrap();

        assert_eq!(items.len(), 1);
        let requests = captured.lock().await.clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[1].method, "GET");

        server.abort();
    }

    #[tokio::test]
    async fn delete_of_absent_item_is_success() {
        let (base_url, captured, server) = start_mock_server(vec![
            MockResponse {
                status: 404,
                body: api_error_body("ITEM_NOT_FOUND", "no such saved item"),
            },
            MockResponse {
                status: 200,
                body: items_body(&[]),
            },
        ])
        .await;

        let client = SavedItemsClient::new(&base_url, "token");
        let items = client
            .remove_item("u-1", &SavedItemKey::new(EntityKind::Exam, "e9"))
            .await
            .unwrap();

        assert!(items.is_empty());
        let requests = captured.lock().await.clone();
        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(
            requests[0].path,
            "/api/v1/accounts/u-1/saved-items/exam/e9"
        );

        server.abort();
    }

    #[tokio::test]
    async fn delete_with_missing_account_is_owner_not_found() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse {
            status: 404,
            body: api_error_body("ACCOUNT_NOT_FOUND", "no such account"),
        }])
        .await;

        let client = SavedItemsClient::new(&base_url, "token");
        let err = client
            .remove_item("u-gone", &SavedItemKey::new(EntityKind::Exam, "e1"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));

        let core: studyshelf_core::Error = err.into();
        assert!(matches!(core, studyshelf_core::Error::OwnerNotFound(_)));

        server.abort();
    }

    #[tokio::test]
    async fn account_lookup_miss_is_none_not_error() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse {
            status: 404,
            body: api_error_body("ACCOUNT_NOT_FOUND", "no such account"),
        }])
        .await;

        let client = SavedItemsClient::new(&base_url, "token");
        let account = client.fetch_account_by_external("auth0|nobody").await.unwrap();
        assert!(account.is_none());

        server.abort();
    }

    #[tokio::test]
    async fn server_error_maps_to_retryable_transport() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse {
            status: 500,
            body: api_error_body("INTERNAL", "boom"),
        }])
        .await;

        let client = SavedItemsClient::new(&base_url, "token");
        let err = client.list_items("u-1", EntityKind::Course).await.unwrap_err();

        let core: studyshelf_core::Error = err.into();
        assert!(core.is_retryable());

        server.abort();
    }

    #[tokio::test]
    async fn bad_request_maps_to_validation() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse {
            status: 400,
            body: api_error_body("INVALID_RECORD", "externalKey is required"),
        }])
        .await;

        let client = SavedItemsClient::new(&base_url, "token");
        let err = client.add_item("u-1", &record("")).await.unwrap_err();

        let core: studyshelf_core::Error = err.into();
        assert!(matches!(core, studyshelf_core::Error::Validation(_)));

        server.abort();
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_transport() {
        // Bind-then-drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SavedItemsClient::new(&format!("http://{}", addr), "token");
        let err = client.list_items("u-1", EntityKind::Exam).await.unwrap_err();

        let core: studyshelf_core::Error = err.into();
        assert!(core.is_retryable());
    }
}
