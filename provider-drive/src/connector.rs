//! Drive API connector implementation
//!
//! Implements the `ObjectStore` trait for a Drive-style REST API v3.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{
    NodeKind, NodePage, ObjectStore, ProgressFn, RemoteNode, StoreResult, TransferProgress,
};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{DriveError, Result};
use crate::types::{
    CreateNodeRequest, CreatedNodeResponse, DriveFile, FilesListResponse, FOLDER_MIME_TYPE,
};

/// Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Drive upload API base URL (resumable sessions)
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Maximum results per page (Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,md5Checksum";

/// Default transfer chunk size. Must stay a multiple of 256 KiB, the
/// resumable-upload granularity the API enforces.
const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Drive API connector
///
/// Implements `ObjectStore` for a Drive-style API v3.
///
/// # Features
///
/// - Query-based folder/file lookup with absence as `Ok(None)`
/// - Paginated child listing via `pageToken`
/// - Resumable chunked uploads with per-chunk progress
/// - Ranged chunked downloads (`206 Partial Content`)
/// - Exponential backoff on rate limits and server errors
///
/// # Example
///
/// ```ignore
/// use provider_drive::DriveConnector;
/// use bridge_traits::storage::ObjectStore;
///
/// let connector = DriveConnector::new(http_client, access_token);
/// let root = connector.find_folder("SessionLogs", None).await?;
/// ```
pub struct DriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// OAuth 2.0 access token, acquired elsewhere
    access_token: String,

    /// Transfer chunk size in bytes
    chunk_size: usize,

    /// Backoff policy for rate limits and server errors
    retry: RetryPolicy,
}

impl DriveConnector {
    /// Create a new Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP transport implementation
    /// * `access_token` - OAuth 2.0 access token with file scope
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the transfer chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build authorization header value
    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Escape a value for embedding in a Drive query string
    fn escape_query(value: &str) -> String {
        value.replace('\\', "\\\\").replace('\'', "\\'")
    }

    /// Parse RFC 3339 timestamp
    fn parse_timestamp(rfc3339: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Convert a DriveFile wire struct to a RemoteNode
    fn convert_file(drive_file: DriveFile) -> RemoteNode {
        let kind = if drive_file.is_folder() {
            NodeKind::Folder
        } else {
            NodeKind::File
        };

        RemoteNode {
            id: drive_file.id,
            name: drive_file.name,
            kind,
            size: drive_file.size.and_then(|s| s.parse().ok()),
            modified_at: drive_file
                .modified_time
                .as_deref()
                .and_then(Self::parse_timestamp),
            md5_checksum: drive_file.md5_checksum,
        }
    }

    /// Execute a request, retrying rate limits, server errors, and transport
    /// failures per the connector's retry policy.
    ///
    /// `accept` decides which statuses count as success; everything else
    /// that is not retryable is classified into a `DriveError`.
    async fn execute_with_backoff(
        &self,
        request: HttpRequest,
        accept: impl Fn(u16) -> bool,
    ) -> Result<HttpResponse> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.http_client.execute(request.clone()).await {
                Ok(response) => {
                    let status = response.status;

                    if accept(status) {
                        debug!(status, "API request succeeded");
                        return Ok(response);
                    }

                    let retryable = status == 429 || (500..600).contains(&status);
                    if !retryable || attempt >= self.retry.max_attempts {
                        warn!(status, attempt, "API request failed");
                        return Err(DriveError::from_status(
                            status,
                            String::from_utf8_lossy(&response.body).to_string(),
                        ));
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        status,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable API failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        warn!(error = %e, attempt, "API request failed at transport level");
                        return Err(e.into());
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transport failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// GET a JSON document
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let request = HttpRequest::new(HttpMethod::Get, url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(30));

        let response = self
            .execute_with_backoff(request, |s| (200..300).contains(&s))
            .await?;

        serde_json::from_slice(&response.body)
            .map_err(|e| DriveError::ParseError(format!("{}: {}", std::any::type_name::<T>(), e)))
    }

    /// Run a files.list query and return the first page
    async fn query_files(&self, query: &str, fields: &str, page_size: u32) -> Result<FilesListResponse> {
        let url = format!(
            "{}/files?q={}&spaces=drive&pageSize={}&fields=files({})",
            DRIVE_API_BASE,
            urlencoding::encode(query),
            page_size,
            fields
        );
        self.get_json(url).await
    }

    /// Initiate a resumable upload session and return the session URI
    async fn open_upload_session(
        &self,
        method: HttpMethod,
        url: String,
        metadata: Option<&CreateNodeRequest>,
        total_bytes: u64,
    ) -> Result<String> {
        let mut request = HttpRequest::new(method, url)
            .header("Authorization", self.auth_header())
            .header("X-Upload-Content-Length", total_bytes.to_string())
            .timeout(Duration::from_secs(30));

        if let Some(metadata) = metadata {
            request = request.json(metadata)?;
        } else {
            request = request
                .header("Content-Type", "application/json")
                .body(Bytes::from_static(b"{}"));
        }

        let response = self
            .execute_with_backoff(request, |s| (200..300).contains(&s))
            .await?;

        response
            .header("Location")
            .map(|s| s.to_string())
            .ok_or(DriveError::MissingUploadSession)
    }

    /// Push `data` through an open upload session in `chunk_size` pieces.
    ///
    /// The API answers `308 Resume Incomplete` between chunks and returns the
    /// finished file resource with the final one. `progress` fires after each
    /// chunk.
    async fn upload_chunks(
        &self,
        session_uri: &str,
        data: Bytes,
        progress: Option<&ProgressFn>,
    ) -> Result<DriveFile> {
        let total = data.len() as u64;

        // Zero-byte upload: one finalizing request with an empty range
        if data.is_empty() {
            let request = HttpRequest::new(HttpMethod::Put, session_uri)
                .header("Authorization", self.auth_header())
                .header("Content-Range", "bytes */0")
                .timeout(Duration::from_secs(60));

            let response = self
                .execute_with_backoff(request, |s| (200..300).contains(&s))
                .await?;
            return serde_json::from_slice(&response.body)
                .map_err(|e| DriveError::ParseError(format!("upload response: {}", e)));
        }

        let mut offset = 0usize;
        loop {
            let end = (offset + self.chunk_size).min(data.len());
            let chunk = data.slice(offset..end);
            let content_range = format!("bytes {}-{}/{}", offset, end - 1, total);

            let request = HttpRequest::new(HttpMethod::Put, session_uri)
                .header("Authorization", self.auth_header())
                .header("Content-Range", content_range)
                .body(chunk)
                .timeout(Duration::from_secs(60));

            let response = self
                .execute_with_backoff(request, |s| s == 308 || (200..300).contains(&s))
                .await?;

            if let Some(progress) = progress {
                progress(TransferProgress {
                    bytes_transferred: end as u64,
                    total_bytes: Some(total),
                });
            }

            if response.status == 308 {
                offset = end;
                continue;
            }

            debug!(total, "Upload session complete");
            return serde_json::from_slice(&response.body)
                .map_err(|e| DriveError::ParseError(format!("upload response: {}", e)));
        }
    }

    /// Parse the total size out of a `Content-Range: bytes a-b/total` header
    fn parse_content_range_total(header: &str) -> Option<u64> {
        header.rsplit('/').next()?.trim().parse().ok()
    }
}

#[async_trait]
impl ObjectStore for DriveConnector {
    #[instrument(skip(self), fields(name = %name))]
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> StoreResult<Option<String>> {
        let mut query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            Self::escape_query(name),
            FOLDER_MIME_TYPE
        );
        if let Some(parent_id) = parent_id {
            query.push_str(&format!(" and '{}' in parents", Self::escape_query(parent_id)));
        }

        let listing = self.query_files(&query, "id,name", 1).await?;
        Ok(listing.files.into_iter().next().map(|f| f.id))
    }

    #[instrument(skip(self), fields(name = %name, parent_id = %parent_id))]
    async fn find_file(&self, name: &str, parent_id: &str) -> StoreResult<Option<RemoteNode>> {
        let query = format!(
            "name='{}' and '{}' in parents and mimeType!='{}' and trashed=false",
            Self::escape_query(name),
            Self::escape_query(parent_id),
            FOLDER_MIME_TYPE
        );

        let listing = self.query_files(&query, FILE_FIELDS, 1).await?;
        Ok(listing.files.into_iter().next().map(Self::convert_file))
    }

    #[instrument(skip(self, cursor), fields(parent_id = %parent_id))]
    async fn list_children(
        &self,
        parent_id: &str,
        kind: NodeKind,
        cursor: Option<String>,
        page_size: u32,
    ) -> StoreResult<NodePage> {
        let mime_clause = match kind {
            NodeKind::Folder => format!("mimeType='{}'", FOLDER_MIME_TYPE),
            NodeKind::File => format!("mimeType!='{}'", FOLDER_MIME_TYPE),
        };
        let query = format!(
            "'{}' in parents and {} and trashed=false",
            Self::escape_query(parent_id),
            mime_clause
        );

        let mut url = format!(
            "{}/files?q={}&spaces=drive&pageSize={}&fields=nextPageToken,files({})",
            DRIVE_API_BASE,
            urlencoding::encode(&query),
            page_size.clamp(1, MAX_PAGE_SIZE),
            FILE_FIELDS
        );
        if let Some(page_token) = cursor {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(&page_token)));
        }

        let listing: FilesListResponse = self.get_json(url).await?;
        let nodes = listing.files.into_iter().map(Self::convert_file).collect();

        Ok(NodePage {
            nodes,
            next_cursor: listing.next_page_token,
        })
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> StoreResult<String> {
        let metadata = CreateNodeRequest {
            name: name.to_string(),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: parent_id.map(|p| vec![p.to_string()]).unwrap_or_default(),
        };

        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/files?fields=id", DRIVE_API_BASE),
        )
        .header("Authorization", self.auth_header())
        .json(&metadata)
        .map_err(DriveError::from)?
        .timeout(Duration::from_secs(30));

        let response = self
            .execute_with_backoff(request, |s| (200..300).contains(&s))
            .await?;

        let created: CreatedNodeResponse = serde_json::from_slice(&response.body)
            .map_err(|e| DriveError::ParseError(format!("create folder response: {}", e)))?;

        info!(folder_id = %created.id, "Created remote folder");
        Ok(created.id)
    }

    #[instrument(skip(self, data, progress), fields(name = %name, bytes = data.len()))]
    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> StoreResult<RemoteNode> {
        let metadata = CreateNodeRequest {
            name: name.to_string(),
            mime_type: None,
            parents: vec![parent_id.to_string()],
        };

        let session_uri = self
            .open_upload_session(
                HttpMethod::Post,
                format!(
                    "{}/files?uploadType=resumable&fields={}",
                    UPLOAD_API_BASE, FILE_FIELDS
                ),
                Some(&metadata),
                data.len() as u64,
            )
            .await?;

        let uploaded = self
            .upload_chunks(&session_uri, data, progress.as_ref())
            .await?;

        info!(file_id = %uploaded.id, "Uploaded file");
        Ok(Self::convert_file(uploaded))
    }

    #[instrument(skip(self, data, progress), fields(file_id = %file_id, bytes = data.len()))]
    async fn update_file(
        &self,
        file_id: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> StoreResult<RemoteNode> {
        let session_uri = self
            .open_upload_session(
                HttpMethod::Patch,
                format!(
                    "{}/files/{}?uploadType=resumable&fields={}",
                    UPLOAD_API_BASE, file_id, FILE_FIELDS
                ),
                None,
                data.len() as u64,
            )
            .await?;

        let updated = self
            .upload_chunks(&session_uri, data, progress.as_ref())
            .await?;

        info!(file_id = %updated.id, "Updated file content");
        Ok(Self::convert_file(updated))
    }

    #[instrument(skip(self, progress), fields(file_id = %file_id))]
    async fn download_file(
        &self,
        file_id: &str,
        progress: Option<ProgressFn>,
    ) -> StoreResult<Bytes> {
        let url = format!("{}/files/{}?alt=media", DRIVE_API_BASE, file_id);
        let mut assembled = BytesMut::new();

        loop {
            let start = assembled.len() as u64;
            let end = start + self.chunk_size as u64 - 1;

            let request = HttpRequest::new(HttpMethod::Get, url.clone())
                .header("Authorization", self.auth_header())
                .header("Range", format!("bytes={}-{}", start, end))
                .timeout(Duration::from_secs(60));

            let response = self
                .execute_with_backoff(request, |s| s == 200 || s == 206 || s == 416)
                .await?;

            match response.status {
                // Whole body at once; range was ignored or satisfied in full
                200 => {
                    let total = response.body.len() as u64;
                    if let Some(progress) = &progress {
                        progress(TransferProgress {
                            bytes_transferred: total,
                            total_bytes: Some(total),
                        });
                    }
                    info!(bytes = total, "Downloaded file");
                    return Ok(response.body);
                }
                206 => {
                    let total = response
                        .header("Content-Range")
                        .and_then(Self::parse_content_range_total)
                        .ok_or_else(|| {
                            DriveError::ParseError("missing Content-Range on 206".to_string())
                        })?;

                    assembled.extend_from_slice(&response.body);

                    if let Some(progress) = &progress {
                        progress(TransferProgress {
                            bytes_transferred: assembled.len() as u64,
                            total_bytes: Some(total),
                        });
                    }

                    if assembled.len() as u64 >= total {
                        info!(bytes = assembled.len(), "Downloaded file");
                        return Ok(assembled.freeze());
                    }
                }
                // Range past the end: the file is shorter than one chunk
                _ => {
                    info!(bytes = assembled.len(), "Downloaded file");
                    return Ok(assembled.freeze());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Hand-rolled scripted transport: pops one canned response per request
    /// and records every request for later assertions.
    struct ScriptedHttpClient {
        responses: Mutex<Vec<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(mut responses: Vec<HttpResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| bridge_traits::BridgeError::NotAvailable("script ended".into()))
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn response_with_header(status: u16, body: &str, key: &str, value: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert(key.to_string(), value.to_string());
        HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            use_exponential_backoff: false,
        }
    }

    fn connector(http: Arc<ScriptedHttpClient>) -> DriveConnector {
        DriveConnector::new(http, "test_token".to_string()).with_retry_policy(fast_retry())
    }

    #[tokio::test]
    async fn test_find_folder_returns_first_match() {
        let http = Arc::new(ScriptedHttpClient::new(vec![response(
            200,
            r#"{"files": [{"id": "folder1", "name": "SessionLogs", "mimeType": "application/vnd.google-apps.folder"}]}"#,
        )]));

        let found = connector(http.clone())
            .find_folder("SessionLogs", None)
            .await
            .unwrap();

        assert_eq!(found, Some("folder1".to_string()));
        let requests = http.recorded();
        assert!(requests[0].url.contains("name%3D%27SessionLogs%27"));
        assert!(requests[0].headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn test_find_folder_absence_is_none_not_error() {
        let http = Arc::new(ScriptedHttpClient::new(vec![response(200, r#"{"files": []}"#)]));

        let found = connector(http).find_folder("missing", None).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_find_file_scopes_query_to_parent() {
        let http = Arc::new(ScriptedHttpClient::new(vec![response(
            200,
            r#"{"files": [{"id": "file1", "name": "session_log.json", "mimeType": "application/json", "size": "42", "modifiedTime": "2024-11-26T10:02:00.000Z"}]}"#,
        )]));

        let node = connector(http.clone())
            .find_file("session_log.json", "folder1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(node.id, "file1");
        assert_eq!(node.size, Some(42));
        assert!(node.modified_at.is_some());
        assert!(http.recorded()[0].url.contains("folder1"));
    }

    #[tokio::test]
    async fn test_list_children_passes_cursor_through() {
        let http = Arc::new(ScriptedHttpClient::new(vec![response(
            200,
            r#"{"files": [{"id": "f1", "name": "20241126_100200", "mimeType": "application/vnd.google-apps.folder"}], "nextPageToken": "page2"}"#,
        )]));

        let page = connector(http.clone())
            .list_children("root1", NodeKind::Folder, Some("page1".to_string()), 1000)
            .await
            .unwrap();

        assert_eq!(page.nodes.len(), 1);
        assert_eq!(page.next_cursor, Some("page2".to_string()));
        assert!(http.recorded()[0].url.contains("pageToken=page1"));
    }

    #[tokio::test]
    async fn test_create_folder_posts_metadata() {
        let http = Arc::new(ScriptedHttpClient::new(vec![response(
            200,
            r#"{"id": "newfolder"}"#,
        )]));

        let id = connector(http.clone())
            .create_folder("20241126_100200", Some("root1"))
            .await
            .unwrap();

        assert_eq!(id, "newfolder");
        let requests = http.recorded();
        assert_eq!(requests[0].method, HttpMethod::Post);
        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["name"], "20241126_100200");
        assert_eq!(body["parents"][0], "root1");
    }

    #[tokio::test]
    async fn test_resumable_upload_chunk_sequencing() {
        // 5 bytes in 2-byte chunks: three PUTs after the session handshake
        let http = Arc::new(ScriptedHttpClient::new(vec![
            response_with_header(200, "", "Location", "https://upload.example/session1"),
            response(308, ""),
            response(308, ""),
            response(
                200,
                r#"{"id": "file1", "name": "session_log.json", "mimeType": "application/json", "size": "5"}"#,
            ),
        ]));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let progress: ProgressFn = Arc::new(move |p: TransferProgress| {
            seen_clone.lock().unwrap().push(p.bytes_transferred);
        });

        let node = connector(http.clone())
            .with_chunk_size(2)
            .upload_file("session_log.json", "folder1", Bytes::from("hello"), Some(progress))
            .await
            .unwrap();

        assert_eq!(node.id, "file1");
        assert_eq!(*seen.lock().unwrap(), vec![2, 4, 5]);

        let requests = http.recorded();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].url.contains("uploadType=resumable"));
        assert_eq!(
            requests[1].headers.get("Content-Range").map(String::as_str),
            Some("bytes 0-1/5")
        );
        assert_eq!(
            requests[2].headers.get("Content-Range").map(String::as_str),
            Some("bytes 2-3/5")
        );
        assert_eq!(
            requests[3].headers.get("Content-Range").map(String::as_str),
            Some("bytes 4-4/5")
        );
    }

    #[tokio::test]
    async fn test_update_file_opens_patch_session() {
        let http = Arc::new(ScriptedHttpClient::new(vec![
            response_with_header(200, "", "Location", "https://upload.example/session2"),
            response(
                200,
                r#"{"id": "cache1", "name": "sync_cache.json", "mimeType": "application/json"}"#,
            ),
        ]));

        let node = connector(http.clone())
            .update_file("cache1", Bytes::from("{}"), None)
            .await
            .unwrap();

        assert_eq!(node.id, "cache1");
        let requests = http.recorded();
        assert_eq!(requests[0].method, HttpMethod::Patch);
        assert!(requests[0].url.contains("/files/cache1?uploadType=resumable"));
    }

    #[tokio::test]
    async fn test_ranged_download_reassembly() {
        let http = Arc::new(ScriptedHttpClient::new(vec![
            response_with_header(206, "he", "Content-Range", "bytes 0-1/5"),
            response_with_header(206, "ll", "Content-Range", "bytes 2-3/5"),
            response_with_header(206, "o", "Content-Range", "bytes 4-4/5"),
        ]));

        let data = connector(http.clone())
            .with_chunk_size(2)
            .download_file("file1", None)
            .await
            .unwrap();

        assert_eq!(data, Bytes::from("hello"));
        let requests = http.recorded();
        assert_eq!(
            requests[0].headers.get("Range").map(String::as_str),
            Some("bytes=0-1")
        );
        assert_eq!(
            requests[2].headers.get("Range").map(String::as_str),
            Some("bytes=4-4")
        );
    }

    #[tokio::test]
    async fn test_download_accepts_full_response() {
        let http = Arc::new(ScriptedHttpClient::new(vec![response(200, "payload")]));

        let data = connector(http).download_file("file1", None).await.unwrap();
        assert_eq!(data, Bytes::from("payload"));
    }

    #[tokio::test]
    async fn test_retry_then_succeed_on_rate_limit() {
        let http = Arc::new(ScriptedHttpClient::new(vec![
            response(429, "slow down"),
            response(200, r#"{"files": []}"#),
        ]));

        let found = connector(http.clone()).find_folder("x", None).await.unwrap();
        assert_eq!(found, None);
        assert_eq!(http.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal_and_not_retried() {
        let http = Arc::new(ScriptedHttpClient::new(vec![response(401, "expired")]));

        let err = connector(http.clone())
            .find_folder("x", None)
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(http.recorded().len(), 1);
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(
            DriveConnector::parse_content_range_total("bytes 0-1048575/2097152"),
            Some(2097152)
        );
        assert_eq!(DriveConnector::parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(DriveConnector::escape_query("it's"), "it\\'s");
    }
}
