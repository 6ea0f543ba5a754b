//! The transport client: one HTTP round trip per call, a consistent header
//! policy, and a typed envelope per call kind.
//!
//! Two long-lived connection handles are held: `api` carries the versioned
//! Accept media type and the bearer token on every request, `blob` is bare
//! for PUTs against pre-signed blob URLs.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Body, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use super::envelope::{
    parse_error, parse_page, unwrap_single_property, CreateEnvelope, ListEnvelope, SingleEnvelope,
    StatusEnvelope, UpdateEnvelope,
};

/// Origin of the hosted Storage API.
pub const DEFAULT_API_URL: &str = "https://api.stowage.cloud";

/// Versioned media type for entity calls.
const ACCEPT_JSON: &str = "application/vnd.stowage-platform.v1+json";
/// Media type requesting raw bytes on download calls.
const ACCEPT_OCTET: &str = "application/vnd.stowage-platform.v1+octet-stream";
/// Content type for PATCH bodies.
const CONTENT_JSON_PATCH: &str = "application/json-patch+json";
/// The blob store requires this header on pre-signed PUTs.
const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";

/// Faults the client cannot express in an envelope: the request never
/// completed, or a success body was not the JSON it must be.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response body is not the expected JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("writing download to disk failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("bearer token is not a valid header value")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
}

/// Immutable per-client configuration, constructed once.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `Authorization` value; a raw token gets the Bearer prefix, a pasted
    /// full header value is taken as-is.
    fn authorization(&self) -> String {
        if self.token.starts_with("Bearer ") {
            self.token.clone()
        } else {
            format!("Bearer {}", self.token)
        }
    }
}

pub struct ApiClient {
    config: ApiConfig,
    api: reqwest::Client,
    blob: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        default_headers.insert(AUTHORIZATION, HeaderValue::from_str(&config.authorization())?);

        let api = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(config.timeout)
            .build()?;
        let blob = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, api, blob })
    }

    /// Server-issued links are already absolute; short paths get the API
    /// origin prefixed.
    fn full_url(&self, path: &str) -> String {
        let lower = path.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.base_url, path)
        }
    }

    /// Rate-limited responses are surfaced to the caller, not retried here;
    /// log enough for an operator to act on.
    fn note_throttle(resp: &reqwest::Response) {
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unspecified");
            tracing::warn!(retry_after, "request was rate limited");
        }
    }

    /// GET a listing: the `items` array partitioned into files and folders,
    /// plus the `_links` object in the caller-specified link-set shape.
    pub async fn list<L>(
        &self,
        path: &str,
        extra: Option<HeaderMap>,
    ) -> Result<ListEnvelope<L>, ApiError>
    where
        L: DeserializeOwned + Default,
    {
        let mut req = self.api.get(self.full_url(path));
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        Self::note_throttle(&resp);
        let status = resp.status();
        let content = resp.text().await?;

        let mut envelope = ListEnvelope {
            status,
            content,
            error: None,
            page: None,
        };
        if status == StatusCode::OK {
            envelope.page = Some(parse_page(&envelope.content)?);
        } else {
            envelope.error = parse_error(&envelope.content);
        }
        tracing::debug!(%status, path, "list call finished");
        Ok(envelope)
    }

    /// GET one entity. The JSON property holding it is an explicit caller
    /// argument, not derived from the result type's name.
    pub async fn get_single<T>(
        &self,
        path: &str,
        field: &str,
        extra: Option<HeaderMap>,
    ) -> Result<SingleEnvelope<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut req = self.api.get(self.full_url(path));
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        Self::note_throttle(&resp);
        let status = resp.status();
        let content = resp.text().await?;

        let mut envelope = SingleEnvelope {
            status,
            content,
            error: None,
            instance: None,
        };
        if status == StatusCode::OK {
            let value: Value = serde_json::from_str(&envelope.content)?;
            if let Some(inner) = value.get(field) {
                envelope.instance = Some(serde_json::from_value(inner.clone())?);
            }
        } else {
            envelope.error = parse_error(&envelope.content);
        }
        tracing::debug!(%status, path, field, "single-entity call finished");
        Ok(envelope)
    }

    /// GET raw bytes and stream them to `dest` (create-or-truncate). On any
    /// non-200 status nothing is written; the body is kept as diagnostic
    /// content instead.
    pub async fn download(
        &self,
        path: &str,
        dest: &Path,
        extra: Option<HeaderMap>,
    ) -> Result<StatusEnvelope, ApiError> {
        let mut req = self
            .api
            .get(self.full_url(path))
            .header(ACCEPT, ACCEPT_OCTET);
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let mut resp = req.send().await?;
        Self::note_throttle(&resp);
        let status = resp.status();

        if status == StatusCode::OK {
            let mut file = tokio::fs::File::create(dest).await?;
            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            tracing::debug!(path, dest = %dest.display(), "download finished");
            Ok(StatusEnvelope {
                status,
                content: String::new(),
                error: None,
            })
        } else {
            let content = resp.text().await?;
            Ok(StatusEnvelope {
                status,
                content,
                error: None,
            })
        }
    }

    /// POST a JSON payload. On success the created entity arrives wrapped
    /// in a container keyed by entity type; it is unwrapped by position. An
    /// empty success body yields no entity.
    pub async fn create<B, T>(
        &self,
        path: &str,
        body: &B,
        extra: Option<HeaderMap>,
    ) -> Result<CreateEnvelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.api.post(self.full_url(path)).json(body);
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        Self::note_throttle(&resp);
        self.finish_post(path, resp).await
    }

    /// POST without a body: trigger actions (confirm upload, start a
    /// content update) that still answer with a wrapped entity.
    pub async fn invoke<T>(
        &self,
        path: &str,
        extra: Option<HeaderMap>,
    ) -> Result<CreateEnvelope<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut req = self.api.post(self.full_url(path));
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        Self::note_throttle(&resp);
        self.finish_post(path, resp).await
    }

    async fn finish_post<T>(
        &self,
        path: &str,
        resp: reqwest::Response,
    ) -> Result<CreateEnvelope<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let status = resp.status();
        let content = resp.text().await?;

        let mut envelope = CreateEnvelope {
            status,
            content,
            error: None,
            created: None,
        };
        if !envelope.content.is_empty() {
            if status.is_success() {
                envelope.created = unwrap_single_property(&envelope.content)?;
            } else {
                envelope.error = parse_error(&envelope.content);
            }
        }
        tracing::debug!(%status, path, "post call finished");
        Ok(envelope)
    }

    /// POST without a body where no entity comes back (restore calls).
    pub async fn invoke_empty(
        &self,
        path: &str,
        extra: Option<HeaderMap>,
    ) -> Result<StatusEnvelope, ApiError> {
        let mut req = self.api.post(self.full_url(path));
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        Self::note_throttle(&resp);
        let status = resp.status();
        let content = resp.text().await?;
        let error = if status.is_success() {
            None
        } else {
            parse_error(&content)
        };
        Ok(StatusEnvelope {
            status,
            content,
            error,
        })
    }

    /// PATCH with the JSON Patch content type; 200 answers with the updated
    /// entity, wrapped like a creation response.
    pub async fn update<B, T>(
        &self,
        path: &str,
        body: &B,
        extra: Option<HeaderMap>,
    ) -> Result<UpdateEnvelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let mut req = self
            .api
            .patch(self.full_url(path))
            .header(CONTENT_TYPE, CONTENT_JSON_PATCH)
            .body(payload);
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        Self::note_throttle(&resp);
        let status = resp.status();
        let content = resp.text().await?;

        let mut envelope = UpdateEnvelope {
            status,
            content,
            error: None,
            updated: None,
        };
        if status == StatusCode::OK {
            envelope.updated = unwrap_single_property(&envelope.content)?;
        } else {
            envelope.error = parse_error(&envelope.content);
        }
        tracing::debug!(%status, path, "update call finished");
        Ok(envelope)
    }

    /// PUT bytes straight to a pre-signed blob URL: no origin prefix, no
    /// bearer token, required blob-type header. The body streams from the
    /// given source.
    pub async fn upload_blob(
        &self,
        url: &str,
        content: impl Into<Body>,
    ) -> Result<StatusEnvelope, ApiError> {
        let resp = self
            .blob
            .put(url)
            .header(BLOB_TYPE_HEADER, "BlockBlob")
            .body(content)
            .send()
            .await?;
        let status = resp.status();
        let content = if status.is_success() {
            String::new()
        } else {
            resp.text().await?
        };
        tracing::debug!(%status, url, "blob upload finished");
        Ok(StatusEnvelope {
            status,
            content,
            error: None,
        })
    }

    /// DELETE. HTTP 204 is the only success signal; anything else, 200
    /// included, is treated as failure and mined for error details.
    pub async fn delete(
        &self,
        path: &str,
        extra: Option<HeaderMap>,
    ) -> Result<StatusEnvelope, ApiError> {
        let mut req = self.api.delete(self.full_url(path));
        if let Some(headers) = extra {
            req = req.headers(headers);
        }
        let resp = req.send().await?;
        Self::note_throttle(&resp);
        let status = resp.status();

        if status == StatusCode::NO_CONTENT {
            Ok(StatusEnvelope {
                status,
                content: String::new(),
                error: None,
            })
        } else {
            let content = resp.text().await?;
            let error = parse_error(&content);
            tracing::debug!(%status, path, "delete call did not return 204");
            Ok(StatusEnvelope {
                status,
                content,
                error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Folder, FolderCreate, FolderUpdate, PageLinks, TopLevelLinks};
    use axum::extract::Path as UrlPath;
    use axum::http::{HeaderMap as RequestHeaders, StatusCode as HttpStatus};
    use axum::routing::{delete, get, patch, post, put};
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(ApiConfig::new(base, "test-token")).unwrap()
    }

    #[test]
    fn full_url_prefixes_relative_paths_only() {
        let client = ApiClient::new(ApiConfig::new("https://api.test/", "t")).unwrap();
        assert_eq!(
            client.full_url("/storage/folders/x"),
            "https://api.test/storage/folders/x"
        );
        assert_eq!(client.full_url("https://other/abs"), "https://other/abs");
        assert_eq!(client.full_url("HTTPS://other/abs"), "HTTPS://other/abs");
    }

    #[test]
    fn authorization_normalizes_to_bearer() {
        assert_eq!(
            ApiConfig::new("https://api.test", "abc").authorization(),
            "Bearer abc"
        );
        assert_eq!(
            ApiConfig::new("https://api.test", "Bearer abc").authorization(),
            "Bearer abc"
        );
    }

    #[tokio::test]
    async fn list_partitions_items_and_extracts_links() {
        let app = Router::new().route(
            "/storage/folders/:id/list",
            get(|UrlPath(id): UrlPath<String>| async move {
                assert_eq!(id, "root");
                Json(json!({
                    "items": [
                        {"type": "file", "id": "f1", "displayName": "a.txt", "size": 12},
                        {"type": "folder", "id": "d1", "displayName": "sub"},
                        {"type": "shortcut", "id": "s1", "displayName": "x"}
                    ],
                    "_links": {"self": {"href": "https://api.test/page"}}
                }))
            }),
        );
        let base = serve(app).await;

        let envelope = client(&base)
            .list::<PageLinks>("/storage/folders/root/list", None)
            .await
            .unwrap();

        assert_eq!(envelope.status, StatusCode::OK);
        assert!(envelope.error.is_none());
        let page = envelope.page.unwrap();
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.files[0].id, "f1");
        assert_eq!(page.files[0].size, Some(12));
        assert_eq!(page.folders.len(), 1);
        assert_eq!(page.folders[0].id, "d1");
        assert_eq!(page.links.current.unwrap().href, "https://api.test/page");
    }

    #[tokio::test]
    async fn list_sends_default_headers_and_defaults_missing_links() {
        let app = Router::new().route(
            "/storage",
            get(|headers: RequestHeaders| async move {
                assert_eq!(
                    headers.get("authorization").unwrap(),
                    "Bearer test-token"
                );
                assert_eq!(headers.get("accept").unwrap(), ACCEPT_JSON);
                Json(json!({"items": []}))
            }),
        );
        let base = serve(app).await;

        let envelope = client(&base)
            .list::<PageLinks>("/storage?projectId=p1", None)
            .await
            .unwrap();
        let page = envelope.page.unwrap();
        assert!(page.files.is_empty() && page.folders.is_empty());
        assert!(page.links.current.is_none());
    }

    #[tokio::test]
    async fn list_failure_decodes_error_and_keeps_page_empty() {
        let app = Router::new().route(
            "/storage/folders/:id/list",
            get(|| async {
                (
                    HttpStatus::NOT_FOUND,
                    Json(json!({"error": {"code": "FolderNotFound", "message": "gone"}})),
                )
            }),
        );
        let base = serve(app).await;

        let envelope = client(&base)
            .list::<PageLinks>("/storage/folders/missing/list", None)
            .await
            .unwrap();

        assert_eq!(envelope.status, StatusCode::NOT_FOUND);
        assert!(envelope.page.is_none());
        assert_eq!(envelope.error.unwrap().code, "FolderNotFound");
    }

    #[tokio::test]
    async fn list_failure_tolerates_bodies_without_error_object() {
        let app = Router::new().route(
            "/storage",
            get(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(app).await;

        let envelope = client(&base).list::<PageLinks>("/storage", None).await.unwrap();
        assert_eq!(envelope.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(envelope.error.is_none());
        assert_eq!(envelope.content, "boom");
    }

    #[tokio::test]
    async fn get_single_reads_the_named_field() {
        let app = Router::new().route(
            "/storage/folders/:id",
            get(|| async {
                Json(json!({"folder": {"id": "d7", "displayName": "docs"}}))
            }),
        );
        let base = serve(app).await;
        let api = client(&base);

        let envelope = api
            .get_single::<Folder>("/storage/folders/d7", "folder", None)
            .await
            .unwrap();
        assert_eq!(envelope.instance.unwrap().id, "d7");

        // Server-issued absolute links are followed without re-prefixing.
        let envelope = api
            .get_single::<Folder>(&format!("{base}/storage/folders/d7"), "folder", None)
            .await
            .unwrap();
        assert_eq!(envelope.instance.unwrap().display_name, "docs");
    }

    #[tokio::test]
    async fn create_unwraps_entity_regardless_of_wrapper_key() {
        let app = Router::new().route(
            "/storage/folders/:id/folders",
            post(|Json(body): Json<serde_json::Value>| async move {
                // Payload must arrive camelCase with nulls omitted.
                assert!(body.get("displayName").is_some());
                assert!(body.get("description").is_none());
                (
                    HttpStatus::CREATED,
                    Json(json!({"folder": {"id": "abc", "displayName": body["displayName"]}})),
                )
            }),
        );
        let base = serve(app).await;

        let envelope = client(&base)
            .create::<_, Folder>(
                "/storage/folders/root/folders",
                &FolderCreate::new("Test Folder - 1f0e"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(envelope.status, StatusCode::CREATED);
        let folder = envelope.created.unwrap();
        assert_eq!(folder.id, "abc");
        assert_eq!(folder.display_name, "Test Folder - 1f0e");
    }

    #[tokio::test]
    async fn create_with_empty_body_yields_no_entity() {
        let app = Router::new().route(
            "/storage/folders/:id/folders",
            post(|| async { HttpStatus::NO_CONTENT }),
        );
        let base = serve(app).await;

        let envelope = client(&base)
            .create::<_, Folder>(
                "/storage/folders/root/folders",
                &FolderCreate::new("quiet"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(envelope.status, StatusCode::NO_CONTENT);
        assert!(envelope.created.is_none());
        assert!(envelope.error.is_none());
    }

    #[tokio::test]
    async fn update_uses_json_patch_content_type() {
        let app = Router::new().route(
            "/storage/folders/:id",
            patch(|headers: RequestHeaders, body: String| async move {
                assert_eq!(
                    headers.get("content-type").unwrap(),
                    CONTENT_JSON_PATCH
                );
                assert!(body.contains("displayName"));
                Json(json!({"folder": {"id": "d1", "displayName": "renamed"}}))
            }),
        );
        let base = serve(app).await;

        let envelope = client(&base)
            .update::<_, Folder>(
                "/storage/folders/d1",
                &FolderUpdate {
                    display_name: Some("renamed".into()),
                    description: None,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(envelope.updated.unwrap().display_name, "renamed");
    }

    #[tokio::test]
    async fn delete_treats_only_204_as_success() {
        let app = Router::new()
            .route("/storage/folders/:id", delete(|| async { HttpStatus::NO_CONTENT }))
            .route(
                "/storage/files/:id",
                delete(|| async {
                    (
                        HttpStatus::OK,
                        Json(json!({"error": {"code": "NotDeleted", "message": "still there"}})),
                    )
                }),
            );
        let base = serve(app).await;
        let api = client(&base);

        let ok = api.delete("/storage/folders/d1", None).await.unwrap();
        assert_eq!(ok.status, StatusCode::NO_CONTENT);
        assert!(ok.error.is_none());

        let not_ok = api.delete("/storage/files/f1", None).await.unwrap();
        assert_eq!(not_ok.status, StatusCode::OK);
        assert_eq!(not_ok.error.unwrap().code, "NotDeleted");
    }

    #[tokio::test]
    async fn download_writes_exact_bytes_and_overwrites() {
        let app = Router::new().route(
            "/storage/files/:id/download",
            get(|headers: RequestHeaders| async move {
                assert_eq!(headers.get("accept").unwrap(), ACCEPT_OCTET);
                b"alpha-bytes".to_vec()
            }),
        );
        let base = serve(app).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");
        std::fs::write(&dest, "stale content that is longer").unwrap();

        let envelope = client(&base)
            .download("/storage/files/f1/download", &dest, None)
            .await
            .unwrap();

        assert_eq!(envelope.status, StatusCode::OK);
        assert_eq!(std::fs::read(&dest).unwrap(), b"alpha-bytes");
    }

    #[tokio::test]
    async fn download_failure_writes_nothing_and_keeps_body_text() {
        let app = Router::new().route(
            "/storage/files/:id/download",
            get(|| async { (HttpStatus::NOT_FOUND, "no such file") }),
        );
        let base = serve(app).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never-created.bin");

        let envelope = client(&base)
            .download("/storage/files/f1/download", &dest, None)
            .await
            .unwrap();

        assert_eq!(envelope.status, StatusCode::NOT_FOUND);
        assert_eq!(envelope.content, "no such file");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn upload_blob_sends_blob_header_without_bearer_token() {
        let app = Router::new().route(
            "/blob/:id",
            put(|headers: RequestHeaders, body: String| async move {
                assert_eq!(headers.get("x-ms-blob-type").unwrap(), "BlockBlob");
                assert!(headers.get("authorization").is_none());
                assert_eq!(body, "payload");
                HttpStatus::CREATED
            }),
        );
        let base = serve(app).await;

        let envelope = client(&base)
            .upload_blob(&format!("{base}/blob/1"), "payload")
            .await
            .unwrap();
        assert_eq!(envelope.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn extra_headers_are_merged_per_call() {
        let app = Router::new().route(
            "/storage",
            get(|headers: RequestHeaders| async move {
                assert_eq!(headers.get("x-correlation-id").unwrap(), "req-77");
                assert_eq!(headers.get("authorization").unwrap(), "Bearer test-token");
                Json(json!({"items": []}))
            }),
        );
        let base = serve(app).await;

        let mut extra = HeaderMap::new();
        extra.insert("x-correlation-id", HeaderValue::from_static("req-77"));
        let envelope = client(&base)
            .list::<PageLinks>("/storage", Some(extra))
            .await
            .unwrap();
        assert_eq!(envelope.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn throttled_status_is_surfaced_not_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/storage",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        HttpStatus::TOO_MANY_REQUESTS,
                        [("retry-after", "13")],
                        Json(json!({"error": {"code": "TooManyRequests", "message": "back off"}})),
                    )
                }
            }),
        );
        let base = serve(app).await;

        let envelope = client(&base).list::<TopLevelLinks>("/storage", None).await.unwrap();
        assert_eq!(envelope.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(envelope.error.unwrap().code, "TooManyRequests");
        assert!(envelope.page.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
