use reqwest::{multipart, Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

use super::batch::UploadVerb;
use super::discovery::FileEntry;
use super::retry::{with_backoff, RetryConfig};

/// Body of `POST /api/story/create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewStory {
    pub name: String,
    pub title: String,
    pub slug: String,
    pub group: String,
}

/// HTTP client for the story service
pub struct StoryClient {
    client: Client,
    base_url: String,
    token: String,
    retry_config: RetryConfig,
}

impl StoryClient {
    /// `host` is `name[:port]`; requests always go over plain http.
    pub fn new(
        host: &str,
        token: &str,
        retry_config: RetryConfig,
        request_timeout: Option<Duration>,
    ) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: format!("http://{}", host.trim_end_matches('/')),
            token: token.to_string(),
            retry_config,
        })
    }

    /// `http://<host>/<path>/<resource-id>`
    pub fn story_url(&self, path: &str, resource_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            path.trim_matches('/'),
            resource_id.trim()
        )
    }

    /// Send one batch. Transport failures are retried with backoff; an error
    /// status from the service fails straight away.
    pub async fn send_batch(
        &self,
        verb: UploadVerb,
        url: &str,
        payload: &UploadPayload,
    ) -> AppResult<StatusCode> {
        let method = verb.method();

        let response = with_backoff(&self.retry_config, |attempt| {
            let method = method.clone();
            async move {
                // multipart::Form is consumed by send, so rebuild it per attempt
                let form = payload.build_form()?;
                log::debug!(
                    "{} {} (attempt {}) headers: Authorization: Bearer {} parts: [{}]",
                    method,
                    url,
                    attempt,
                    InputValidator::redact_token(&self.token),
                    payload.field_names().join(", ")
                );

                let response = self
                    .client
                    .request(method, url)
                    .bearer_auth(&self.token)
                    .multipart(form)
                    .send()
                    .await?;
                Ok(response)
            }
        })
        .await?;

        ensure_success(&method, url, response).await
    }

    /// Register a new story and return its id.
    pub async fn create_story(&self, story: &NewStory) -> AppResult<String> {
        let url = format!("{}/api/story/create", self.base_url);
        log::debug!("POST {} for story '{}'", url, story.slug);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(story)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::upload_failed(&Method::POST, &url, status.as_u16(), body));
        }

        let body = response.text().await?;
        extract_story_id(&body)
    }
}

async fn ensure_success(method: &Method, url: &str, response: Response) -> AppResult<StatusCode> {
    let status = response.status();
    if status.is_success() {
        return Ok(status);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    log::error!("{} {} rejected with {}: {}", method, url, status, body);
    Err(AppError::upload_failed(method, url, status.as_u16(), body))
}

/// Pull the `id` field out of the create-story response.
pub fn extract_story_id(response_body: &str) -> AppResult<String> {
    let json: serde_json::Value = serde_json::from_str(response_body)?;
    json.get("id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::StoryResponse(format!("no string 'id' in {}", response_body)))
}

/// Files for one request, held in memory until the request completes.
#[derive(Debug, Clone, Default)]
pub struct UploadPayload {
    files: Vec<(String, Vec<u8>, String, String)>, // (filename, data, mime_type, field_name)
}

impl UploadPayload {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Read every entry of a batch. The field name is the story-relative path.
    pub async fn from_entries(entries: &[FileEntry]) -> AppResult<Self> {
        let mut payload = Self::new();
        for entry in entries {
            let data = entry.read().await?;
            payload.push(entry.relative_path.clone(), entry.basename(), data);
        }
        Ok(payload)
    }

    pub async fn add_file(&mut self, file_path: &str, field_name: String) -> AppResult<()> {
        let file_contents = tokio::fs::read(file_path).await?;
        let filename = Path::new(file_path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        self.push(field_name, filename, file_contents);
        Ok(())
    }

    fn push(&mut self, field_name: String, filename: String, data: Vec<u8>) {
        let mime_type = mime_type_for(&filename);
        self.files
            .push((filename, data, mime_type.to_string(), field_name));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.files.iter().map(|(_, _, _, field)| field.as_str()).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|(_, data, _, _)| data.len()).sum()
    }

    pub fn build_form(&self) -> AppResult<multipart::Form> {
        // field names carry `/`, which the default encoding would mangle
        let mut form = multipart::Form::new().percent_encode_noop();

        for (filename, data, mime_type, field_name) in &self.files {
            let part = multipart::Part::bytes(data.clone())
                .file_name(filename.clone())
                .mime_str(mime_type)
                .map_err(|e| {
                    AppError::Config(format!("invalid content type {}: {}", mime_type, e))
                })?;

            form = form.part(field_name.clone(), part);
        }

        Ok(form)
    }
}

fn mime_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "text/javascript",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STORY_ID: &str = "ddd44fd5-25ac-4154-9f30-049c7c1bae82";

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            exponential_base: 2.0,
            max_delay_ms: None,
        }
    }

    fn client_for(server: &MockServer) -> StoryClient {
        StoryClient::new(&server.address().to_string(), "test-token", fast_retry(), None).unwrap()
    }

    fn payload() -> UploadPayload {
        let mut payload = UploadPayload::new();
        payload.push(
            "subpage/test.html".to_string(),
            "test.html".to_string(),
            b"<p>hi</p>".to_vec(),
        );
        payload
    }

    #[test]
    fn test_story_url() {
        let client = StoryClient::new("localhost:8080", "t", RetryConfig::default(), None).unwrap();
        assert_eq!(
            client.story_url("/quarto/update/", STORY_ID),
            format!("http://localhost:8080/quarto/update/{}", STORY_ID)
        );
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("index.html"), "text/html");
        assert_eq!(mime_type_for("STYLE.CSS"), "text/css");
        assert_eq!(mime_type_for("quarto.min.js"), "text/javascript");
        assert_eq!(mime_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_payload_fields() {
        let payload = payload();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.field_names(), vec!["subpage/test.html"]);
        assert_eq!(payload.total_bytes(), 9);
        assert!(payload.build_form().is_ok());
    }

    #[test]
    fn test_extract_story_id() {
        assert_eq!(
            extract_story_id(r#"{"id": "abc", "name": "x"}"#).unwrap(),
            "abc"
        );
        assert!(matches!(
            extract_story_id(r#"{"name": "x"}"#),
            Err(AppError::StoryResponse(_))
        ));
        assert!(matches!(extract_story_id("not json"), Err(AppError::Json(_))));
    }

    #[tokio::test]
    async fn test_create_verb_sends_put_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/quarto/update/{}", STORY_ID)))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.story_url("quarto/update", STORY_ID);
        let status = client
            .send_batch(UploadVerb::Create, &url, &payload())
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains(r#"name="subpage/test.html""#));
        assert!(body.contains(r#"filename="test.html""#));
        assert!(body.contains("<p>hi</p>"));
    }

    #[tokio::test]
    async fn test_update_verb_sends_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.story_url("quarto/update", STORY_ID);
        assert!(client
            .send_batch(UploadVerb::Update, &url, &payload())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.story_url("quarto/update", STORY_ID);
        let err = client
            .send_batch(UploadVerb::Create, &url, &payload())
            .await
            .unwrap_err();

        match err {
            AppError::UploadFailed { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_with_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = StoryClient::new(&addr.to_string(), "t", fast_retry(), None).unwrap();
        let url = client.story_url("quarto/update", STORY_ID);
        let err = client
            .send_batch(UploadVerb::Create, &url, &payload())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_create_story_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/story/create"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": STORY_ID,
                "name": "Min datafortelling om noe"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let story = NewStory {
            name: "Min datafortelling om noe".to_string(),
            title: "Min datafortelling om noe".to_string(),
            slug: "min-datafortelling".to_string(),
            group: "team@example.com".to_string(),
        };
        let id = client_for(&server).create_story(&story).await.unwrap();
        assert_eq!(id, STORY_ID);

        let requests = server.received_requests().await.unwrap();
        let sent: NewStory = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent, story);
    }

    #[tokio::test]
    async fn test_create_story_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let story = NewStory {
            name: "n".to_string(),
            title: "t".to_string(),
            slug: "s".to_string(),
            group: "g".to_string(),
        };
        let err = client_for(&server).create_story(&story).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
