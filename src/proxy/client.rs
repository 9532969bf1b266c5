use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    ChatRequest, ChatResponse, FetchedResource, ImageRequest, ImageResponse, ModelList,
    SpeechRequest, TranscriptionRequest, TranscriptionResponse,
};
use super::ProxyApi;
use crate::config::Config;
use crate::error::ProxyError;
use crate::request_log::{RequestLog, RequestLogEntry, RequestStatus};

/// A fully read response.
struct Received {
    status: StatusCode,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// HTTP client for the proxy. Every request goes through [`Self::execute`],
/// which times it and records it in the request log.
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    log: Option<Arc<RequestLog>>,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            log: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(config.base_url());
        client.api_key = config.api_key().map(str::to_string);
        client
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = (!api_key.is_empty()).then(|| api_key.to_string());
        self
    }

    pub fn with_request_log(mut self, log: Arc<RequestLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Only traffic to the proxy itself is logged.
    fn is_proxy_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn execute(
        &self,
        method: &str,
        url: &str,
        builder: RequestBuilder,
        request_body: String,
    ) -> Result<Received, ProxyError> {
        let started_at = Local::now();
        let start = Instant::now();
        let outcome = read_response(builder).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(received) => log::info!("{method} {url} -> {} ({duration_ms}ms)", received.status),
            Err(e) => log::info!("{method} {url} failed after {duration_ms}ms: {e}"),
        }

        if let Some(request_log) = self.log.as_ref().filter(|_| self.is_proxy_url(url)) {
            let (status, response_body) = match &outcome {
                Ok(received) => (
                    RequestStatus::Http {
                        code: received.status.as_u16(),
                        reason: received
                            .status
                            .canonical_reason()
                            .unwrap_or_default()
                            .to_string(),
                    },
                    summarize_body(&received.bytes, received.content_type.as_deref()),
                ),
                Err(e) => (RequestStatus::Error(e.to_string()), String::new()),
            };
            request_log.push(RequestLogEntry {
                method: method.to_string(),
                url: url.to_string(),
                request_body,
                started_at,
                duration_ms,
                status,
                response_body,
            });
        }

        let received = outcome?;
        if !received.status.is_success() {
            return Err(ProxyError::Status {
                status: received.status,
                body: String::from_utf8_lossy(&received.bytes).into_owned(),
            });
        }
        Ok(received)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ProxyError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let received = self.post_json_raw(path, body).await?;
        decode(&received.bytes)
    }

    async fn post_json_raw<B>(&self, path: &str, body: &B) -> Result<Received, ProxyError>
    where
        B: Serialize + Sync,
    {
        let url = self.endpoint(path);
        let json = serde_json::to_string(body).map_err(|e| ProxyError::Decode(e.to_string()))?;
        let builder = self
            .authorize(self.http.post(&url))
            .header(CONTENT_TYPE, "application/json")
            .body(json.clone());
        self.execute("POST", &url, builder, json).await
    }

    async fn get(&self, url: &str) -> Result<Received, ProxyError> {
        let mut builder = self.http.get(url);
        if self.is_proxy_url(url) {
            builder = self.authorize(builder);
        }
        self.execute("GET", url, builder, String::new()).await
    }
}

#[async_trait]
impl ProxyApi for ProxyClient {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProxyError> {
        self.post_json("/chat/completions", request).await
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse, ProxyError> {
        self.post_json("/images/generations", request).await
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProxyError> {
        let received = self.post_json_raw("/audio/speech", request).await?;
        Ok(received.bytes)
    }

    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResponse, ProxyError> {
        let url = self.endpoint("/audio/transcriptions");
        let file = &request.file;

        let mut summary = format!(
            "file={} ({}), model={}",
            file.file_name,
            binary_summary(file.bytes.len(), &file.mime),
            request.model
        );
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)?;
        let mut form = Form::new()
            .part("file", part)
            .text("model", request.model.clone());
        if let Some(language) = &request.language {
            form = form.text("language", language.clone());
            summary.push_str(&format!(", language={language}"));
        }

        let builder = self.authorize(self.http.post(&url)).multipart(form);
        let received = self.execute("POST", &url, builder, summary).await?;
        decode(&received.bytes)
    }

    async fn list_models(&self) -> Result<ModelList, ProxyError> {
        let url = self.endpoint("/models");
        let received = self.get(&url).await?;
        decode(&received.bytes)
    }

    async fn fetch(&self, url: &str) -> Result<FetchedResource, ProxyError> {
        let received = self.get(url).await?;
        Ok(FetchedResource {
            bytes: received.bytes,
            content_type: received.content_type,
        })
    }
}

async fn read_response(builder: RequestBuilder) -> Result<Received, reqwest::Error> {
    let response = builder.send().await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk?);
    }

    Ok(Received {
        status,
        content_type,
        bytes,
    })
}

fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, ProxyError> {
    serde_json::from_slice(bytes).map_err(|e| ProxyError::Decode(e.to_string()))
}

fn binary_summary(len: usize, mime: &str) -> String {
    format!("<{len} bytes, {mime}>")
}

/// Text and JSON bodies are kept; anything else is reduced to its size.
fn summarize_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let mime = content_type.unwrap_or("application/octet-stream");
    let textual = mime.starts_with("text/") || mime.contains("json") || mime.contains("xml");
    if textual || (content_type.is_none() && std::str::from_utf8(bytes).is_ok()) {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        binary_summary(bytes.len(), mime)
    }
}
