mod client;
mod types;

use async_trait::async_trait;

use crate::error::ProxyError;

pub use client::ProxyClient;
pub use types::{
    AudioFile, ChatMessage, ChatRequest, ChatResponse, ContentPart, FetchedResource,
    FunctionCall, FunctionDefinition, ImageRequest, ImageResponse, MessageContent, ModelInfo,
    ModelList, SpeechRequest, ToolCall, ToolDefinition, TranscriptionRequest,
    TranscriptionResponse,
};

/// The OpenAI-compatible endpoints of the proxy, plus plain GETs for
/// inputs referenced by URL.
#[async_trait]
pub trait ProxyApi: Send + Sync {
    /// `POST {base}/chat/completions`
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProxyError>;

    /// `POST {base}/images/generations`
    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse, ProxyError>;

    /// `POST {base}/audio/speech`; returns the encoded audio.
    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProxyError>;

    /// `POST {base}/audio/transcriptions` (multipart)
    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResponse, ProxyError>;

    /// `GET {base}/models`
    async fn list_models(&self) -> Result<ModelList, ProxyError>;

    /// `GET` an arbitrary URL, e.g. an image or audio file to forward.
    async fn fetch(&self, url: &str) -> Result<FetchedResource, ProxyError>;
}
