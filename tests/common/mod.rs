#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use proxy_studio::app::FeatureContext;
use proxy_studio::config::ModelRegistry;
use proxy_studio::error::ProxyError;
use proxy_studio::proxy::{
    ChatRequest, ChatResponse, FetchedResource, ImageRequest, ImageResponse, ModelList,
    ProxyApi, SpeechRequest, TranscriptionRequest, TranscriptionResponse,
};
use proxy_studio::storage::{MemoryStore, ResultStore};
use proxy_studio::ui::HtmlPage;

/// A request the fake proxy received.
#[derive(Debug, Clone)]
pub enum Call {
    Chat(ChatRequest),
    Image(ImageRequest),
    Speech(SpeechRequest),
    Transcribe(TranscriptionRequest),
    Models,
    Fetch(String),
}

/// Scripted reply, consumed in order.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Bytes(Vec<u8>, Option<String>),
    Status(u16),
    /// The connection itself fails.
    Refused(String),
}

/// In-process stand-in for the proxy: records every call and answers with
/// the next scripted reply.
#[derive(Default)]
pub struct FakeProxy {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl FakeProxy {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Chat(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn next(&self, call: Call) -> Result<Reply, ProxyError> {
        self.calls.lock().unwrap().push(call);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProxyError::Decode("no scripted reply".into()))?;
        match reply {
            Reply::Status(code) => Err(ProxyError::Status {
                status: StatusCode::from_u16(code).unwrap(),
                body: String::new(),
            }),
            Reply::Refused(message) => Err(ProxyError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message,
            ))),
            other => Ok(other),
        }
    }

    fn next_json<T: DeserializeOwned>(&self, call: Call) -> Result<T, ProxyError> {
        match self.next(call)? {
            Reply::Json(value) => {
                serde_json::from_value(value).map_err(|e| ProxyError::Decode(e.to_string()))
            }
            other => panic!("expected a JSON reply, scripted {other:?}"),
        }
    }

    fn next_bytes(&self, call: Call) -> Result<(Vec<u8>, Option<String>), ProxyError> {
        match self.next(call)? {
            Reply::Bytes(bytes, content_type) => Ok((bytes, content_type)),
            other => panic!("expected a binary reply, scripted {other:?}"),
        }
    }
}

#[async_trait]
impl ProxyApi for FakeProxy {
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProxyError> {
        self.next_json(Call::Chat(request.clone()))
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse, ProxyError> {
        self.next_json(Call::Image(request.clone()))
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProxyError> {
        self.next_bytes(Call::Speech(request.clone()))
            .map(|(bytes, _)| bytes)
    }

    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResponse, ProxyError> {
        self.next_json(Call::Transcribe(request.clone()))
    }

    async fn list_models(&self) -> Result<ModelList, ProxyError> {
        self.next_json(Call::Models)
    }

    async fn fetch(&self, url: &str) -> Result<FetchedResource, ProxyError> {
        self.next_bytes(Call::Fetch(url.to_string()))
            .map(|(bytes, content_type)| FetchedResource {
                bytes,
                content_type,
            })
    }
}

/// Chat completion reply with plain assistant content.
pub fn chat_reply(content: &str) -> Reply {
    Reply::Json(json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

pub struct Harness {
    pub ctx: FeatureContext,
    pub proxy: Arc<FakeProxy>,
    pub page: Arc<HtmlPage>,
    pub kv: Arc<MemoryStore>,
    pub store: ResultStore,
}

pub fn harness(replies: Vec<Reply>) -> Harness {
    let proxy = Arc::new(FakeProxy::new(replies));
    let page = Arc::new(HtmlPage::new());
    let kv = Arc::new(MemoryStore::new());
    let store = ResultStore::new(kv.clone(), page.clone());
    let ctx = FeatureContext::new(proxy.clone(), store.clone(), ModelRegistry::default());
    Harness {
        ctx,
        proxy,
        page,
        kv,
        store,
    }
}
