use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;

use super::lifecycle::{FeatureContext, FeatureController};
use crate::error::ProxyError;
use crate::proxy::SpeechRequest;
use crate::storage::Category;
use crate::ui::html::escape;

#[derive(Debug, Clone)]
pub struct TtsInput {
    pub model: String,
    pub voice: String,
    pub text: String,
}

/// Text-to-speech. The audio is embedded as a data URI so a saved result
/// still plays after a reload.
pub struct TtsController {
    ctx: FeatureContext,
}

impl TtsController {
    pub fn new(ctx: FeatureContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FeatureController for TtsController {
    type Input = TtsInput;

    fn context(&self) -> &FeatureContext {
        &self.ctx
    }

    fn category(&self) -> Category {
        Category::Tts
    }

    fn busy_label(&self) -> &'static str {
        "Generating..."
    }

    fn model<'a>(&self, input: &'a TtsInput) -> &'a str {
        &input.model
    }

    fn validate(&self, input: &TtsInput) -> Result<(), &'static str> {
        if input.text.trim().is_empty() {
            return Err("Please enter some text.");
        }
        Ok(())
    }

    async fn perform(&self, input: &TtsInput) -> Result<String, ProxyError> {
        let request = SpeechRequest {
            model: input.model.clone(),
            input: input.text.clone(),
            voice: input.voice.clone(),
            response_format: "mp3".into(),
        };
        let audio = self.ctx.proxy.synthesize_speech(&request).await?;
        if audio.is_empty() {
            return Err(ProxyError::Decode("empty audio response".into()));
        }

        let src = format!(
            "data:audio/mpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&audio)
        );
        let file_name = format!(
            "speech_{}_{}.mp3",
            escape(&input.voice),
            Utc::now().timestamp_millis()
        );
        Ok(format!(
            "<audio controls src=\"{src}\" style=\"width: 100%\"></audio>\
             <a href=\"{src}\" download=\"{file_name}\" class=\"download-link\">Download</a>"
        ))
    }
}
