use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;

use super::lifecycle::{FeatureContext, FeatureController};
use crate::error::ProxyError;
use crate::mime::{audio_mime_from_file_name, subtype};
use crate::proxy::{AudioFile, ChatMessage, ChatRequest, ContentPart, MessageContent, TranscriptionRequest};
use crate::recorder::RecordedAudio;
use crate::storage::Category;
use crate::ui::html::{escape, newlines_to_br};

const FALLBACK_MIME: &str = "audio/mp3";

/// Where the audio to transcribe comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    Recorded(RecordedAudio),
    File(PathBuf),
    Url(String),
}

impl AudioSource {
    /// Recorded audio wins over a file, a file over a URL.
    pub fn pick(
        recorded: Option<RecordedAudio>,
        file: Option<PathBuf>,
        url: Option<&str>,
    ) -> Option<Self> {
        recorded
            .map(AudioSource::Recorded)
            .or_else(|| file.map(AudioSource::File))
            .or_else(|| {
                url.map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(|u| AudioSource::Url(u.to_string()))
            })
    }
}

#[derive(Debug, Clone)]
pub struct SpeechInput {
    pub model: String,
    /// `auto` or an ISO 639-1 code.
    pub language: String,
    pub audio: Option<AudioSource>,
}

/// Speech-to-text, either through the transcription endpoint or, for
/// audio-capable chat models, as a chat completion carrying the audio.
pub struct SpeechController {
    ctx: FeatureContext,
}

impl SpeechController {
    pub fn new(ctx: FeatureContext) -> Self {
        Self { ctx }
    }

    async fn load(&self, source: &AudioSource) -> Result<AudioFile, ProxyError> {
        match source {
            AudioSource::Recorded(recorded) => Ok(AudioFile {
                file_name: recorded.file_name.clone(),
                mime: recorded.mime.clone(),
                bytes: recorded.bytes.clone(),
            }),
            AudioSource::File(path) => {
                let bytes = tokio::fs::read(path).await?;
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string();
                Ok(AudioFile {
                    mime: audio_mime_from_file_name(&file_name)
                        .unwrap_or(FALLBACK_MIME)
                        .to_string(),
                    file_name,
                    bytes,
                })
            }
            AudioSource::Url(url) => {
                let fetched = self.ctx.proxy.fetch(url).await?;
                let file_name = file_name_from_url(url);
                Ok(AudioFile {
                    mime: audio_mime_from_file_name(&file_name)
                        .unwrap_or(FALLBACK_MIME)
                        .to_string(),
                    file_name,
                    bytes: fetched.bytes,
                })
            }
        }
    }

    async fn chat_transcription(
        &self,
        model: &str,
        language: Option<&str>,
        audio: AudioFile,
    ) -> Result<String, ProxyError> {
        let format = subtype(&audio.mime).unwrap_or("wav").to_string();
        let data = base64::engine::general_purpose::STANDARD.encode(&audio.bytes);

        let mut request = ChatRequest::new(
            model,
            vec![ChatMessage::user(MessageContent::Parts(vec![
                ContentPart::text(&instruction(language)),
                ContentPart::input_audio(data, &format),
            ]))],
        );
        request.language = language.map(str::to_string);

        let message = self.ctx.proxy.chat_completion(&request).await?.into_message()?;
        Ok(newlines_to_br(&message.text()))
    }

    async fn endpoint_transcription(
        &self,
        model: &str,
        language: Option<&str>,
        audio: AudioFile,
    ) -> Result<String, ProxyError> {
        let request = TranscriptionRequest {
            model: model.to_string(),
            file: audio,
            language: language.map(str::to_string),
        };
        let response = self.ctx.proxy.transcribe(&request).await?;
        Ok(escape(&response.text))
    }
}

/// Last path segment of a URL, ignoring query and fragment.
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("audio.mp3")
        .to_string()
}

fn language_name(code: &str) -> &str {
    match code {
        "ja" => "Japanese",
        "en" => "English",
        "zh" => "Chinese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "ru" => "Russian",
        other => other,
    }
}

/// Instruction sent alongside the audio to chat models.
fn instruction(language: Option<&str>) -> String {
    match language {
        Some(code) => format!(
            "This is {} audio. Please transcribe the contents of this recording.",
            language_name(code)
        ),
        None => "What does this recording contain?".into(),
    }
}

#[async_trait]
impl FeatureController for SpeechController {
    type Input = SpeechInput;

    fn context(&self) -> &FeatureContext {
        &self.ctx
    }

    fn category(&self) -> Category {
        Category::Speech
    }

    fn busy_label(&self) -> &'static str {
        "Transcribing..."
    }

    fn model<'a>(&self, input: &'a SpeechInput) -> &'a str {
        &input.model
    }

    fn validate(&self, input: &SpeechInput) -> Result<(), &'static str> {
        if input.audio.is_none() {
            return Err("Please upload or record audio.");
        }
        Ok(())
    }

    async fn perform(&self, input: &SpeechInput) -> Result<String, ProxyError> {
        let source = input
            .audio
            .as_ref()
            .ok_or_else(|| ProxyError::Decode("no audio given".into()))?;
        let audio = self.load(source).await?;
        let language = Some(input.language.trim())
            .filter(|l| !l.is_empty() && *l != "auto");

        if self.ctx.models.is_audio_chat(&input.model) {
            self.chat_transcription(&input.model, language, audio).await
        } else {
            self.endpoint_transcription(&input.model, language, audio).await
        }
    }
}
