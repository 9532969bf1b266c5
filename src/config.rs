use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::Category;

const DEFAULT_PROXY_URL: &str = "http://localhost:4000/v1";

/// One entry of the model registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    pub category: Category,
    /// Speech model driven through chat completions with base64 `input_audio`
    /// instead of the multipart transcription endpoint.
    #[serde(default)]
    pub audio_chat: bool,
}

impl ModelProfile {
    fn new(id: &str, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            audio_chat: false,
        }
    }

    fn audio_chat(id: &str) -> Self {
        Self {
            id: id.into(),
            category: Category::Speech,
            audio_chat: true,
        }
    }
}

/// Models offered per category, with their capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelRegistry {
    profiles: Vec<ModelProfile>,
}

impl ModelRegistry {
    pub fn new(profiles: Vec<ModelProfile>) -> Self {
        Self { profiles }
    }

    /// First model listed for the category.
    pub fn default_for(&self, category: Category) -> Option<&str> {
        self.models_for(category).next()
    }

    pub fn models_for(&self, category: Category) -> impl Iterator<Item = &str> {
        self.profiles
            .iter()
            .filter(move |p| p.category == category)
            .map(|p| p.id.as_str())
    }

    /// Unlisted models never get the audio-chat path.
    pub fn is_audio_chat(&self, model: &str) -> bool {
        self.profiles
            .iter()
            .any(|p| p.audio_chat && p.id == model)
    }

    pub fn profiles(&self) -> &[ModelProfile] {
        &self.profiles
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(vec![
            ModelProfile::new("OpenAI/gpt-4o-mini", Category::Text),
            ModelProfile::new("Google/gemini-2.0-flash", Category::Text),
            ModelProfile::new("SambaNova/Meta-Llama-3.3-70B-Instruct", Category::Text),
            ModelProfile::new("OpenAI/dall-e-3", Category::Image),
            ModelProfile::new("OpenAI/tts-1", Category::Tts),
            ModelProfile::new("OpenAI/gpt-4o-mini", Category::Vision),
            ModelProfile::new("SambaNova/Llama-4-Maverick-17B-128E-Instruct", Category::Vision),
            ModelProfile::new("OpenAI/whisper-1", Category::Speech),
            ModelProfile::new("SambaNova/Whisper-Large-v3", Category::Speech),
            ModelProfile::audio_chat("SambaNova/Qwen2-Audio-7B-Instruct"),
            ModelProfile::new("SambaNova/Meta-Llama-3.3-70B-Instruct", Category::Tools),
            ModelProfile::new("OpenAI/gpt-4o-mini", Category::Tools),
        ])
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub proxy_url: String,
    /// Sent as a bearer token when non-empty.
    pub api_key: String,
    pub request_log_capacity: usize,
    pub preview_debounce_ms: u64,
    pub models: ModelRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.into(),
            api_key: String::new(),
            request_log_capacity: 50,
            preview_debounce_ms: 500,
            models: ModelRegistry::default(),
        }
    }
}

impl Config {
    /// Directory: ~/.config/proxy-studio/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("proxy-studio");
        p
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::path())
    }

    fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.proxy_url.trim_end_matches('/')
    }

    pub fn api_key(&self) -> Option<&str> {
        Some(self.api_key.as_str()).filter(|k| !k.is_empty())
    }
}
