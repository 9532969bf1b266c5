use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use proxy_studio::storage::{Category, ResetTarget};

#[derive(Debug, Parser)]
#[command(
    name = "proxy-studio",
    version,
    about = "Multi-modal client for an OpenAI-compatible LLM proxy"
)]
pub struct Cli {
    /// Override the configured proxy base URL.
    #[arg(long, global = true)]
    pub proxy_url: Option<String>,
    /// Print the request log after the command.
    #[arg(long, global = true)]
    pub log: bool,
    /// Also write the page as an HTML file after the command.
    #[arg(long, global = true, value_name = "PATH")]
    pub page: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate text from a prompt.
    Text(PromptArgs),
    /// Generate an image.
    Image(ImageArgs),
    /// Synthesize speech.
    Tts(TtsArgs),
    /// Ask about an image.
    Vision(VisionArgs),
    /// Transcribe audio.
    Speech(SpeechArgs),
    /// Run the function-calling demo.
    Tools(PromptArgs),
    /// List the models the proxy serves.
    Models,
    /// List saved results, newest first.
    Results,
    /// Show one saved result.
    View(RecordArgs),
    /// Delete one saved result.
    Delete(RecordArgs),
    /// Clear saved results of one category, or `all`.
    Reset { target: ResetTarget },
    /// Write the page, with every pane and panel, as an HTML file.
    Export { path: PathBuf },
    /// Show or change the saved settings.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct PromptArgs {
    #[arg(long)]
    pub model: Option<String>,
    pub prompt: String,
}

#[derive(Debug, Args)]
pub struct ImageArgs {
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long, default_value = "1024x1024")]
    pub size: String,
    #[arg(long, default_value = "standard")]
    pub quality: String,
    pub prompt: String,
}

#[derive(Debug, Args)]
pub struct TtsArgs {
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long, default_value = "alloy")]
    pub voice: String,
    pub text: String,
}

#[derive(Debug, Args)]
pub struct VisionArgs {
    #[arg(long)]
    pub model: Option<String>,
    /// Local image; takes precedence over --url.
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub url: Option<String>,
    pub prompt: String,
}

#[derive(Debug, Args)]
pub struct SpeechArgs {
    #[arg(long)]
    pub model: Option<String>,
    /// `auto` or an ISO 639-1 code.
    #[arg(long, default_value = "auto")]
    pub language: String,
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub url: Option<String>,
    /// Record this many seconds from the microphone first.
    #[cfg(feature = "microphone")]
    #[arg(long)]
    pub record_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long, value_name = "URL")]
    pub set_proxy_url: Option<String>,
    #[arg(long, value_name = "KEY")]
    pub set_api_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    pub category: Category,
    pub index: usize,
}
