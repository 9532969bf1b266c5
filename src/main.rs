mod cli;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use proxy_studio::app::{
    submit, AudioSource, FeatureContext, ImageController, ImageInput, ImageSource,
    ImageUrlPreview, Outcome, SpeechController, SpeechInput, TextController, TextInput,
    ToolsController, ToolsInput, TtsController, TtsInput, VisionController, VisionInput,
};
use proxy_studio::config::Config;
use proxy_studio::proxy::{ProxyApi, ProxyClient};
use proxy_studio::request_log::RequestLog;
use proxy_studio::storage::{Category, FileStore, ResultStore};
use proxy_studio::ui::results_view::format_date;
use proxy_studio::ui::{HtmlPage, ResultsView};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(url) = &cli.proxy_url {
        config.proxy_url = url.clone();
    }
    log::info!("Proxy Studio starting, proxy at {}", config.base_url());

    let page = Arc::new(HtmlPage::new());
    let kv = Arc::new(FileStore::open(FileStore::default_path())?);
    let store = ResultStore::new(kv, page.clone());
    if let Err(e) = store.restore() {
        log::warn!("Could not restore saved results: {e}");
    }

    let request_log = Arc::new(RequestLog::new(config.request_log_capacity).with_surface(page.clone()));
    let proxy: Arc<dyn ProxyApi> =
        Arc::new(ProxyClient::from_config(&config).with_request_log(request_log.clone()));
    let ctx = FeatureContext::new(proxy, store.clone(), config.models.clone());

    let result = run(cli.command, &ctx, &config, &page).await;

    if cli.log {
        print!("{}", request_log.render_text());
    }
    if let Some(path) = &cli.page {
        tokio::fs::write(path, page.render_document()).await?;
        println!("Wrote {}", path.display());
    }
    result
}

async fn run(
    command: Command,
    ctx: &FeatureContext,
    config: &Config,
    page: &HtmlPage,
) -> Result<(), Box<dyn Error>> {
    let model = |category: Category, chosen: Option<String>| {
        chosen
            .or_else(|| config.models.default_for(category).map(str::to_string))
            .unwrap_or_default()
    };

    match command {
        Command::Text(args) => {
            let input = TextInput {
                model: model(Category::Text, args.model),
                prompt: args.prompt,
            };
            report(submit(&TextController::new(ctx.clone()), input).await)
        }
        Command::Image(args) => {
            let mut input = ImageInput::new(&model(Category::Image, args.model), &args.prompt);
            input.size = args.size;
            input.quality = args.quality;
            report(submit(&ImageController::new(ctx.clone()), input).await)
        }
        Command::Tts(args) => {
            let input = TtsInput {
                model: model(Category::Tts, args.model),
                voice: args.voice,
                text: args.text,
            };
            report(submit(&TtsController::new(ctx.clone()), input).await)
        }
        Command::Vision(args) => {
            let preview = ImageUrlPreview::new(
                ctx.surface().clone(),
                Duration::from_millis(config.preview_debounce_ms),
            );
            let image = ImageSource::pick(args.file, args.url.as_deref());
            if let Some(ImageSource::Url(url)) = &image {
                preview.url_changed(url);
            }
            let input = VisionInput {
                model: model(Category::Vision, args.model),
                prompt: args.prompt,
                image,
            };
            let outcome = submit(&VisionController::new(ctx.clone()), input).await;
            preview.settled().await;
            report(outcome)
        }
        Command::Speech(args) => {
            #[cfg(feature = "microphone")]
            let recorded = match args.record_secs {
                Some(secs) => Some(record(secs).await?),
                None => None,
            };
            #[cfg(not(feature = "microphone"))]
            let recorded = None;

            let input = SpeechInput {
                model: model(Category::Speech, args.model),
                language: args.language,
                audio: AudioSource::pick(recorded, args.file, args.url.as_deref()),
            };
            report(submit(&SpeechController::new(ctx.clone()), input).await)
        }
        Command::Tools(args) => {
            let input = ToolsInput {
                model: model(Category::Tools, args.model),
                prompt: args.prompt,
            };
            let outcome = submit(&ToolsController::new(ctx.clone()), input).await;
            for entry in page.function_log() {
                println!("  {entry}");
            }
            report(outcome)
        }
        Command::Models => {
            let models = ctx.proxy.list_models().await?;
            for model in models.data {
                match model.owned_by {
                    Some(owner) => println!("{} ({owner})", model.id),
                    None => println!("{}", model.id),
                }
            }
            Ok(())
        }
        Command::Results => {
            let cards = ResultsView::new(ctx.store.clone()).cards();
            if cards.is_empty() {
                println!("No saved results");
            }
            for card in cards {
                println!(
                    "{}#{}  {}  model={}  {} ms  {}",
                    card.category,
                    card.index,
                    card.label,
                    card.model,
                    card.processing_time,
                    format_date(&card.timestamp)
                );
                println!("    {}", card.preview);
            }
            Ok(())
        }
        Command::View(args) => {
            if !ResultsView::new(ctx.store.clone()).view(args.category, args.index) {
                return Err(format!("no {} result #{}", args.category, args.index).into());
            }
            let pane = page.pane(args.category);
            println!("{}", pane.result_html);
            println!("Processing time: {} ms", pane.timing);
            Ok(())
        }
        Command::Delete(args) => {
            if !ResultsView::new(ctx.store.clone()).delete(args.category, args.index)? {
                return Err(format!("no {} result #{}", args.category, args.index).into());
            }
            println!("Deleted {} result #{}", args.category, args.index);
            Ok(())
        }
        Command::Reset { target } => {
            ctx.store.reset(target)?;
            println!("Cleared saved results: {target}");
            Ok(())
        }
        Command::Export { path } => {
            tokio::fs::write(&path, page.render_document()).await?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Config(args) => {
            let mut saved = Config::load();
            let changed = args.set_proxy_url.is_some() || args.set_api_key.is_some();
            if let Some(url) = args.set_proxy_url {
                saved.proxy_url = url;
            }
            if let Some(key) = args.set_api_key {
                saved.api_key = key;
            }
            if changed {
                saved.save()?;
                println!("Saved {}", Config::path().display());
            }
            println!("proxy_url = {}", saved.base_url());
            println!(
                "api_key   = {}",
                if saved.api_key().is_some() { "(set)" } else { "(none)" }
            );
            Ok(())
        }
    }
}

fn report(outcome: Outcome) -> Result<(), Box<dyn Error>> {
    match outcome {
        Outcome::Succeeded { html, elapsed_ms } => {
            println!("{html}");
            println!("Processing time: {elapsed_ms} ms");
            Ok(())
        }
        Outcome::Rejected(message) => Err(message.into()),
        Outcome::Failed { message, .. } => Err(message.into()),
    }
}

#[cfg(feature = "microphone")]
async fn record(secs: u64) -> Result<proxy_studio::recorder::RecordedAudio, Box<dyn Error>> {
    let mut session = proxy_studio::recorder::AudioRecordingSession::new();
    session.start()?;
    println!("Recording for {secs}s...");
    tokio::time::sleep(Duration::from_secs(secs)).await;
    Ok(session.stop()?)
}
