use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;

use super::lifecycle::{FeatureContext, FeatureController};
use crate::debounce::Debouncer;
use crate::error::ProxyError;
use crate::mime::image_mime_from_file_name;
use crate::proxy::{ChatMessage, ChatRequest, ContentPart, MessageContent};
use crate::storage::Category;
use crate::ui::html::{escape, newlines_to_br};
use crate::ui::ResultSurface;

/// Where the analysed image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    File(PathBuf),
    Url(String),
}

impl ImageSource {
    /// A selected file wins over a URL; a blank URL counts as none.
    pub fn pick(file: Option<PathBuf>, url: Option<&str>) -> Option<Self> {
        file.map(ImageSource::File).or_else(|| {
            url.map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|u| ImageSource::Url(u.to_string()))
        })
    }
}

#[derive(Debug, Clone)]
pub struct VisionInput {
    pub model: String,
    pub prompt: String,
    pub image: Option<ImageSource>,
}

pub struct VisionController {
    ctx: FeatureContext,
}

impl VisionController {
    pub fn new(ctx: FeatureContext) -> Self {
        Self { ctx }
    }

    /// The image as a `data:` URI.
    async fn image_data_uri(&self, source: &ImageSource) -> Result<String, ProxyError> {
        let (bytes, mime) = match source {
            ImageSource::File(path) => {
                let bytes = tokio::fs::read(path).await?;
                let mime = image_mime_from_path(path).unwrap_or("image/png").to_string();
                (bytes, mime)
            }
            ImageSource::Url(url) => {
                let fetched = self.ctx.proxy.fetch(url).await?;
                let mime = fetched
                    .content_type
                    .filter(|c| c.starts_with("image/"))
                    .or_else(|| image_mime_from_file_name(url).map(str::to_string))
                    .unwrap_or_else(|| "image/png".into());
                (fetched.bytes, mime)
            }
        };
        Ok(data_uri(&mime, &bytes))
    }
}

fn image_mime_from_path(path: &Path) -> Option<&'static str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(image_mime_from_file_name)
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let mime = mime.split(';').next().unwrap_or(mime).trim();
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[async_trait]
impl FeatureController for VisionController {
    type Input = VisionInput;

    fn context(&self) -> &FeatureContext {
        &self.ctx
    }

    fn category(&self) -> Category {
        Category::Vision
    }

    fn busy_label(&self) -> &'static str {
        "Analyzing..."
    }

    fn model<'a>(&self, input: &'a VisionInput) -> &'a str {
        &input.model
    }

    fn validate(&self, input: &VisionInput) -> Result<(), &'static str> {
        if input.prompt.trim().is_empty() {
            return Err("Please enter a prompt.");
        }
        if input.image.is_none() {
            return Err("Please upload an image or enter an image URL.");
        }
        Ok(())
    }

    async fn perform(&self, input: &VisionInput) -> Result<String, ProxyError> {
        let source = input
            .image
            .as_ref()
            .ok_or_else(|| ProxyError::Decode("no image given".into()))?;
        let image = self.image_data_uri(source).await?;

        let request = ChatRequest::new(
            &input.model,
            vec![ChatMessage::user(MessageContent::Parts(vec![
                ContentPart::text(&input.prompt),
                ContentPart::image_url(image),
            ]))],
        );
        let message = self.ctx.proxy.chat_completion(&request).await?.into_message()?;
        Ok(newlines_to_br(&message.text()))
    }
}

/// Preview of the vision tab's image input. URL edits are debounced so the
/// preview only follows the settled value.
pub struct ImageUrlPreview {
    surface: Arc<dyn ResultSurface>,
    debouncer: Debouncer<String>,
}

impl ImageUrlPreview {
    pub fn new(surface: Arc<dyn ResultSurface>, delay: Duration) -> Self {
        let target = surface.clone();
        let debouncer = Debouncer::new(delay, move |url: String| {
            target.set_preview(
                Category::Vision,
                &format!("<img src=\"{}\" alt=\"Image from URL\">", escape(&url)),
            );
        });
        Self { surface, debouncer }
    }

    /// URL input changed. Blank input leaves the preview as it is.
    pub fn url_changed(&self, url: &str) {
        let url = url.trim();
        if url.is_empty() {
            self.debouncer.cancel();
            return;
        }
        self.debouncer.call(url.to_string());
    }

    /// Wait for a pending URL preview to be shown.
    pub async fn settled(&self) {
        self.debouncer.settled().await;
    }

    /// A file was selected; it replaces any URL preview at once.
    pub fn file_selected(&self, file_name: &str, bytes: &[u8]) {
        self.debouncer.cancel();
        let mime = image_mime_from_file_name(file_name).unwrap_or("image/png");
        self.surface.set_preview(
            Category::Vision,
            &format!(
                "<img src=\"{}\" alt=\"Selected image\">",
                data_uri(mime, bytes)
            ),
        );
    }
}
