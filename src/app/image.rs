use async_trait::async_trait;

use super::lifecycle::{FeatureContext, FeatureController};
use crate::error::ProxyError;
use crate::proxy::ImageRequest;
use crate::storage::Category;
use crate::ui::html::escape;

pub const DEFAULT_SIZE: &str = "1024x1024";
pub const DEFAULT_QUALITY: &str = "standard";

#[derive(Debug, Clone)]
pub struct ImageInput {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
}

impl ImageInput {
    pub fn new(model: &str, prompt: &str) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            size: DEFAULT_SIZE.into(),
            quality: DEFAULT_QUALITY.into(),
        }
    }
}

pub struct ImageController {
    ctx: FeatureContext,
}

impl ImageController {
    pub fn new(ctx: FeatureContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FeatureController for ImageController {
    type Input = ImageInput;

    fn context(&self) -> &FeatureContext {
        &self.ctx
    }

    fn category(&self) -> Category {
        Category::Image
    }

    fn busy_label(&self) -> &'static str {
        "Generating..."
    }

    fn model<'a>(&self, input: &'a ImageInput) -> &'a str {
        &input.model
    }

    fn validate(&self, input: &ImageInput) -> Result<(), &'static str> {
        if input.prompt.trim().is_empty() {
            return Err("Please enter a prompt.");
        }
        Ok(())
    }

    async fn perform(&self, input: &ImageInput) -> Result<String, ProxyError> {
        let request = ImageRequest {
            model: input.model.clone(),
            prompt: input.prompt.clone(),
            n: 1,
            size: input.size.clone(),
            quality: input.quality.clone(),
            response_format: "url".into(),
        };
        let response = self.ctx.proxy.generate_image(&request).await?;
        let url = response
            .first_url()
            .ok_or_else(|| ProxyError::Decode("no image URL in response".into()))?;
        let url = escape(url);
        Ok(format!(
            "<img src=\"{url}\" alt=\"Generated image\"><p>Image URL: {url}</p>"
        ))
    }
}
