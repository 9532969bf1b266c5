use async_trait::async_trait;

use super::lifecycle::{FeatureContext, FeatureController};
use crate::error::ProxyError;
use crate::proxy::{ChatMessage, ChatRequest, ContentPart, MessageContent};
use crate::storage::Category;
use crate::ui::html::newlines_to_br;

#[derive(Debug, Clone)]
pub struct TextInput {
    pub model: String,
    pub prompt: String,
}

/// Chat completion from a single prompt.
pub struct TextController {
    ctx: FeatureContext,
}

impl TextController {
    pub fn new(ctx: FeatureContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FeatureController for TextController {
    type Input = TextInput;

    fn context(&self) -> &FeatureContext {
        &self.ctx
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn busy_label(&self) -> &'static str {
        "Generating..."
    }

    fn model<'a>(&self, input: &'a TextInput) -> &'a str {
        &input.model
    }

    fn validate(&self, input: &TextInput) -> Result<(), &'static str> {
        if input.prompt.trim().is_empty() {
            return Err("Please enter a prompt.");
        }
        Ok(())
    }

    async fn perform(&self, input: &TextInput) -> Result<String, ProxyError> {
        let request = ChatRequest::new(
            &input.model,
            vec![ChatMessage::user(MessageContent::Parts(vec![
                ContentPart::text(&input.prompt),
            ]))],
        );
        let message = self.ctx.proxy.chat_completion(&request).await?.into_message()?;
        Ok(newlines_to_br(&message.text()))
    }
}
