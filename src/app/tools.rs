use async_trait::async_trait;
use serde_json::json;

use super::lifecycle::{FeatureContext, FeatureController};
use crate::error::ProxyError;
use crate::proxy::{ChatMessage, ChatRequest, MessageContent};
use crate::storage::Category;
use crate::tools::ToolRegistry;
use crate::ui::html::{escape, newlines_to_br};

#[derive(Debug, Clone)]
pub struct ToolsInput {
    pub model: String,
    pub prompt: String,
}

/// Function calling: the model may call local tools, whose results are sent
/// back in a second completion. Intermediate steps go to the function-call
/// log.
pub struct ToolsController {
    ctx: FeatureContext,
    registry: ToolRegistry,
}

impl ToolsController {
    pub fn new(ctx: FeatureContext) -> Self {
        Self::with_registry(ctx, ToolRegistry::with_builtin())
    }

    pub fn with_registry(ctx: FeatureContext, registry: ToolRegistry) -> Self {
        Self { ctx, registry }
    }

    fn log_step(&self, text: &str) {
        self.ctx
            .surface()
            .append_function_log(&format!("<div class=\"log-entry\">{}</div>", escape(text)));
    }
}

fn render_answer(content: &str) -> String {
    format!(
        "<div class=\"markdown-content\">{}</div>",
        newlines_to_br(content)
    )
}

#[async_trait]
impl FeatureController for ToolsController {
    type Input = ToolsInput;

    fn context(&self) -> &FeatureContext {
        &self.ctx
    }

    fn category(&self) -> Category {
        Category::Tools
    }

    fn busy_label(&self) -> &'static str {
        "Calling..."
    }

    fn model<'a>(&self, input: &'a ToolsInput) -> &'a str {
        &input.model
    }

    fn validate(&self, input: &ToolsInput) -> Result<(), &'static str> {
        if input.prompt.trim().is_empty() {
            return Err("Please enter a prompt.");
        }
        Ok(())
    }

    async fn perform(&self, input: &ToolsInput) -> Result<String, ProxyError> {
        self.ctx.surface().clear_function_log();
        let tools = self.registry.definitions();
        let mut messages = vec![ChatMessage::user(MessageContent::Text(input.prompt.clone()))];

        self.log_step("Sending request to the model...");
        let request = ChatRequest::new(&input.model, messages.clone()).with_tools(tools.clone());
        let reply = self.ctx.proxy.chat_completion(&request).await?.into_message()?;
        self.log_step("Response received");

        let calls = reply.tool_calls().to_vec();
        if calls.is_empty() {
            return Ok(render_answer(&reply.text()));
        }
        self.log_step(&format!("{} tool call(s) detected", calls.len()));

        messages.push(reply);
        for call in &calls {
            let name = &call.function.name;
            self.log_step(&format!("Calling {name} with {}", call.function.arguments));
            let content = match self.registry.call(name, &call.function.arguments) {
                Ok(value) => value.to_string(),
                Err(e) => {
                    log::warn!("Tool call {name} failed: {e}");
                    json!({ "error": e.to_string() }).to_string()
                }
            };
            self.log_step(&format!("Tool result: {content}"));
            messages.push(ChatMessage::tool_result(call, content));
        }

        self.log_step("Sending follow-up request with tool results...");
        let request = ChatRequest::new(&input.model, messages).with_tools(tools);
        let answer = self.ctx.proxy.chat_completion(&request).await?.into_message()?;
        self.log_step("Final response received");

        Ok(render_answer(&answer.text()))
    }
}
