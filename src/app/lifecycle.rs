use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::Phase;
use crate::config::ModelRegistry;
use crate::error::ProxyError;
use crate::proxy::ProxyApi;
use crate::storage::{Category, ProcessingTime, ResultStore};
use crate::ui::html::escape;
use crate::ui::ResultSurface;

/// What every controller needs: the proxy, the result store (and through it
/// the page), and the model registry.
#[derive(Clone)]
pub struct FeatureContext {
    pub proxy: Arc<dyn ProxyApi>,
    pub store: ResultStore,
    pub models: ModelRegistry,
}

impl FeatureContext {
    pub fn new(proxy: Arc<dyn ProxyApi>, store: ResultStore, models: ModelRegistry) -> Self {
        Self {
            proxy,
            store,
            models,
        }
    }

    pub fn surface(&self) -> &Arc<dyn ResultSurface> {
        self.store.surface()
    }
}

/// How one submission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Input failed validation; nothing was sent or saved.
    Rejected(String),
    Succeeded { html: String, elapsed_ms: u64 },
    /// The request failed; the error was rendered and saved.
    Failed { html: String, message: String },
}

impl Outcome {
    pub fn html(&self) -> &str {
        match self {
            Outcome::Rejected(message) => message,
            Outcome::Succeeded { html, .. } | Outcome::Failed { html, .. } => html,
        }
    }
}

/// One feature tab: validation, the request(s) and the rendering of the
/// response. The shared lifecycle around it lives in [`submit`].
#[async_trait]
pub trait FeatureController: Send + Sync {
    type Input: Send + Sync;

    fn context(&self) -> &FeatureContext;
    fn category(&self) -> Category;
    fn busy_label(&self) -> &'static str;
    fn model<'a>(&self, input: &'a Self::Input) -> &'a str;

    /// `Err` carries the message shown instead of sending anything.
    fn validate(&self, input: &Self::Input) -> Result<(), &'static str>;

    /// Issue the request(s) and render the response as HTML.
    async fn perform(&self, input: &Self::Input) -> Result<String, ProxyError>;
}

/// Puts the pane back to idle however the submission ends.
struct IdleOnDrop<'a> {
    surface: &'a dyn ResultSurface,
    category: Category,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.surface.set_phase(self.category, Phase::Idle);
    }
}

/// Run one submission through validation, the request and persistence.
///
/// Failures are rendered, logged and saved with an unknown processing time;
/// they never propagate past this point.
pub async fn submit<C>(controller: &C, input: C::Input) -> Outcome
where
    C: FeatureController + ?Sized,
{
    let ctx = controller.context();
    let category = controller.category();
    let surface = ctx.surface().as_ref();
    let model = controller.model(&input).to_string();

    surface.set_phase(category, Phase::Validating);
    if let Err(message) = controller.validate(&input) {
        surface.set_result(category, &escape(message));
        surface.set_phase(category, Phase::Idle);
        return Outcome::Rejected(message.to_string());
    }

    let _idle = IdleOnDrop { surface, category };
    surface.set_phase(
        category,
        Phase::InFlight {
            busy_label: controller.busy_label(),
        },
    );
    surface.set_result(category, "");
    surface.set_timing(category, "-");

    let start = Instant::now();
    let result = controller.perform(&input).await;

    match result {
        Ok(html) => {
            let elapsed_ms = (start.elapsed().as_secs_f64() * 1000.0).round() as u64;
            surface.set_result(category, &html);
            surface.set_timing(category, &elapsed_ms.to_string());
            surface.set_phase(category, Phase::Succeeded);
            persist(&ctx.store, category, &html, ProcessingTime::Millis(elapsed_ms), &model);
            Outcome::Succeeded { html, elapsed_ms }
        }
        Err(e) => {
            log::error!("{} request failed: {e}", category.label());
            let message = e.to_string();
            let html = escape(&format!("An error occurred: {message}"));
            surface.set_result(category, &html);
            surface.set_timing(category, "-");
            surface.set_phase(category, Phase::Failed);
            persist(&ctx.store, category, &html, ProcessingTime::Unknown, &model);
            Outcome::Failed { html, message }
        }
    }
}

fn persist(store: &ResultStore, category: Category, html: &str, time: ProcessingTime, model: &str) {
    let model = (!model.is_empty()).then_some(model);
    if let Err(e) = store.save(category, html, time, model) {
        log::warn!("Could not save {category} result: {e}");
    }
}
