use crate::app::Phase;
use crate::storage::Category;

/// The page areas the result store and the feature controllers write to.
///
/// Every category owns a result container, a timing indicator, an optional
/// model selector, a trigger control and an input preview. The page also
/// has one saved-results container, the function-calling log and the
/// request log.
pub trait ResultSurface: Send + Sync {
    fn set_result(&self, category: Category, html: &str);
    fn set_timing(&self, category: Category, text: &str);
    fn has_model_selector(&self, category: Category) -> bool;
    fn select_model(&self, category: Category, model: &str);
    /// Render the controller state: the trigger is disabled and the loading
    /// indicator shown while the phase is in flight.
    fn set_phase(&self, category: Category, phase: Phase);
    fn set_preview(&self, category: Category, html: &str);
    fn activate_tab(&self, category: Category);
    fn set_saved_results(&self, html: &str);
    fn append_function_log(&self, html: &str);
    fn clear_function_log(&self);
    fn set_request_log(&self, html: &str);
}
