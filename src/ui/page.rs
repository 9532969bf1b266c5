use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Mutex;

use crate::app::Phase;
use crate::storage::Category;
use crate::ui::html::escape;
use crate::ui::surface::ResultSurface;

/// State of one category's tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Pane {
    pub result_html: String,
    pub timing: String,
    pub has_model_selector: bool,
    pub model: Option<String>,
    pub phase: Phase,
    pub preview_html: String,
}

impl Pane {
    fn new() -> Self {
        Self {
            result_html: String::new(),
            timing: "-".into(),
            has_model_selector: true,
            model: None,
            phase: Phase::Idle,
            preview_html: String::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::InFlight { .. })
    }

    /// Text of the trigger control.
    pub fn button_label(&self, category: Category) -> &'static str {
        match self.phase {
            Phase::InFlight { busy_label } => busy_label,
            _ => idle_label(category),
        }
    }
}

fn idle_label(category: Category) -> &'static str {
    match category {
        Category::Text => "Generate Text",
        Category::Image => "Generate Image",
        Category::Tts => "Generate Speech",
        Category::Vision => "Analyze Image",
        Category::Speech => "Transcribe Audio",
        Category::Tools => "Run Function Call",
    }
}

struct PageState {
    panes: BTreeMap<Category, Pane>,
    active_tab: Category,
    saved_results_html: String,
    function_log: Vec<String>,
    request_log_html: String,
}

/// In-process page model: the document the controllers and the result
/// store render into. Can be written out as a standalone HTML file.
pub struct HtmlPage {
    state: Mutex<PageState>,
}

impl HtmlPage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PageState {
                panes: Category::ALL.into_iter().map(|c| (c, Pane::new())).collect(),
                active_tab: Category::Text,
                saved_results_html: String::new(),
                function_log: Vec::new(),
                request_log_html: String::new(),
            }),
        }
    }

    pub fn without_model_selector(self, category: Category) -> Self {
        if let Some(pane) = self.state.lock().unwrap().panes.get_mut(&category) {
            pane.has_model_selector = false;
            pane.model = None;
        }
        self
    }

    /// Snapshot of one tab.
    pub fn pane(&self, category: Category) -> Pane {
        self.state.lock().unwrap().panes[&category].clone()
    }

    pub fn active_tab(&self) -> Category {
        self.state.lock().unwrap().active_tab
    }

    pub fn saved_results_html(&self) -> String {
        self.state.lock().unwrap().saved_results_html.clone()
    }

    pub fn function_log(&self) -> Vec<String> {
        self.state.lock().unwrap().function_log.clone()
    }

    pub fn request_log_html(&self) -> String {
        self.state.lock().unwrap().request_log_html.clone()
    }

    fn with_pane(&self, category: Category, f: impl FnOnce(&mut Pane)) {
        let mut state = self.state.lock().unwrap();
        if let Some(pane) = state.panes.get_mut(&category) {
            f(pane);
        }
    }

    /// Render the whole page as a standalone HTML document.
    pub fn render_document(&self) -> String {
        let state = self.state.lock().unwrap();
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str("<title>Proxy Studio</title>\n<style>");
        out.push_str(STYLE);
        out.push_str("</style>\n</head>\n<body>\n<nav class=\"tabs\">\n");
        for category in Category::ALL {
            let active = if category == state.active_tab { " active" } else { "" };
            let _ = writeln!(
                out,
                "<button class=\"tab-button{active}\" data-tab=\"{category}\">{}</button>",
                category.label()
            );
        }
        out.push_str("</nav>\n<main>\n");
        for (category, pane) in &state.panes {
            render_pane(&mut out, *category, pane, *category == state.active_tab);
            if *category == Category::Tools {
                out.push_str("<div id=\"function-calls-log\" class=\"log\">\n");
                for entry in &state.function_log {
                    out.push_str(entry);
                    out.push('\n');
                }
                out.push_str("</div>\n");
            }
            out.push_str("</section>\n");
        }
        out.push_str("</main>\n<section class=\"saved-results\">\n<h2>Saved Results</h2>\n");
        let _ = writeln!(
            out,
            "<div id=\"saved-results-container\">{}</div>",
            state.saved_results_html
        );
        out.push_str("</section>\n<section class=\"request-log\">\n<h2>Request Log</h2>\n");
        let _ = writeln!(out, "<div id=\"request-log\">{}</div>", state.request_log_html);
        out.push_str("</section>\n</body>\n</html>\n");
        out
    }
}

impl Default for HtmlPage {
    fn default() -> Self {
        Self::new()
    }
}

fn render_pane(out: &mut String, category: Category, pane: &Pane, active: bool) {
    let active = if active { " active" } else { "" };
    let _ = writeln!(out, "<section id=\"{category}-tab\" class=\"tab-pane{active}\">");
    let _ = writeln!(out, "<h2>{}</h2>", category.label());
    if pane.has_model_selector {
        let _ = writeln!(
            out,
            "<p>Model: <span id=\"{category}-model\">{}</span></p>",
            escape(pane.model.as_deref().unwrap_or("-"))
        );
    }
    if !pane.preview_html.is_empty() {
        let _ = writeln!(
            out,
            "<div id=\"{category}-preview\" class=\"preview\">{}</div>",
            pane.preview_html
        );
    }
    let disabled = if pane.is_busy() { " disabled" } else { "" };
    let _ = writeln!(
        out,
        "<button id=\"{category}-submit\"{disabled}>{}</button>",
        pane.button_label(category)
    );
    let hidden = if pane.is_busy() { "" } else { " hidden" };
    let _ = writeln!(out, "<div id=\"{category}-loading\" class=\"loading{hidden}\"></div>");
    let _ = writeln!(
        out,
        "<div id=\"{category}-result\" class=\"result-box\">{}</div>",
        pane.result_html
    );
    let _ = writeln!(
        out,
        "<div class=\"response-time-container\">Processing time: <span class=\"{category}-response-time\">{}</span> ms</div>",
        escape(&pane.timing)
    );
}

impl ResultSurface for HtmlPage {
    fn set_result(&self, category: Category, html: &str) {
        self.with_pane(category, |p| p.result_html = html.to_string());
    }

    fn set_timing(&self, category: Category, text: &str) {
        self.with_pane(category, |p| p.timing = text.to_string());
    }

    fn has_model_selector(&self, category: Category) -> bool {
        self.state
            .lock()
            .unwrap()
            .panes
            .get(&category)
            .is_some_and(|p| p.has_model_selector)
    }

    fn select_model(&self, category: Category, model: &str) {
        self.with_pane(category, |p| {
            if p.has_model_selector {
                p.model = Some(model.to_string());
            }
        });
    }

    fn set_phase(&self, category: Category, phase: Phase) {
        self.with_pane(category, |p| p.phase = phase);
    }

    fn set_preview(&self, category: Category, html: &str) {
        self.with_pane(category, |p| p.preview_html = html.to_string());
    }

    fn activate_tab(&self, category: Category) {
        self.state.lock().unwrap().active_tab = category;
    }

    fn set_saved_results(&self, html: &str) {
        self.state.lock().unwrap().saved_results_html = html.to_string();
    }

    fn append_function_log(&self, html: &str) {
        self.state.lock().unwrap().function_log.push(html.to_string());
    }

    fn clear_function_log(&self) {
        self.state.lock().unwrap().function_log.clear();
    }

    fn set_request_log(&self, html: &str) {
        self.state.lock().unwrap().request_log_html = html.to_string();
    }
}

const STYLE: &str = "\
body{font-family:sans-serif;margin:2em;}\
.tab-pane{display:none;}.tab-pane.active{display:block;}\
.tab-button.active{font-weight:bold;}\
.hidden{display:none;}\
.result-box{border:1px solid #ccc;padding:1em;min-height:2em;}\
.saved-result-card{border:1px solid #ddd;margin:.5em 0;padding:.5em;}\
.request-item{border-bottom:1px solid #eee;padding:.5em 0;}\
.request-status.success{color:green;}.request-status.error{color:#c00;}\
.request-details{white-space:pre-wrap;font-family:monospace;}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_page_is_idle() {
        let page = HtmlPage::new();
        let pane = page.pane(Category::Image);
        assert_eq!(pane.timing, "-");
        assert!(!pane.is_busy());
        assert_eq!(pane.button_label(Category::Image), "Generate Image");
        assert_eq!(page.active_tab(), Category::Text);
    }

    #[test]
    fn in_flight_disables_trigger() {
        let page = HtmlPage::new();
        page.set_phase(
            Category::Vision,
            Phase::InFlight {
                busy_label: "Analyzing...",
            },
        );
        let html = page.render_document();
        assert!(html.contains("<button id=\"vision-submit\" disabled>Analyzing...</button>"));
        assert!(html.contains("<div id=\"vision-loading\" class=\"loading\"></div>"));
        assert!(html.contains("<div id=\"text-loading\" class=\"loading hidden\"></div>"));
    }

    #[test]
    fn pane_without_selector_ignores_model() {
        let page = HtmlPage::new().without_model_selector(Category::Tts);
        assert!(!page.has_model_selector(Category::Tts));
        page.select_model(Category::Tts, "OpenAI/tts-1");
        assert_eq!(page.pane(Category::Tts).model, None);
        assert!(!page.render_document().contains("id=\"tts-model\""));
    }

    #[test]
    fn document_contains_every_area() {
        let page = HtmlPage::new();
        page.set_result(Category::Speech, "hello");
        page.set_timing(Category::Speech, "42");
        page.activate_tab(Category::Speech);
        page.append_function_log("<div class=\"log-entry\">step</div>");
        let html = page.render_document();
        assert!(html.contains("<section id=\"speech-tab\" class=\"tab-pane active\">"));
        assert!(html.contains("<div id=\"speech-result\" class=\"result-box\">hello</div>"));
        assert!(html.contains("<span class=\"speech-response-time\">42</span>"));
        assert!(html.contains("<div class=\"log-entry\">step</div>"));
        assert!(html.contains("id=\"saved-results-container\""));
        assert!(html.contains("id=\"request-log\""));
    }
}
