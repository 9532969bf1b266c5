use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};

use crate::ui::html::escape;
use crate::ui::ResultSurface;

/// How a logged call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestStatus {
    Http { code: u16, reason: String },
    Error(String),
}

impl RequestStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestStatus::Http { code, .. } if (200..300).contains(code))
    }
}

/// One call to the proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogEntry {
    pub method: String,
    pub url: String,
    pub request_body: String,
    pub started_at: DateTime<Local>,
    pub duration_ms: u64,
    pub status: RequestStatus,
    pub response_body: String,
}

/// Bounded log of proxy calls; the oldest entry is dropped when full.
pub struct RequestLog {
    capacity: usize,
    entries: Mutex<VecDeque<RequestLogEntry>>,
    surface: Option<Arc<dyn ResultSurface>>,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
            surface: None,
        }
    }

    /// Redraw the page's request-log panel on every change.
    pub fn with_surface(mut self, surface: Arc<dyn ResultSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn push(&self, entry: RequestLogEntry) {
        {
            let mut entries = self.entries.lock().unwrap();
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
        self.redraw();
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        self.redraw();
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<RequestLogEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn redraw(&self) {
        if let Some(surface) = &self.surface {
            surface.set_request_log(&self.render_html());
        }
    }

    /// Newest first.
    pub fn render_html(&self) -> String {
        let entries = self.entries.lock().unwrap();
        if entries.is_empty() {
            return "<div class=\"no-requests\">No requests logged</div>".into();
        }
        let mut out = String::new();
        for entry in entries.iter().rev() {
            render_entry(&mut out, entry);
        }
        out
    }

    /// Plain-text form for terminals, newest first.
    pub fn render_text(&self) -> String {
        let entries = self.entries.lock().unwrap();
        let mut out = String::new();
        for entry in entries.iter().rev() {
            let _ = writeln!(
                out,
                "{} {} {} -> {} ({}ms)",
                entry.started_at.format("%H:%M:%S%.3f"),
                entry.method,
                path_of(&entry.url),
                status_text(&entry.status),
                entry.duration_ms
            );
        }
        out
    }
}

fn path_of(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(q) => format!("{}?{q}", parsed.path()),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

fn status_text(status: &RequestStatus) -> String {
    match status {
        RequestStatus::Http { code, reason } => format!("{code} {reason}"),
        RequestStatus::Error(message) => format!("Error {message}"),
    }
}

/// Pretty-print JSON bodies, pass anything else through.
fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| body.to_string())
}

fn render_entry(out: &mut String, entry: &RequestLogEntry) {
    let mut details = String::new();
    if !entry.request_body.is_empty() {
        let _ = write!(details, "Request body:\n{}\n\n", pretty_body(&entry.request_body));
    }
    if !entry.response_body.is_empty() {
        let _ = write!(details, "Response body:\n{}", pretty_body(&entry.response_body));
    }
    let status_class = if entry.status.is_success() {
        "success"
    } else {
        "error"
    };

    let _ = write!(
        out,
        "<div class=\"request-item\">\
         <div class=\"request-time\">{time}</div>\
         <div><span class=\"request-method {method_class}\">{method}</span> \
         <span class=\"request-path\">{path}</span></div>\
         <div class=\"request-status {status_class}\">Status: {status} ({duration}ms)</div>",
        time = entry.started_at.format("%H:%M:%S%.3f"),
        method_class = entry.method.to_lowercase(),
        method = escape(&entry.method),
        path = escape(&path_of(&entry.url)),
        status = escape(&status_text(&entry.status)),
        duration = entry.duration_ms,
    );
    if !details.is_empty() {
        let _ = write!(out, "<div class=\"request-details\">{}</div>", escape(&details));
    }
    out.push_str("</div>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Category;
    use crate::ui::HtmlPage;

    fn entry(path: &str, code: u16) -> RequestLogEntry {
        RequestLogEntry {
            method: "POST".into(),
            url: format!("http://localhost:4000/v1{path}"),
            request_body: r#"{"model":"m"}"#.into(),
            started_at: Local::now(),
            duration_ms: 12,
            status: RequestStatus::Http {
                code,
                reason: "OK".into(),
            },
            response_body: "plain text".into(),
        }
    }

    #[test]
    fn drops_oldest_when_full() {
        let log = RequestLog::new(2);
        log.push(entry("/a", 200));
        log.push(entry("/b", 200));
        log.push(entry("/c", 200));
        let urls: Vec<_> = log.entries().into_iter().map(|e| path_of(&e.url)).collect();
        assert_eq!(urls, vec!["/v1/b", "/v1/c"]);
    }

    #[test]
    fn renders_newest_first_with_pretty_json() {
        let log = RequestLog::new(10);
        log.push(entry("/first", 200));
        log.push(entry("/second?x=1", 500));
        let html = log.render_html();

        let second = html.find("/v1/second?x=1").unwrap();
        let first = html.find("/v1/first").unwrap();
        assert!(second < first);
        assert!(html.contains("request-method post"));
        assert!(html.contains("request-status error"));
        assert!(html.contains("request-status success"));
        assert!(html.contains("{\n  &quot;model&quot;: &quot;m&quot;\n}"));
        assert!(html.contains("Response body:\nplain text"));
    }

    #[test]
    fn clear_redraws_placeholder() {
        let page = Arc::new(HtmlPage::new());
        let log = RequestLog::new(5).with_surface(page.clone());
        log.push(entry("/models", 200));
        assert!(page.request_log_html().contains("request-item"));

        log.clear();
        assert!(log.is_empty());
        assert_eq!(
            page.request_log_html(),
            "<div class=\"no-requests\">No requests logged</div>"
        );
        // unrelated panes untouched
        assert_eq!(page.pane(Category::Text).timing, "-");
    }

    #[test]
    fn network_errors_are_not_success() {
        assert!(!RequestStatus::Error("refused".into()).is_success());
        assert!(RequestStatus::Http { code: 204, reason: String::new() }.is_success());
    }
}
