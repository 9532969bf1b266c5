use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, Local, Utc};
use regex::Regex;

use crate::error::StorageError;
use crate::storage::{Category, IndexedRecord, ResultStore};
use crate::ui::html::escape;

const PREVIEW_CHARS: usize = 100;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<br\s*/?").unwrap());

/// Summary of one saved result, as listed in the saved-results panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedResultCard {
    pub category: Category,
    pub index: usize,
    pub label: &'static str,
    pub model: String,
    pub processing_time: String,
    pub timestamp: DateTime<Utc>,
    pub preview: String,
}

impl SavedResultCard {
    fn from_indexed(entry: &IndexedRecord) -> Self {
        let record = &entry.record;
        Self {
            category: entry.category,
            index: entry.index,
            label: entry.category.label(),
            model: record.model.clone().unwrap_or_else(|| "unknown".into()),
            processing_time: record.processing_time.to_string(),
            timestamp: record.timestamp,
            preview: preview(&record.content),
        }
    }
}

/// Flatten all categories into one list, newest first. Equal timestamps
/// keep category order, then insertion order.
pub fn collect_cards(grouped: &BTreeMap<Category, Vec<IndexedRecord>>) -> Vec<SavedResultCard> {
    let mut cards: Vec<SavedResultCard> = grouped
        .values()
        .flatten()
        .map(SavedResultCard::from_indexed)
        .collect();
    cards.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    cards
}

/// First 100 characters (plus "..." when cut), with every tag except line
/// breaks stripped.
pub fn preview(content: &str) -> String {
    let truncated: String = if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    };
    TAG.replace_all(&truncated, |caps: &regex::Captures| {
        let tag = &caps[0];
        if LINE_BREAK.is_match(tag) {
            tag.to_string()
        } else {
            String::new()
        }
    })
    .into_owned()
}

/// Local date and time, e.g. "2025-01-01 12:00".
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Markup of the saved-results container.
pub fn render(cards: &[SavedResultCard]) -> String {
    if cards.is_empty() {
        return "<div class=\"no-saved-results\">No saved results</div>".into();
    }

    let mut out = String::new();
    for card in cards {
        let tab = card.category;
        let index = card.index;
        let _ = write!(
            out,
            "<div class=\"saved-result-card\">\
             <h3>{label}</h3>\
             <div class=\"saved-result-info\">\
             <p>Model: <span>{model}</span></p>\
             <p>Processing time: <span>{time} ms</span></p>\
             <p>Saved: <span>{date}</span></p>\
             </div>\
             <div class=\"saved-result-content\">{preview}</div>\
             <div class=\"saved-result-actions\">\
             <button class=\"view-result\" data-tab=\"{tab}\" data-index=\"{index}\">View</button>\
             <button class=\"delete-result\" data-tab=\"{tab}\" data-index=\"{index}\">Delete</button>\
             </div>\
             </div>",
            label = card.label,
            model = escape(&card.model),
            time = escape(&card.processing_time),
            date = format_date(&card.timestamp),
            preview = card.preview,
        );
    }
    out
}

/// Saved-results panel with its per-card actions.
#[derive(Clone)]
pub struct ResultsView {
    store: ResultStore,
}

impl ResultsView {
    pub fn new(store: ResultStore) -> Self {
        Self { store }
    }

    pub fn cards(&self) -> Vec<SavedResultCard> {
        collect_cards(&self.store.get_all())
    }

    pub fn refresh(&self) {
        self.store.refresh_view();
    }

    /// "View" action: switch to the card's tab and show the record there.
    pub fn view(&self, category: Category, index: usize) -> bool {
        self.store.surface().activate_tab(category);
        self.store.display_at(category, index)
    }

    /// "Delete" action: remove the record and redraw the panel.
    pub fn delete(&self, category: Category, index: usize) -> Result<bool, StorageError> {
        let removed = self.store.delete_at(category, index)?;
        self.refresh();
        Ok(removed)
    }
}
