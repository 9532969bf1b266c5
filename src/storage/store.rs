use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::kv::KeyValueStore;
use super::record::{parse_date, Category, IndexedRecord, ProcessingTime, ResultRecord};
use crate::error::StorageError;
use crate::ui::results_view;
use crate::ui::ResultSurface;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    All,
    Category(Category),
}

impl FromStr for ResetTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(ResetTarget::All)
        } else {
            s.parse().map(ResetTarget::Category)
        }
    }
}

impl fmt::Display for ResetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetTarget::All => f.write_str("all"),
            ResetTarget::Category(c) => write!(f, "{c}"),
        }
    }
}

/// Per-category result history, persisted in a key-value store and mirrored
/// into the page.
///
/// Lists are rewritten whole on every change (read-modify-write), so two
/// writers racing on one category can lose an update.
#[derive(Clone)]
pub struct ResultStore {
    kv: Arc<dyn KeyValueStore>,
    surface: Arc<dyn ResultSurface>,
    clock: Clock,
}

impl ResultStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, surface: Arc<dyn ResultSurface>) -> Self {
        Self {
            kv,
            surface,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the source of save timestamps.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn surface(&self) -> &Arc<dyn ResultSurface> {
        &self.surface
    }

    /// Current list of a category; unreadable data reads as empty.
    pub fn list(&self, category: Category) -> Vec<ResultRecord> {
        let key = category.results_key();
        let raw = match self.kv.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read {key}: {e}");
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed {key}: {e}");
            Vec::new()
        })
    }

    /// An empty list is stored as an absent key.
    fn write_list(&self, category: Category, records: &[ResultRecord]) -> Result<(), StorageError> {
        let key = category.results_key();
        if records.is_empty() {
            return self.kv.remove_item(&key);
        }
        let data = serde_json::to_string(records)?;
        self.kv.set_item(&key, &data)
    }

    /// Append a record stamped with the current time, then redraw the
    /// saved-results panel.
    pub fn save(
        &self,
        category: Category,
        content: impl Into<String>,
        processing_time: ProcessingTime,
        model: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut records = self.list(category);
        records.push(ResultRecord::new(
            content,
            processing_time,
            model,
            (self.clock)(),
        ));
        self.write_list(category, &records)?;
        log::info!("Saved {category} result #{}", records.len() - 1);
        self.refresh_view();
        Ok(())
    }

    /// Every non-empty category with its records indexed by position.
    pub fn get_all(&self) -> BTreeMap<Category, Vec<IndexedRecord>> {
        Category::ALL
            .into_iter()
            .filter_map(|category| {
                let records = self.list(category);
                if records.is_empty() {
                    return None;
                }
                let indexed = records
                    .into_iter()
                    .enumerate()
                    .map(|(index, record)| IndexedRecord {
                        category,
                        index,
                        record,
                    })
                    .collect();
                Some((category, indexed))
            })
            .collect()
    }

    /// Remove exactly the record at `index`. Out of range is a no-op and
    /// returns `false`.
    pub fn delete_at(&self, category: Category, index: usize) -> Result<bool, StorageError> {
        let mut records = self.list(category);
        if index >= records.len() {
            return Ok(false);
        }
        records.remove(index);
        self.write_list(category, &records)?;
        log::info!("Deleted {category} result #{index}");
        Ok(true)
    }

    /// Show the record at `index` in its category's result area, timing
    /// indicator and model selector. Out of range is a no-op and returns
    /// `false`.
    pub fn display_at(&self, category: Category, index: usize) -> bool {
        let records = self.list(category);
        match records.get(index) {
            Some(record) => {
                self.show(category, record);
                true
            }
            None => false,
        }
    }

    fn show(&self, category: Category, record: &ResultRecord) {
        self.surface.set_result(category, &record.content);
        self.surface
            .set_timing(category, &record.processing_time.to_string());
        if let Some(model) = &record.model {
            if self.surface.has_model_selector(category) {
                self.surface.select_model(category, model);
            }
        }
    }

    /// Convert the single-result layout into one-element lists, once.
    ///
    /// Only categories without a list are converted. The list is written
    /// before the old keys are removed, so an interrupted run never loses
    /// the result and never converts it twice. Returns how many categories
    /// were converted.
    pub fn migrate_legacy(&self) -> Result<usize, StorageError> {
        let mut migrated = 0;
        for category in Category::ALL {
            if self.kv.get_item(&category.results_key())?.is_some() {
                continue;
            }
            let keys = category.legacy_keys();
            let Some(result) = self.kv.get_item(&keys[0])?.filter(|r| !r.is_empty()) else {
                continue;
            };
            let time = self.kv.get_item(&keys[1])?;
            let model = self.kv.get_item(&keys[2])?;
            let date = self.kv.get_item(&keys[3])?;

            let record = ResultRecord::new(
                result,
                time.as_deref()
                    .map(ProcessingTime::parse)
                    .unwrap_or_default(),
                model.as_deref(),
                date.as_deref()
                    .and_then(parse_date)
                    .unwrap_or_else(|| (self.clock)()),
            );
            self.write_list(category, &[record])?;
            for key in &keys {
                self.kv.remove_item(key)?;
            }
            log::info!("Migrated legacy {category} result");
            migrated += 1;
        }
        Ok(migrated)
    }

    /// Show the most recent record of every non-empty category.
    pub fn load_latest_into_view(&self) {
        for category in Category::ALL {
            if let Some(latest) = self.list(category).last() {
                self.show(category, latest);
            }
        }
    }

    /// Startup: migrate, show the latest results, draw the saved-results panel.
    pub fn restore(&self) -> Result<(), StorageError> {
        let migrated = self.migrate_legacy();
        self.load_latest_into_view();
        self.refresh_view();
        migrated.map(|_| ())
    }

    /// Drop stored results and blank the matching result areas.
    pub fn reset(&self, target: ResetTarget) -> Result<(), StorageError> {
        let cleared: Vec<Category> = match target {
            ResetTarget::All => {
                self.kv.clear()?;
                Category::ALL.to_vec()
            }
            ResetTarget::Category(category) => {
                self.kv.remove_item(&category.results_key())?;
                vec![category]
            }
        };
        for category in cleared {
            self.surface.set_result(category, "");
            self.surface.set_timing(category, "-");
        }
        log::info!("Reset results: {target}");
        self.refresh_view();
        Ok(())
    }

    /// Redraw the saved-results panel from stored state.
    pub fn refresh_view(&self) {
        let cards = results_view::collect_cards(&self.get_all());
        self.surface.set_saved_results(&results_view::render(&cards));
    }
}
