use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Feature tab a result belongs to. Each category has its own result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Image,
    Tts,
    Vision,
    Speech,
    Tools,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Text,
        Category::Image,
        Category::Tts,
        Category::Vision,
        Category::Speech,
        Category::Tools,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Image => "image",
            Category::Tts => "tts",
            Category::Vision => "vision",
            Category::Speech => "speech",
            Category::Tools => "tools",
        }
    }

    /// Human-readable tab name.
    pub fn label(self) -> &'static str {
        label_for(self.as_str())
    }

    /// Storage key of the result list.
    pub fn results_key(self) -> String {
        format!("{}Results", self.as_str())
    }

    /// Keys of the single-result layout that predates result lists:
    /// result, response time, model, date.
    pub(crate) fn legacy_keys(self) -> [String; 4] {
        let c = self.as_str();
        [
            format!("{c}Result"),
            format!("{c}ResponseTime"),
            format!("{c}Model"),
            format!("{c}Date"),
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Display name of a raw category id; unknown ids are shown as-is.
pub fn label_for(raw: &str) -> &str {
    match raw {
        "text" => "Text Generation",
        "image" => "Image Generation",
        "tts" => "Speech Synthesis",
        "vision" => "Vision Analysis",
        "speech" => "Speech Transcription",
        "tools" => "Function Calling",
        other => other,
    }
}

/// Elapsed request time, or unknown when the call failed.
///
/// Stored as a JSON number, or the string `"-"` when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingTime {
    Millis(u64),
    #[default]
    Unknown,
}

impl ProcessingTime {
    /// Lenient parse of a stored value ("1500", "1500.4", "-", "").
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(ms) = raw.parse::<u64>() {
            return ProcessingTime::Millis(ms);
        }
        match raw.parse::<f64>() {
            Ok(ms) if ms.is_finite() && ms >= 0.0 => ProcessingTime::Millis(ms.round() as u64),
            _ => ProcessingTime::Unknown,
        }
    }
}

impl fmt::Display for ProcessingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingTime::Millis(ms) => write!(f, "{ms}"),
            ProcessingTime::Unknown => f.write_str("-"),
        }
    }
}

impl Serialize for ProcessingTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProcessingTime::Millis(ms) => serializer.serialize_u64(*ms),
            ProcessingTime::Unknown => serializer.serialize_str("-"),
        }
    }
}

impl<'de> Deserialize<'de> for ProcessingTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => match n.as_u64() {
                Some(ms) => ProcessingTime::Millis(ms),
                None => ProcessingTime::parse(&n.to_string()),
            },
            Some(Value::String(s)) => ProcessingTime::parse(&s),
            _ => ProcessingTime::Unknown,
        })
    }
}

/// One stored outcome of a feature invocation.
///
/// Field names on disk follow the web client's layout (`result`,
/// `processingTime`, `model`, `date`) so existing histories stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "result", default)]
    pub content: String,
    #[serde(rename = "processingTime", default)]
    pub processing_time: ProcessingTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "date", deserialize_with = "lenient_date", default = "epoch")]
    pub timestamp: DateTime<Utc>,
}

impl ResultRecord {
    pub fn new(
        content: impl Into<String>,
        processing_time: ProcessingTime,
        model: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            content: content.into(),
            processing_time,
            model: model.filter(|m| !m.is_empty()).map(str::to_string),
            timestamp,
        }
    }
}

/// A record annotated with its category and current position in the list.
/// The index is only valid until the next mutation of that category.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub category: Category,
    pub index: usize,
    pub record: ResultRecord,
}

/// Parse an ISO-8601 date; anything unreadable sorts as the oldest entry.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(parse_date)
        .unwrap_or_else(epoch))
}
