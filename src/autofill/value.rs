use serde::{Deserialize, Serialize};

use crate::autofill::structure::RawValue;
use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// A previously captured value for one hint. Enumerated fields are stored as
/// the selected label's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SavedValueRecord", into = "SavedValueRecord")]
pub enum SavedValue {
    Empty,
    Text(String),
    Date(i64),
    Toggle(bool),
}

impl Default for SavedValue {
    fn default() -> Self {
        SavedValue::Empty
    }
}

impl SavedValue {
    /// Builds the saved form of a value observed on screen. List selections
    /// resolve to their label; toggles are not captured.
    pub fn from_observed(value: Option<&RawValue>, options: Option<&[String]>) -> Self {
        match value {
            Some(RawValue::Text(text)) => SavedValue::Text(text.clone()),
            Some(RawValue::Date(millis)) => SavedValue::Date(*millis),
            Some(RawValue::List(index)) => match options.and_then(|labels| labels.get(*index)) {
                Some(label) => SavedValue::Text(label.clone()),
                None => SavedValue::Empty,
            },
            Some(RawValue::Toggle(_)) | None => SavedValue::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SavedValue::Empty)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            SavedValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<i64> {
        match self {
            SavedValue::Date(millis) => Some(*millis),
            _ => None,
        }
    }

    pub fn toggle(&self) -> Option<bool> {
        match self {
            SavedValue::Toggle(on) => Some(*on),
            _ => None,
        }
    }

    pub fn into_parts(self) -> (Option<String>, Option<i64>, Option<bool>) {
        let record = SavedValueRecord::from(self);
        (record.text, record.date, record.toggle)
    }

    /// Rebuilds a value from its nullable columns. When more than one column is
    /// set, text wins over date, and date over toggle.
    pub fn from_parts(text: Option<String>, date: Option<i64>, toggle: Option<bool>) -> Self {
        SavedValueRecord { text, date, toggle }.into()
    }
}

/// Stored shape: three nullable payloads, at most one of them set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SavedValueRecord {
    text: Option<String>,
    date: Option<i64>,
    toggle: Option<bool>,
}

impl From<SavedValueRecord> for SavedValue {
    fn from(record: SavedValueRecord) -> Self {
        let populated = [
            record.text.is_some(),
            record.date.is_some(),
            record.toggle.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if populated > 1 {
            log_warn!("Saved value has {} payloads set; keeping the first", populated);
        }

        if let Some(text) = record.text {
            SavedValue::Text(text)
        } else if let Some(millis) = record.date {
            SavedValue::Date(millis)
        } else if let Some(on) = record.toggle {
            SavedValue::Toggle(on)
        } else {
            SavedValue::Empty
        }
    }
}

impl From<SavedValue> for SavedValueRecord {
    fn from(value: SavedValue) -> Self {
        match value {
            SavedValue::Empty => SavedValueRecord::default(),
            SavedValue::Text(text) => SavedValueRecord {
                text: Some(text),
                ..SavedValueRecord::default()
            },
            SavedValue::Date(millis) => SavedValueRecord {
                date: Some(millis),
                ..SavedValueRecord::default()
            },
            SavedValue::Toggle(on) => SavedValueRecord {
                toggle: Some(on),
                ..SavedValueRecord::default()
            },
        }
    }
}
