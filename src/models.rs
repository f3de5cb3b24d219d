use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// Display format used by the history list, e.g. "Oct 01, 2024 14:00:00"
const CREATED_DISPLAY_FORMAT: &str = "%b %d, %Y %H:%M:%S";

// A single generated string persisted in the local database
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GeneratedString {
    // Assigned by SQLite on insert, None until then
    #[serde(default)]
    pub id: Option<i64>,
    pub value: String,
    pub length: i64, // Length actually produced, may differ from the requested maximum
    pub created: String, // ISO-8601, produced by the provider (not the local clock)
}

impl GeneratedString {
    /// Builds a record that has not been inserted yet.
    pub fn unsaved(value: String, length: i64, created: String) -> Self {
        Self {
            id: None,
            value,
            length,
            created,
        }
    }

    pub fn with_id(self, id: i64) -> Self {
        Self { id: Some(id), ..self }
    }

    /// Renders `created` in the local time zone for the history list.
    /// Falls back to the raw string if the provider sent something that is not RFC 3339.
    pub fn formatted_created(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.created) {
            Ok(ts) => ts
                .with_timezone(&Local)
                .format(CREATED_DISPLAY_FORMAT)
                .to_string(),
            Err(e) => {
                log::debug!("Could not parse created timestamp '{}': {}", self.created, e);
                self.created.clone()
            }
        }
    }
}

// Row sent to the frontend: the record plus its display timestamp
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StringListItem {
    #[serde(flatten)]
    pub record: GeneratedString,
    pub formatted_created: String,
}

impl From<&GeneratedString> for StringListItem {
    fn from(record: &GeneratedString) -> Self {
        Self {
            formatted_created: record.formatted_created(),
            record: record.clone(),
        }
    }
}

// --- Provider payload ---

// Envelope of the JSON held in the provider's `data` column
#[derive(Deserialize, Debug)]
pub struct RandomTextResponse {
    #[serde(rename = "randomText")]
    pub random_text: RandomTextData,
}

#[derive(Deserialize, Debug)]
pub struct RandomTextData {
    pub value: String,
    pub length: i64,
    pub created: String,
}

impl From<RandomTextData> for GeneratedString {
    fn from(data: RandomTextData) -> Self {
        GeneratedString::unsaved(data.value, data.length, data.created)
    }
}

// Lifecycle of the one tracked generation request
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum GenerationState {
    #[default]
    Idle,
    Loading,
    Success(GeneratedString),
    Error(String),
}

impl GenerationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationState::Success(_) | GenerationState::Error(_))
    }
}
