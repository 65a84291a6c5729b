use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub type Id = Uuid;

pub type Timestamp = DateTime<Utc>;

pub fn generate_id() -> Id {
    Uuid::new_v4()
}

/// An author, owner or submitter of a registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub given_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Person {
    pub fn new(given_name: &str, family_name: &str) -> Self {
        Self {
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            email: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }

    /// True when `query` names this person by family name or full name, ignoring case.
    pub fn matches_name(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        self.family_name.to_lowercase() == query || self.full_name().to_lowercase() == query
    }
}

/// Deserializer for patch payloads that must tell "absent" apart from "null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// an absent field stays `None`, an explicit `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Overwrite `target` when the patch supplied a value.
pub fn apply_field<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Overwrite or clear a nullable `target` when the patch mentioned the field.
pub fn apply_nullable<T>(target: &mut Option<T>, value: Option<Option<T>>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Response detail level for serialized records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Standard,
    Full,
}
