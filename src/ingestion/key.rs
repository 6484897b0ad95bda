//! Identifier for persisted ingestion chunk sets.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key under which one file's chunk set is persisted in the state store.
///
/// Derived once per ingestion job from the sanitized file stem and the
/// ingestion timestamp, then passed through the pipeline immutably:
/// `chunks_{sanitized_stem}_{unix_seconds}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    /// Derives the key for `file_name` ingested at `at`.
    pub fn derive(file_name: &str, at: DateTime<Utc>) -> Self {
        StateKey(format!(
            "chunks_{}_{}",
            sanitize_name(file_stem(file_name)),
            at.timestamp()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StateKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replaces every non-alphanumeric character with an underscore.
pub fn sanitize_name(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// File name with its final extension stripped.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}
