//! Query result types serialized to the host.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Category reported for every window. Classification is left to the host.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Focused application snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub app_name: String,
    pub window_title: String,
    pub category: String,
    /// Empty, or a `data:image/png;base64,` URI.
    pub icon: String,
}

impl WindowInfo {
    pub fn new(app_name: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            window_title: window_title.into(),
            category: UNKNOWN_CATEGORY.to_string(),
            icon: String::new(),
        }
    }

    /// Snapshot used when the OS gives no usable answer.
    pub fn empty() -> Self {
        Self::new("", "")
    }
}

/// One running application, keyed by name in [`ApplicationList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    pub title: String,
    /// Empty, or a `data:image/png;base64,` URI.
    pub icon: String,
}

/// Running applications keyed by app name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationList(IndexMap<String, AppEntry>);

impl ApplicationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` unless `app_name` is already listed.
    ///
    /// Returns false if the name was already present; the existing entry is kept.
    pub fn insert_first_seen(&mut self, app_name: impl Into<String>, entry: AppEntry) -> bool {
        match self.0.entry(app_name.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn get(&self, app_name: &str) -> Option<&AppEntry> {
        self.0.get(app_name)
    }

    pub fn contains(&self, app_name: &str) -> bool {
        self.0.contains_key(app_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Error payload printed as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

impl ErrorResult {
    pub fn new(message: impl Display) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Final output of a top-level query: either the value or an [`ErrorResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResult<T> {
    Ok(T),
    Error(ErrorResult),
}

impl<T> QueryResult<T> {
    pub fn error(message: impl Display) -> Self {
        Self::Error(ErrorResult::new(message))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Error(_) => None,
        }
    }
}

impl<T, E: Display> From<Result<T, E>> for QueryResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::error(e),
        }
    }
}
