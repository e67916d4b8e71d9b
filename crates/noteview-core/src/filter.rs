//! Filter state: the `(search_text, category)` pair controlling visibility.

use serde::{Deserialize, Serialize};

use crate::defaults::ALL_CATEGORY;

/// Active consumer filter.
///
/// Owned by the consumer side of the sync controller; the change feed never
/// modifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    /// Free text, matched case-insensitively against title and tag string.
    #[serde(default)]
    pub search_text: String,
    /// Category label, or `"All"`.
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    ALL_CATEGORY.to_string()
}

impl Default for ViewFilter {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            category: default_category(),
        }
    }
}

impl ViewFilter {
    pub fn new(search_text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            search_text: search_text.into(),
            category: category.into(),
        }
    }

    pub fn with_search(mut self, search_text: impl Into<String>) -> Self {
        self.search_text = search_text.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// The search text as matched: trimmed and lowercased.
    pub fn normalized_search(&self) -> String {
        self.search_text.trim().to_lowercase()
    }

    /// Whether the category selection is the `All` sentinel.
    pub fn is_all_categories(&self) -> bool {
        self.category == ALL_CATEGORY
    }

    /// Whether this filter lets every entity through.
    pub fn is_empty(&self) -> bool {
        self.normalized_search().is_empty() && self.is_all_categories()
    }
}
