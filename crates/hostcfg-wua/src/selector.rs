//! Selection of which searched updates to install

use serde::{Deserialize, Serialize};

use crate::types::UpdatePackage;

/// Filter applied to search results before installing
///
/// An empty selector matches every update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSelector {
    /// Only install these update ids
    #[serde(default)]
    pub update_ids: Vec<String>,
    /// Never install updates referencing any of these KB articles
    #[serde(default)]
    pub exclude_kbs: Vec<String>,
    /// Only install updates in one of these categories (name or id)
    #[serde(default)]
    pub categories: Vec<String>,
}

impl UpdateSelector {
    /// Create a selector matching every update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given update ids
    #[must_use]
    pub fn with_update_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.update_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Exclude updates referencing the given KB articles (`KB5005565` or `5005565`)
    #[must_use]
    pub fn with_excluded_kbs(mut self, kbs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude_kbs.extend(kbs.into_iter().map(Into::into));
        self
    }

    /// Restrict to the given categories
    #[must_use]
    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    /// Whether the update should be installed
    #[must_use]
    pub fn matches(&self, package: &UpdatePackage) -> bool {
        if !self.update_ids.is_empty()
            && !self
                .update_ids
                .iter()
                .any(|id| id.eq_ignore_ascii_case(&package.update_id))
        {
            return false;
        }

        let excluded = package.kb_article_ids.iter().any(|kb| {
            self.exclude_kbs
                .iter()
                .any(|ex| normalize_kb(ex).eq_ignore_ascii_case(normalize_kb(kb)))
        });
        if excluded {
            return false;
        }

        self.categories.is_empty()
            || package.category_pairs().any(|(name, id)| {
                self.categories
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(name) || c.eq_ignore_ascii_case(id))
            })
    }
}

/// Strip an optional `KB` prefix
fn normalize_kb(kb: &str) -> &str {
    let kb = kb.trim();
    match kb.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("kb") => &kb[2..],
        _ => kb,
    }
}
