//! Type definitions for Windows Update Agent results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Portable snapshot of one update returned by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePackage {
    /// Update title
    pub title: String,
    /// Update description
    pub description: String,
    /// Support URL
    pub support_url: String,
    /// Knowledge base article ids, without the `KB` prefix
    pub kb_article_ids: Vec<String>,
    /// Stable identity of the update across calls
    pub update_id: String,
    /// Revision of the update
    pub revision_number: i32,
    /// Category names, index-aligned with `category_ids`
    pub categories: Vec<String>,
    /// Category ids, index-aligned with `categories`
    pub category_ids: Vec<String>,
    /// Links to more information
    pub more_info_urls: Vec<String>,
    /// When the update's deployment last changed
    pub last_deployment_change_time: DateTime<Utc>,
}

impl UpdatePackage {
    /// Iterate over `(name, id)` category pairs
    pub fn category_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories
            .iter()
            .zip(&self.category_ids)
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }
}

/// Identity of an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateIdentity {
    /// Stable update id
    pub update_id: String,
    /// Revision number
    pub revision_number: i32,
}

/// Category an update belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Display name
    pub name: String,
    /// Category id
    pub id: String,
}

/// An update that could not be installed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedInstall {
    /// The update that failed
    pub package: UpdatePackage,
    /// Rendered error
    pub error: String,
}

/// Outcome of installing every selected update from one search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallReport {
    /// Updates installed successfully
    pub installed: Vec<UpdatePackage>,
    /// Updates whose download or install failed
    pub failed: Vec<FailedInstall>,
    /// Updates not matched by the selector
    pub skipped: Vec<UpdatePackage>,
}

impl InstallReport {
    /// Whether every selected update was installed
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of updates that were attempted
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.installed.len() + self.failed.len()
    }
}
