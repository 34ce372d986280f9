//! Timestamps shared by every document

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Creation and last-update time of a document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Stamp the update time
    pub fn touch(&mut self) {
        self.updated_at = Some(DateTime::now());
    }

    /// Fill in whichever timestamps are missing
    pub fn stamp(&mut self) {
        let now = DateTime::now();
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
    }

    /// Creation time as a chrono value for JSON responses
    pub fn created(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.created_at.map(|d| d.to_chrono())
    }

    /// Update time as a chrono value for JSON responses
    pub fn updated(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.updated_at.map(|d| d.to_chrono())
    }
}
