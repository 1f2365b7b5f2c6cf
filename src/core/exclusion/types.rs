//! Types for the persistent blacklist.

use crate::core::fingerprint::ContentFingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk document version
pub const DOCUMENT_VERSION: u32 = 1;

/// A permanently excluded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionEntry {
    pub fingerprint: ContentFingerprint,
    /// When the ban was recorded (serialized as RFC 3339 / ISO-8601)
    pub excluded_at: DateTime<Utc>,
    /// Source that was being reviewed when the image was rejected
    pub source_id: String,
    /// File name at the time of exclusion, for display only
    pub original_name: String,
}

impl ExclusionEntry {
    pub fn new(
        fingerprint: ContentFingerprint,
        source_id: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint,
            excluded_at: Utc::now(),
            source_id: source_id.into(),
            original_name: original_name.into(),
        }
    }

    /// Case-insensitive match on fingerprint prefix, source id or name
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.fingerprint.to_hex().starts_with(&query)
            || self.source_id.to_lowercase().contains(&query)
            || self.original_name.to_lowercase().contains(&query)
    }

    /// Local date for table display
    pub fn display_date(&self) -> String {
        self.excluded_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// The full backing document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct BlacklistDocument {
    pub version: u32,
    pub entries: Vec<ExclusionEntry>,
}

/// Borrowed view used when writing, so saving never clones the entry list
#[derive(Serialize)]
pub(super) struct BlacklistDocumentRef<'a> {
    pub version: u32,
    pub entries: &'a [ExclusionEntry],
}
