//! Media history: every image the admin uploads or upscales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MediaEntryId;

/// How a media asset was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Upload,
    Upscale,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Upscale => "upscale",
        }
    }
}

/// A row of the `media_history` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHistoryEntry {
    pub id: MediaEntryId,
    pub file_name: String,
    pub file_url: String,
    pub media_type: MediaKind,
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for the `media_history` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMediaHistoryEntry {
    pub file_name: String,
    pub file_url: String,
    pub media_type: MediaKind,
    pub admin_email: String,
}
