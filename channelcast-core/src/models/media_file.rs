//! MediaFile model: an on-disk asset scanned under a channel's storage root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ChannelId, MediaFileId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: MediaFileId,
    pub channel_id: ChannelId,
    /// Path relative to `<channel storage_root>/media`.
    pub relative_path: String,
    pub display_name: String,
    pub duration_seconds: i64,
    /// Human program name, synthesized as a text overlay when non-empty.
    pub program_name: Option<String>,
    pub byte_size: i64,
    pub mtime: DateTime<Utc>,
    pub scanned_at: DateTime<Utc>,
}
