//! ChannelState model: the single authoritative published status row per channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ChannelId, PlaylistId, PlaylistItemId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelState {
    pub channel_id: ChannelId,
    pub current_playlist_id: Option<PlaylistId>,
    pub current_item_id: Option<PlaylistItemId>,
    pub position_seconds: f64,
    pub running: bool,
    /// 0 when not running.
    pub encoder_pid: i32,
    pub updated_at: DateTime<Utc>,
}

impl ChannelState {
    #[must_use]
    pub fn stopped(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            current_playlist_id: None,
            current_item_id: None,
            position_seconds: 0.0,
            running: false,
            encoder_pid: 0,
            updated_at: Utc::now(),
        }
    }
}
