//! Playlist model: one ordered day of programming for a channel.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ChannelId, PlaylistId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistStatus {
    Scheduled,
    Active,
    Completed,
}

impl PlaylistStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A playlist belongs to one channel and optionally carries a calendar date.
/// A `None` date marks the channel's "infinite/default" playlist, used by
/// [`crate::models::channel::PlaylistSelectionMode::Default`] and as the
/// resolver's last-resort fallback target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub channel_id: ChannelId,
    pub playlist_date: Option<NaiveDate>,
    pub status: PlaylistStatus,
    pub total_duration_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.playlist_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [PlaylistStatus::Scheduled, PlaylistStatus::Active, PlaylistStatus::Completed] {
            assert_eq!(PlaylistStatus::from_str_opt(status.as_str()), Some(status));
        }
    }
}
