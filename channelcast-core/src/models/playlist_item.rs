//! PlaylistItem model.
//!
//! The backing table keeps two nullable foreign-key columns (`media_file_id`,
//! `udp_stream_id`), but application code works with [`PlaylistItemSource`],
//! a tagged enum that makes "exactly one of media/udp" a compile-time
//! invariant instead of a runtime check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MediaFileId, PlaylistId, PlaylistItemId, UdpStreamId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaylistItemSource {
    Media(MediaFileId),
    Udp(UdpStreamId),
}

impl PlaylistItemSource {
    #[must_use]
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Media(_) => "media",
            Self::Udp(_) => "udp",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: PlaylistItemId,
    pub playlist_id: PlaylistId,
    /// Dense, starting at 1, unique within a playlist.
    pub position: i32,
    pub source: PlaylistItemSource,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub locked: bool,
}

/// Row shape matching the two-nullable-column table representation, used
/// only at the repository boundary before being converted to/from
/// [`PlaylistItem`].
pub(crate) struct PlaylistItemRow {
    pub id: String,
    pub playlist_id: String,
    pub position: i32,
    pub item_type: String,
    pub media_file_id: Option<String>,
    pub udp_stream_id: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub locked: bool,
}

impl PlaylistItemRow {
    pub(crate) fn into_item(self) -> crate::Result<PlaylistItem> {
        let source = match self.item_type.as_str() {
            "media" => {
                let id = self.media_file_id.ok_or_else(|| {
                    crate::error::Error::Internal(
                        "playlist_items row of type media has null media_file_id".to_string(),
                    )
                })?;
                PlaylistItemSource::Media(MediaFileId::from_string(id))
            }
            "udp" => {
                let id = self.udp_stream_id.ok_or_else(|| {
                    crate::error::Error::Internal(
                        "playlist_items row of type udp has null udp_stream_id".to_string(),
                    )
                })?;
                PlaylistItemSource::Udp(UdpStreamId::from_string(id))
            }
            other => {
                return Err(crate::error::Error::Internal(format!(
                    "unknown playlist item type '{other}'"
                )));
            }
        };

        Ok(PlaylistItem {
            id: PlaylistItemId::from_string(self.id),
            playlist_id: PlaylistId::from_string(self.playlist_id),
            position: self.position,
            source,
            scheduled_start: self.scheduled_start,
            scheduled_end: self.scheduled_end,
            actual_start: self.actual_start,
            actual_end: self.actual_end,
            locked: self.locked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_matching_media_type_converts() {
        let row = PlaylistItemRow {
            id: "i1".into(),
            playlist_id: "p1".into(),
            position: 1,
            item_type: "media".into(),
            media_file_id: Some("m1".into()),
            udp_stream_id: None,
            scheduled_start: None,
            scheduled_end: None,
            actual_start: None,
            actual_end: None,
            locked: false,
        };
        let item = row.into_item().unwrap();
        assert_eq!(item.source, PlaylistItemSource::Media(MediaFileId::from_string("m1".into())));
    }

    #[test]
    fn row_with_mismatched_nulls_errors() {
        let row = PlaylistItemRow {
            id: "i1".into(),
            playlist_id: "p1".into(),
            position: 1,
            item_type: "media".into(),
            media_file_id: None,
            udp_stream_id: None,
            scheduled_start: None,
            scheduled_end: None,
            actual_start: None,
            actual_end: None,
            locked: false,
        };
        assert!(row.into_item().is_err());
    }
}
