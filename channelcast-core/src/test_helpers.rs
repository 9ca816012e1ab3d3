//! Fixture builders for unit tests, gated behind `#[cfg(test)]` and used
//! across this crate's `mod tests` blocks.

use chrono::Utc;

use crate::models::{
    Channel, ChannelId, EncoderParams, MediaFile, MediaFileId, Overlay, OverlayId, OverlayType, Playlist, PlaylistId,
    PlaylistItem, PlaylistItemId, PlaylistItemSource, PlaylistSelectionMode, PlaylistStatus, UdpStream, UdpStreamId,
};

/// Builds a `Channel` with sane defaults; override fields on the returned
/// value for test-specific variation.
pub struct ChannelFixture;

impl ChannelFixture {
    #[must_use]
    pub fn build() -> Channel {
        Channel {
            id: ChannelId::new(),
            name: "Test Channel".to_string(),
            storage_root: "/srv/channelcast/test".to_string(),
            output_host: "239.1.1.1".to_string(),
            output_port: 5000,
            selection_mode: PlaylistSelectionMode::DailyPlaylist,
            anchor_hour: 6,
            anchor_minute: 0,
            enabled: true,
            use_previous_day_fallback: true,
            encoder: EncoderParams::default(),
        }
    }
}

/// Builds a `Playlist` belonging to `channel_id`, with no date (the
/// "default" playlist) unless overridden.
pub struct PlaylistFixture;

impl PlaylistFixture {
    #[must_use]
    pub fn build(channel_id: ChannelId) -> Playlist {
        let now = Utc::now();
        Playlist {
            id: PlaylistId::new(),
            channel_id,
            playlist_date: None,
            status: PlaylistStatus::Scheduled,
            total_duration_seconds: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Builds `PlaylistItem`s with media or UDP sources, at dense 1-based
/// positions.
pub struct PlaylistItemFixture;

impl PlaylistItemFixture {
    #[must_use]
    pub fn media(playlist_id: PlaylistId, position: i32, media_file_id: MediaFileId) -> PlaylistItem {
        PlaylistItem {
            id: PlaylistItemId::new(),
            playlist_id,
            position,
            source: PlaylistItemSource::Media(media_file_id),
            scheduled_start: None,
            scheduled_end: None,
            actual_start: None,
            actual_end: None,
            locked: false,
        }
    }

    #[must_use]
    pub fn udp(playlist_id: PlaylistId, position: i32, udp_stream_id: UdpStreamId) -> PlaylistItem {
        PlaylistItem {
            id: PlaylistItemId::new(),
            playlist_id,
            position,
            source: PlaylistItemSource::Udp(udp_stream_id),
            scheduled_start: None,
            scheduled_end: None,
            actual_start: None,
            actual_end: None,
            locked: false,
        }
    }
}

pub struct MediaFileFixture;

impl MediaFileFixture {
    #[must_use]
    pub fn build(channel_id: ChannelId, relative_path: &str, duration_seconds: i64) -> MediaFile {
        let now = Utc::now();
        MediaFile {
            id: MediaFileId::new(),
            channel_id,
            relative_path: relative_path.to_string(),
            display_name: relative_path.to_string(),
            duration_seconds,
            program_name: None,
            byte_size: 0,
            mtime: now,
            scanned_at: now,
        }
    }
}

pub struct UdpStreamFixture;

impl UdpStreamFixture {
    #[must_use]
    pub fn build(channel_id: ChannelId, url: &str, duration_seconds: Option<i64>) -> UdpStream {
        UdpStream {
            id: UdpStreamId::new(),
            channel_id,
            url: url.to_string(),
            name: "Test Stream".to_string(),
            duration_seconds,
        }
    }
}

pub struct OverlayFixture;

impl OverlayFixture {
    #[must_use]
    pub fn text(channel_id: ChannelId, text: &str) -> Overlay {
        Overlay {
            id: OverlayId::new(),
            channel_id,
            overlay_type: OverlayType::Text,
            image_path: None,
            text: Some(text.to_string()),
            x_expr: "10".to_string(),
            y_expr: "10".to_string(),
            font_size: Some(24),
            font_color: Some("white".to_string()),
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_fixture_is_internally_consistent() {
        let channel = ChannelFixture::build();
        assert!(channel.enabled);
        assert_eq!(channel.anchor_hour, 6);
    }

    #[test]
    fn playlist_item_fixtures_carry_the_right_source() {
        let playlist_id = PlaylistId::new();
        let media_item = PlaylistItemFixture::media(playlist_id.clone(), 1, MediaFileId::new());
        assert_eq!(media_item.source.type_str(), "media");

        let udp_item = PlaylistItemFixture::udp(playlist_id, 2, UdpStreamId::new());
        assert_eq!(udp_item.source.type_str(), "udp");
    }
}
