//! Channel model: immutable-per-run configuration for one linear TV channel.

use serde::{Deserialize, Serialize};

use super::id::ChannelId;

/// How a channel picks its active playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistSelectionMode {
    /// Resolve today's (or a fallback day's) scheduled playlist via the anchor time.
    DailyPlaylist,
    /// Always use the channel's single null-date "default" playlist.
    Default,
}

impl PlaylistSelectionMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyPlaylist => "daily_playlist",
            Self::Default => "default",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "daily_playlist" => Some(Self::DailyPlaylist),
            "default" => Some(Self::Default),
            _ => None,
        }
    }
}

/// Codec, bitrate, and MPEG-TS metadata the Encoder Driver uses to build the
/// `ffmpeg` argument vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderParams {
    pub video_codec: String,
    pub video_bitrate_kbps: u32,
    pub video_min_bitrate_kbps: u32,
    pub video_max_bitrate_kbps: u32,
    pub buffer_size_kbps: u32,
    pub width: u32,
    pub height: u32,
    pub audio_codec: String,
    pub audio_bitrate_kbps: u32,
    pub packet_size: u32,
    pub transport_stream_id: u16,
    pub network_id: u16,
    pub service_id: u16,
    pub service_provider: String,
    pub service_name: String,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            video_codec: "h264_nvenc".to_string(),
            video_bitrate_kbps: 6000,
            video_min_bitrate_kbps: 4000,
            video_max_bitrate_kbps: 8000,
            buffer_size_kbps: 12000,
            width: 1920,
            height: 1080,
            audio_codec: "aac".to_string(),
            audio_bitrate_kbps: 192,
            packet_size: 1316,
            transport_stream_id: 1,
            network_id: 1,
            service_id: 1,
            service_provider: "ChannelCast".to_string(),
            service_name: "Channel".to_string(),
        }
    }
}

/// A single independent linear TV channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    /// Absolute path on disk under which media files and the overlay font
    /// directory (`<storage_root>/data`) live.
    pub storage_root: String,
    pub output_host: String,
    pub output_port: u16,
    pub selection_mode: PlaylistSelectionMode,
    /// Local-time hour (0-23) of the daily anchor.
    pub anchor_hour: u8,
    /// Local-time minute (0-59) of the daily anchor.
    pub anchor_minute: u8,
    pub enabled: bool,
    pub use_previous_day_fallback: bool,
    pub encoder: EncoderParams,
}

impl Channel {
    #[must_use]
    pub fn output_url(&self) -> String {
        format!("udp://{}:{}", self.output_host, self.output_port)
    }

    #[must_use]
    pub fn media_path(&self, relative_path: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.storage_root)
            .join("media")
            .join(relative_path)
    }

    #[must_use]
    pub fn font_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.storage_root).join("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_mode_round_trips_through_str() {
        for mode in [PlaylistSelectionMode::DailyPlaylist, PlaylistSelectionMode::Default] {
            let s = mode.as_str();
            assert_eq!(PlaylistSelectionMode::from_str_opt(s), Some(mode));
        }
        assert_eq!(PlaylistSelectionMode::from_str_opt("bogus"), None);
    }

    #[test]
    fn output_url_formats_as_udp() {
        let channel = Channel {
            id: ChannelId::from_string("c1".into()),
            name: "Test".into(),
            storage_root: "/srv/test".into(),
            output_host: "239.0.0.1".into(),
            output_port: 5000,
            selection_mode: PlaylistSelectionMode::DailyPlaylist,
            anchor_hour: 6,
            anchor_minute: 0,
            enabled: true,
            use_previous_day_fallback: true,
            encoder: EncoderParams::default(),
        };
        assert_eq!(channel.output_url(), "udp://239.0.0.1:5000");
        assert_eq!(channel.media_path("show/ep1.mp4"), std::path::PathBuf::from("/srv/test/media/show/ep1.mp4"));
    }
}
