//! Overlay model: per-channel compositing directives consumed by the Encoder
//! Driver's filter graph builder.

use serde::{Deserialize, Serialize};

use super::id::{ChannelId, OverlayId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayType {
    Text,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overlay {
    pub id: OverlayId,
    pub channel_id: ChannelId,
    pub overlay_type: OverlayType,
    /// Image path, relative to the channel's storage root, for `Image` overlays.
    pub image_path: Option<String>,
    /// Literal text for `Text` overlays.
    pub text: Option<String>,
    pub x_expr: String,
    pub y_expr: String,
    pub font_size: Option<u32>,
    pub font_color: Option<String>,
    pub enabled: bool,
}
