//! UDPStream model: a pass-through live source referenced by playlist items.

use serde::{Deserialize, Serialize};

use super::id::{ChannelId, UdpStreamId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpStream {
    pub id: UdpStreamId,
    pub channel_id: ChannelId,
    pub url: String,
    pub name: String,
    /// `None` means infinite.
    pub duration_seconds: Option<i64>,
}
