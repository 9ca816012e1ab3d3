pub mod channel;
pub mod channel_state;
pub mod id;
pub mod media_file;
pub mod overlay;
pub mod playlist;
pub mod playlist_item;
pub mod udp_stream;

pub use channel::{Channel, EncoderParams, PlaylistSelectionMode};
pub use channel_state::ChannelState;
pub use id::{generate_id, ChannelId, MediaFileId, OverlayId, PlaylistId, PlaylistItemId, UdpStreamId};
pub use media_file::MediaFile;
pub use overlay::{Overlay, OverlayType};
pub use playlist::{Playlist, PlaylistStatus};
pub use playlist_item::{PlaylistItem, PlaylistItemSource};
pub use udp_stream::UdpStream;
