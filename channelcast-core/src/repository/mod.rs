pub mod channel;
pub mod channel_state;
pub mod media_file;
pub mod overlay;
pub mod playlist;
pub mod playlist_item;
pub mod udp_stream;

pub use channel::ChannelRepository;
pub use channel_state::ChannelStateRepository;
pub use media_file::MediaFileRepository;
pub use overlay::OverlayRepository;
pub use playlist::PlaylistRepository;
pub use playlist_item::PlaylistItemRepository;
pub use udp_stream::UdpStreamRepository;
