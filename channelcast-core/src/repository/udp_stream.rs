use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{ChannelId, UdpStream, UdpStreamId},
    Result,
};

#[derive(Clone)]
pub struct UdpStreamRepository {
    pool: PgPool,
}

impl UdpStreamRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, udp_stream_id: &UdpStreamId) -> Result<Option<UdpStream>> {
        let row = sqlx::query("SELECT id, channel_id, url, name, duration_seconds FROM udp_streams WHERE id = $1")
            .bind(udp_stream_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_udp_stream).transpose()
    }

    pub async fn list_by_channel(&self, channel_id: &ChannelId) -> Result<Vec<UdpStream>> {
        let rows = sqlx::query("SELECT id, channel_id, url, name, duration_seconds FROM udp_streams WHERE channel_id = $1 ORDER BY name ASC")
            .bind(channel_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_udp_stream).collect()
    }

    fn row_to_udp_stream(row: PgRow) -> Result<UdpStream> {
        Ok(UdpStream {
            id: UdpStreamId::from_string(row.try_get("id")?),
            channel_id: ChannelId::from_string(row.try_get("channel_id")?),
            url: row.try_get("url")?,
            name: row.try_get("name")?,
            duration_seconds: row.try_get("duration_seconds")?,
        })
    }
}
