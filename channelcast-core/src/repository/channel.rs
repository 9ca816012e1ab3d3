use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Channel, ChannelId, EncoderParams, PlaylistSelectionMode},
    Error, Result,
};

/// Channel repository for database operations.
#[derive(Clone)]
pub struct ChannelRepository {
    pool: PgPool,
}

impl ChannelRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, channel: &Channel) -> Result<Channel> {
        let encoder = serde_json::to_value(&channel.encoder)?;
        let row = sqlx::query(
            "INSERT INTO channels (id, name, storage_root, output_host, output_port, selection_mode,
                anchor_hour, anchor_minute, enabled, use_previous_day_fallback, encoder)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING id, name, storage_root, output_host, output_port, selection_mode,
                anchor_hour, anchor_minute, enabled, use_previous_day_fallback, encoder",
        )
        .bind(channel.id.as_str())
        .bind(&channel.name)
        .bind(&channel.storage_root)
        .bind(&channel.output_host)
        .bind(i32::from(channel.output_port))
        .bind(channel.selection_mode.as_str())
        .bind(i16::from(channel.anchor_hour))
        .bind(i16::from(channel.anchor_minute))
        .bind(channel.enabled)
        .bind(channel.use_previous_day_fallback)
        .bind(&encoder)
        .fetch_one(&self.pool)
        .await?;

        self.row_to_channel(row)
    }

    pub async fn get_by_id(&self, channel_id: &ChannelId) -> Result<Option<Channel>> {
        let row = sqlx::query(
            "SELECT id, name, storage_root, output_host, output_port, selection_mode,
                anchor_hour, anchor_minute, enabled, use_previous_day_fallback, encoder
             FROM channels WHERE id = $1",
        )
        .bind(channel_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.row_to_channel(r)).transpose()
    }

    /// All channels with `enabled = true`, in no particular order. Used by the
    /// Supervisor at startup to decide which engines to start.
    pub async fn list_enabled(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query(
            "SELECT id, name, storage_root, output_host, output_port, selection_mode,
                anchor_hour, anchor_minute, enabled, use_previous_day_fallback, encoder
             FROM channels WHERE enabled = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| self.row_to_channel(r)).collect()
    }

    /// Every channel regardless of `enabled`, in no particular order. Used by
    /// the `GET /channels` HTTP endpoint so disabled channels stay visible to
    /// operators.
    pub async fn list_all(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query(
            "SELECT id, name, storage_root, output_host, output_port, selection_mode,
                anchor_hour, anchor_minute, enabled, use_previous_day_fallback, encoder
             FROM channels",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| self.row_to_channel(r)).collect()
    }

    pub async fn update(&self, channel: &Channel) -> Result<Channel> {
        let encoder = serde_json::to_value(&channel.encoder)?;
        let row = sqlx::query(
            "UPDATE channels
             SET name = $2, storage_root = $3, output_host = $4, output_port = $5,
                 selection_mode = $6, anchor_hour = $7, anchor_minute = $8, enabled = $9,
                 use_previous_day_fallback = $10, encoder = $11
             WHERE id = $1
             RETURNING id, name, storage_root, output_host, output_port, selection_mode,
                anchor_hour, anchor_minute, enabled, use_previous_day_fallback, encoder",
        )
        .bind(channel.id.as_str())
        .bind(&channel.name)
        .bind(&channel.storage_root)
        .bind(&channel.output_host)
        .bind(i32::from(channel.output_port))
        .bind(channel.selection_mode.as_str())
        .bind(i16::from(channel.anchor_hour))
        .bind(i16::from(channel.anchor_minute))
        .bind(channel.enabled)
        .bind(channel.use_previous_day_fallback)
        .bind(&encoder)
        .fetch_one(&self.pool)
        .await?;

        self.row_to_channel(row)
    }

    fn row_to_channel(&self, row: PgRow) -> Result<Channel> {
        let selection_mode_str: String = row.try_get("selection_mode")?;
        let selection_mode = PlaylistSelectionMode::from_str_opt(&selection_mode_str)
            .ok_or_else(|| Error::Internal(format!("unknown selection_mode '{selection_mode_str}'")))?;
        let anchor_hour: i16 = row.try_get("anchor_hour")?;
        let anchor_minute: i16 = row.try_get("anchor_minute")?;
        let output_port: i32 = row.try_get("output_port")?;
        let encoder_json: serde_json::Value = row.try_get("encoder")?;
        let encoder: EncoderParams = serde_json::from_value(encoder_json)?;

        Ok(Channel {
            id: ChannelId::from_string(row.try_get("id")?),
            name: row.try_get("name")?,
            storage_root: row.try_get("storage_root")?,
            output_host: row.try_get("output_host")?,
            output_port: u16::try_from(output_port)
                .map_err(|_| Error::Internal("output_port out of range".to_string()))?,
            selection_mode,
            anchor_hour: u8::try_from(anchor_hour)
                .map_err(|_| Error::Internal("anchor_hour out of range".to_string()))?,
            anchor_minute: u8::try_from(anchor_minute)
                .map_err(|_| Error::Internal("anchor_minute out of range".to_string()))?,
            enabled: row.try_get("enabled")?,
            use_previous_day_fallback: row.try_get("use_previous_day_fallback")?,
            encoder,
        })
    }
}
