use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{ChannelId, ChannelState, PlaylistId, PlaylistItemId},
    Result,
};

/// `ChannelState` repository: the single authoritative published-status row
/// per channel. Writes are upserts keyed on `channel_id` so the Engine
/// never has to know whether the row already exists.
#[derive(Clone)]
pub struct ChannelStateRepository {
    pool: PgPool,
}

impl ChannelStateRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, channel_id: &ChannelId) -> Result<Option<ChannelState>> {
        let row = sqlx::query(
            "SELECT channel_id, current_playlist_id, current_item_id, position_seconds, running, encoder_pid, updated_at
             FROM channel_states WHERE channel_id = $1",
        )
        .bind(channel_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_state).transpose()
    }

    pub async fn upsert(&self, state: &ChannelState) -> Result<()> {
        sqlx::query(
            "INSERT INTO channel_states (channel_id, current_playlist_id, current_item_id, position_seconds, running, encoder_pid, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (channel_id) DO UPDATE SET
                current_playlist_id = EXCLUDED.current_playlist_id,
                current_item_id = EXCLUDED.current_item_id,
                position_seconds = EXCLUDED.position_seconds,
                running = EXCLUDED.running,
                encoder_pid = EXCLUDED.encoder_pid,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(state.channel_id.as_str())
        .bind(state.current_playlist_id.as_ref().map(PlaylistId::as_str))
        .bind(state.current_item_id.as_ref().map(PlaylistItemId::as_str))
        .bind(state.position_seconds)
        .bind(state.running)
        .bind(state.encoder_pid)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Convenience for just updating the position/running/pid fields on every
    /// Encoder Driver progress tick, without re-serializing the whole struct.
    pub async fn update_progress(
        &self,
        channel_id: &ChannelId,
        position_seconds: f64,
        running: bool,
        encoder_pid: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE channel_states SET position_seconds = $2, running = $3, encoder_pid = $4, updated_at = CURRENT_TIMESTAMP
             WHERE channel_id = $1",
        )
        .bind(channel_id.as_str())
        .bind(position_seconds)
        .bind(running)
        .bind(encoder_pid)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_state(row: PgRow) -> Result<ChannelState> {
        let current_playlist_id: Option<String> = row.try_get("current_playlist_id")?;
        let current_item_id: Option<String> = row.try_get("current_item_id")?;

        Ok(ChannelState {
            channel_id: ChannelId::from_string(row.try_get("channel_id")?),
            current_playlist_id: current_playlist_id.map(PlaylistId::from_string),
            current_item_id: current_item_id.map(PlaylistItemId::from_string),
            position_seconds: row.try_get("position_seconds")?,
            running: row.try_get("running")?,
            encoder_pid: row.try_get("encoder_pid")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
