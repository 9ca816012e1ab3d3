use chrono::NaiveDate;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{ChannelId, Playlist, PlaylistId, PlaylistStatus},
    Error, Result,
};

/// Playlist repository for database operations.
#[derive(Clone)]
pub struct PlaylistRepository {
    pool: PgPool,
}

impl PlaylistRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, playlist: &Playlist) -> Result<Playlist> {
        let row = sqlx::query(
            "INSERT INTO playlists (id, channel_id, playlist_date, status, total_duration_seconds, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, channel_id, playlist_date, status, total_duration_seconds, created_at, updated_at",
        )
        .bind(playlist.id.as_str())
        .bind(playlist.channel_id.as_str())
        .bind(playlist.playlist_date)
        .bind(playlist.status.as_str())
        .bind(playlist.total_duration_seconds)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .fetch_one(&self.pool)
        .await?;

        self.row_to_playlist(row)
    }

    pub async fn get_by_id(&self, playlist_id: &PlaylistId) -> Result<Option<Playlist>> {
        let row = sqlx::query(
            "SELECT id, channel_id, playlist_date, status, total_duration_seconds, created_at, updated_at
             FROM playlists WHERE id = $1",
        )
        .bind(playlist_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.row_to_playlist(r)).transpose()
    }

    /// The playlist scheduled for `channel_id` on exactly `date`.
    pub async fn get_by_channel_and_date(
        &self,
        channel_id: &ChannelId,
        date: NaiveDate,
    ) -> Result<Option<Playlist>> {
        let row = sqlx::query(
            "SELECT id, channel_id, playlist_date, status, total_duration_seconds, created_at, updated_at
             FROM playlists WHERE channel_id = $1 AND playlist_date = $2",
        )
        .bind(channel_id.as_str())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.row_to_playlist(r)).transpose()
    }

    /// The channel's single null-date "default" playlist, if any.
    pub async fn get_default(&self, channel_id: &ChannelId) -> Result<Option<Playlist>> {
        let row = sqlx::query(
            "SELECT id, channel_id, playlist_date, status, total_duration_seconds, created_at, updated_at
             FROM playlists WHERE channel_id = $1 AND playlist_date IS NULL",
        )
        .bind(channel_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.row_to_playlist(r)).transpose()
    }

    pub async fn update_status(&self, playlist_id: &PlaylistId, status: PlaylistStatus) -> Result<Playlist> {
        let row = sqlx::query(
            "UPDATE playlists SET status = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING id, channel_id, playlist_date, status, total_duration_seconds, created_at, updated_at",
        )
        .bind(playlist_id.as_str())
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        self.row_to_playlist(row)
    }

    fn row_to_playlist(&self, row: PgRow) -> Result<Playlist> {
        let status_str: String = row.try_get("status")?;
        let status = PlaylistStatus::from_str_opt(&status_str)
            .ok_or_else(|| Error::Internal(format!("unknown playlist status '{status_str}'")))?;

        Ok(Playlist {
            id: PlaylistId::from_string(row.try_get("id")?),
            channel_id: ChannelId::from_string(row.try_get("channel_id")?),
            playlist_date: row.try_get("playlist_date")?,
            status,
            total_duration_seconds: row.try_get("total_duration_seconds")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
