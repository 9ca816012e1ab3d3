use sqlx::{PgPool, Row};

use crate::{
    models::{playlist_item::PlaylistItemRow, PlaylistId, PlaylistItem, PlaylistItemId, PlaylistItemSource},
    transaction::UnitOfWork,
    Result,
};

/// `PlaylistItem` repository; also implements the Item Locker operations.
#[derive(Clone)]
pub struct PlaylistItemRepository {
    pool: PgPool,
}

impl PlaylistItemRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, item: &PlaylistItem) -> Result<PlaylistItem> {
        let (item_type, media_file_id, udp_stream_id) = Self::source_columns(&item.source);
        let row = sqlx::query(
            "INSERT INTO playlist_items (id, playlist_id, position, item_type, media_file_id, udp_stream_id,
                scheduled_start, scheduled_end, actual_start, actual_end, locked)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING id, playlist_id, position, item_type, media_file_id, udp_stream_id,
                scheduled_start, scheduled_end, actual_start, actual_end, locked",
        )
        .bind(item.id.as_str())
        .bind(item.playlist_id.as_str())
        .bind(item.position)
        .bind(item_type)
        .bind(media_file_id)
        .bind(udp_stream_id)
        .bind(item.scheduled_start)
        .bind(item.scheduled_end)
        .bind(item.actual_start)
        .bind(item.actual_end)
        .bind(item.locked)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_item(row)
    }

    /// Every item of `playlist_id`, ordered by `position` ascending.
    pub async fn list_by_playlist(&self, playlist_id: &PlaylistId) -> Result<Vec<PlaylistItem>> {
        let rows = sqlx::query(
            "SELECT id, playlist_id, position, item_type, media_file_id, udp_stream_id,
                scheduled_start, scheduled_end, actual_start, actual_end, locked
             FROM playlist_items WHERE playlist_id = $1 ORDER BY position ASC",
        )
        .bind(playlist_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    /// Mark an item locked, idempotently.
    pub async fn lock(&self, item_id: &PlaylistItemId) -> Result<()> {
        sqlx::query("UPDATE playlist_items SET locked = TRUE WHERE id = $1")
            .bind(item_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clear the lock on an item, idempotently.
    pub async fn unlock(&self, item_id: &PlaylistItemId) -> Result<()> {
        sqlx::query("UPDATE playlist_items SET locked = FALSE WHERE id = $1")
            .bind(item_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Release every lock held on items belonging to `playlist_id`. Used by
    /// the Supervisor/Engine on stop and on day-boundary transition so a
    /// crashed or stopped engine never leaves stale locks behind.
    pub async fn unlock_all_in_playlist(&self, playlist_id: &PlaylistId) -> Result<u64> {
        let result = sqlx::query("UPDATE playlist_items SET locked = FALSE WHERE playlist_id = $1 AND locked = TRUE")
            .bind(playlist_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Atomically move the "next" lock from `stale_next` (if set and
    /// different from `new_next`) to `new_next`, in a single transaction, so
    /// a concurrent reader never observes a window where neither item is
    /// locked. Used by the prefetch path, which runs while the current item
    /// is still streaming and must not touch its lock.
    pub async fn swap_next_lock(&self, stale_next: Option<&PlaylistItemId>, new_next: &PlaylistItemId) -> Result<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if let Some(stale) = stale_next {
            if stale != new_next {
                sqlx::query("UPDATE playlist_items SET locked = FALSE WHERE id = $1")
                    .bind(stale.as_str())
                    .execute(&mut *uow.transaction())
                    .await?;
            }
        }

        sqlx::query("UPDATE playlist_items SET locked = TRUE WHERE id = $1")
            .bind(new_next.as_str())
            .execute(&mut *uow.transaction())
            .await?;

        uow.commit().await?;
        Ok(())
    }

    pub async fn set_actual_times(
        &self,
        item_id: &PlaylistItemId,
        actual_start: Option<chrono::DateTime<chrono::Utc>>,
        actual_end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<()> {
        sqlx::query("UPDATE playlist_items SET actual_start = COALESCE($2, actual_start), actual_end = $3 WHERE id = $1")
            .bind(item_id.as_str())
            .bind(actual_start)
            .bind(actual_end)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn source_columns(source: &PlaylistItemSource) -> (&'static str, Option<&str>, Option<&str>) {
        match source {
            PlaylistItemSource::Media(id) => ("media", Some(id.as_str()), None),
            PlaylistItemSource::Udp(id) => ("udp", None, Some(id.as_str())),
        }
    }

    fn row_to_item(row: sqlx::postgres::PgRow) -> Result<PlaylistItem> {
        let raw = PlaylistItemRow {
            id: row.try_get("id")?,
            playlist_id: row.try_get("playlist_id")?,
            position: row.try_get("position")?,
            item_type: row.try_get("item_type")?,
            media_file_id: row.try_get("media_file_id")?,
            udp_stream_id: row.try_get("udp_stream_id")?,
            scheduled_start: row.try_get("scheduled_start")?,
            scheduled_end: row.try_get("scheduled_end")?,
            actual_start: row.try_get("actual_start")?,
            actual_end: row.try_get("actual_end")?,
            locked: row.try_get("locked")?,
        };
        raw.into_item()
    }
}
