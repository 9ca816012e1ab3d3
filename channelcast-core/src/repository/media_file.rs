use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{ChannelId, MediaFile, MediaFileId},
    Result,
};

/// `MediaFile` repository. Rows are produced by the (out-of-scope) filesystem
/// scanner; this crate only reads them.
#[derive(Clone)]
pub struct MediaFileRepository {
    pool: PgPool,
}

impl MediaFileRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, media_file_id: &MediaFileId) -> Result<Option<MediaFile>> {
        let row = sqlx::query(
            "SELECT id, channel_id, relative_path, display_name, duration_seconds, program_name,
                byte_size, mtime, scanned_at
             FROM media_files WHERE id = $1",
        )
        .bind(media_file_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_media_file).transpose()
    }

    pub async fn list_by_channel(&self, channel_id: &ChannelId) -> Result<Vec<MediaFile>> {
        let rows = sqlx::query(
            "SELECT id, channel_id, relative_path, display_name, duration_seconds, program_name,
                byte_size, mtime, scanned_at
             FROM media_files WHERE channel_id = $1 ORDER BY relative_path ASC",
        )
        .bind(channel_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_media_file).collect()
    }

    fn row_to_media_file(row: PgRow) -> Result<MediaFile> {
        Ok(MediaFile {
            id: MediaFileId::from_string(row.try_get("id")?),
            channel_id: ChannelId::from_string(row.try_get("channel_id")?),
            relative_path: row.try_get("relative_path")?,
            display_name: row.try_get("display_name")?,
            duration_seconds: row.try_get("duration_seconds")?,
            program_name: row.try_get("program_name")?,
            byte_size: row.try_get("byte_size")?,
            mtime: row.try_get("mtime")?,
            scanned_at: row.try_get("scanned_at")?,
        })
    }
}
