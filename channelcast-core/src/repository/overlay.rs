use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{ChannelId, Overlay, OverlayType},
    Error, Result,
};

/// Overlay repository. CRUD for these rows is out of scope; this crate
/// only reads the enabled set when building encoder arguments.
#[derive(Clone)]
pub struct OverlayRepository {
    pool: PgPool,
}

impl OverlayRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enabled overlays for `channel_id`, in insertion order.
    pub async fn list_enabled_by_channel(&self, channel_id: &ChannelId) -> Result<Vec<Overlay>> {
        let rows = sqlx::query(
            "SELECT id, channel_id, overlay_type, image_path, text, x_expr, y_expr, font_size, font_color, enabled
             FROM overlays WHERE channel_id = $1 AND enabled = TRUE ORDER BY id ASC",
        )
        .bind(channel_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_overlay).collect()
    }

    fn row_to_overlay(row: PgRow) -> Result<Overlay> {
        let overlay_type_str: String = row.try_get("overlay_type")?;
        let overlay_type = match overlay_type_str.as_str() {
            "text" => OverlayType::Text,
            "image" => OverlayType::Image,
            other => return Err(Error::Internal(format!("unknown overlay_type '{other}'"))),
        };
        let font_size: Option<i32> = row.try_get("font_size")?;

        Ok(Overlay {
            id: row.try_get("id")?,
            channel_id: ChannelId::from_string(row.try_get("channel_id")?),
            overlay_type,
            image_path: row.try_get("image_path")?,
            text: row.try_get("text")?,
            x_expr: row.try_get("x_expr")?,
            y_expr: row.try_get("y_expr")?,
            font_size: font_size.map(|v| v as u32),
            font_color: row.try_get("font_color")?,
            enabled: row.try_get("enabled")?,
        })
    }
}
