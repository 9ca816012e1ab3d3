use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("No playlist scheduled for channel {0} on the effective date")]
    PlaylistNotFound(String),

    #[error("Playlist {0} has no items")]
    EmptyPlaylist(String),

    #[error("No playlist found for channel {channel_id} after walking back {days_checked} day(s)")]
    NoPlaylistAfterFallback { channel_id: String, days_checked: u32 },

    #[error("Channel {0} is already running")]
    AlreadyRunning(String),

    #[error("Channel {0} is not running")]
    NotRunning(String),

    #[error("Failed to spawn encoder process: {0}")]
    EncoderSpawnFailed(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    // PostgreSQL foreign_key_violation
                    "23503" => Error::NotFound("Referenced resource not found".to_string()),
                    // PostgreSQL check_violation
                    "23514" => Error::InvalidInput("Constraint check failed".to_string()),
                    // PostgreSQL not_null_violation
                    "23502" => Error::InvalidInput("Required field is missing".to_string()),
                    _ => Error::Database(err),
                }
            }
            _ => Error::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn domain_errors_display_channel_id() {
        let err = Error::AlreadyRunning("chan-1".to_string());
        assert_eq!(err.to_string(), "Channel chan-1 is already running");
    }
}
