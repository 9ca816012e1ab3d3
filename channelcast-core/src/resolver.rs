//! Playlist Resolver: given a channel and the current wall-clock time,
//! decides which playlist the Playback Engine should be running, including
//! the bounded previous-day fallback chain.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::{
    models::{Channel, Playlist},
    repository::PlaylistRepository,
    Error, Result,
};

/// Resolves playlists for channels against a `PlaylistRepository`.
#[derive(Clone)]
pub struct PlaylistResolver {
    repository: PlaylistRepository,
    max_fallback_days: u32,
}

impl PlaylistResolver {
    #[must_use]
    pub const fn new(repository: PlaylistRepository, max_fallback_days: u32) -> Self {
        Self {
            repository,
            max_fallback_days,
        }
    }

    /// The anchor instant for `date`, i.e. `date @ channel.anchor_hour:anchor_minute`.
    ///
    /// Channel anchors are treated as UTC wall-clock times; the data model
    /// carries no per-channel time zone field, so UTC is the resolver's
    /// working civil calendar (see DESIGN.md).
    #[must_use]
    pub fn anchor_instant(channel: &Channel, date: NaiveDate) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(u32::from(channel.anchor_hour), u32::from(channel.anchor_minute), 0)
            .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is always valid"));
        Utc.from_utc_datetime(&date.and_time(time))
    }

    /// The calendar date whose anchor is the greatest anchor `<= now`.
    #[must_use]
    pub fn effective_date(channel: &Channel, now: DateTime<Utc>) -> NaiveDate {
        let today = now.date_naive();
        if now < Self::anchor_instant(channel, today) {
            today.pred_opt().unwrap_or(today)
        } else {
            today
        }
    }

    /// Resolve the playlist `channel` should play at `now`.
    pub async fn resolve(&self, channel: &Channel, now: DateTime<Utc>) -> Result<Playlist> {
        let effective_date = Self::effective_date(channel, now);

        if let Some(playlist) = self
            .repository
            .get_by_channel_and_date(&channel.id, effective_date)
            .await?
        {
            return Ok(playlist);
        }

        if let Some(playlist) = self.repository.get_default(&channel.id).await? {
            return Ok(playlist);
        }

        if !channel.use_previous_day_fallback {
            return Err(Error::PlaylistNotFound(channel.id.to_string()));
        }

        let mut candidate_date = effective_date;
        for days_checked in 1..=self.max_fallback_days {
            candidate_date = candidate_date.pred_opt().ok_or_else(|| Error::NoPlaylistAfterFallback {
                channel_id: channel.id.to_string(),
                days_checked,
            })?;

            if let Some(playlist) = self
                .repository
                .get_by_channel_and_date(&channel.id, candidate_date)
                .await?
            {
                return Ok(playlist);
            }
        }

        Err(Error::NoPlaylistAfterFallback {
            channel_id: channel.id.to_string(),
            days_checked: self.max_fallback_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelId, EncoderParams, PlaylistSelectionMode};

    fn test_channel() -> Channel {
        Channel {
            id: ChannelId::from_string("c1".into()),
            name: "Test".into(),
            storage_root: "/srv/test".into(),
            output_host: "239.0.0.1".into(),
            output_port: 5000,
            selection_mode: PlaylistSelectionMode::DailyPlaylist,
            anchor_hour: 6,
            anchor_minute: 0,
            enabled: true,
            use_previous_day_fallback: true,
            encoder: EncoderParams::default(),
        }
    }

    #[test]
    fn effective_date_before_anchor_is_yesterday() {
        let channel = test_channel();
        let now: DateTime<Utc> = "2026-01-05T05:59:59Z".parse().unwrap();
        assert_eq!(
            PlaylistResolver::effective_date(&channel, now),
            NaiveDate::from_ymd_opt(2026, 1, 4).unwrap()
        );
    }

    #[test]
    fn effective_date_at_or_after_anchor_is_today() {
        let channel = test_channel();
        let now: DateTime<Utc> = "2026-01-05T06:00:00Z".parse().unwrap();
        assert_eq!(
            PlaylistResolver::effective_date(&channel, now),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
    }

    #[test]
    fn anchor_instant_uses_configured_hour_and_minute() {
        let mut channel = test_channel();
        channel.anchor_hour = 18;
        channel.anchor_minute = 30;
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let anchor = PlaylistResolver::anchor_instant(&channel, date);
        assert_eq!(anchor.to_rfc3339(), "2026-03-01T18:30:00+00:00");
    }
}
