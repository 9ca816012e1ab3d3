//! Playback Engine: the per-channel state machine orchestrating the
//! Resolver, Position Calculator, Item Locker, and Encoder Driver across one
//! channel's 24-hour programming cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::{
    encoder::{EncoderDriver, InputSpec, StreamConfig},
    locker::ItemLocker,
    models::{
        Channel, ChannelState, MediaFile, MediaFileId, Overlay, OverlayType, Playlist, PlaylistItem,
        PlaylistItemSource,
    },
    position,
    repository::{
        ChannelStateRepository, MediaFileRepository, OverlayRepository, PlaylistItemRepository, UdpStreamRepository,
    },
    resolver::PlaylistResolver,
    Error, Result,
};

const ONE_DAY_SECONDS: f64 = 86_400.0;

/// Resolved playback source for one item, with its duration already
/// normalized (`None` for a UDP stream means infinite).
enum ResolvedInput {
    Media { path: std::path::PathBuf, duration_seconds: f64, program_name: Option<String> },
    Udp { url: String, duration_seconds: Option<f64> },
}

struct InitialPosition {
    playlist: Playlist,
    items: Vec<PlaylistItem>,
    start_index: usize,
    start_offset: f64,
    locked_next_id: crate::models::PlaylistItemId,
}

/// Owns one channel's entire play loop for the lifetime of a single
/// `Supervisor.Start`/`Stop` cycle. Not `Clone` — exactly one task drives it.
pub struct PlaybackEngine {
    channel: Channel,
    resolver: PlaylistResolver,
    locker: ItemLocker,
    driver: EncoderDriver,
    playlist_item_repo: PlaylistItemRepository,
    media_file_repo: MediaFileRepository,
    udp_stream_repo: UdpStreamRepository,
    overlay_repo: OverlayRepository,
    channel_state_repo: ChannelStateRepository,
    media_cache: Arc<SyncMutex<HashMap<MediaFileId, MediaFile>>>,
    cancel: CancellationToken,
}

impl PlaybackEngine {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: Channel,
        resolver: PlaylistResolver,
        locker: ItemLocker,
        driver: EncoderDriver,
        playlist_item_repo: PlaylistItemRepository,
        media_file_repo: MediaFileRepository,
        udp_stream_repo: UdpStreamRepository,
        overlay_repo: OverlayRepository,
        channel_state_repo: ChannelStateRepository,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            channel,
            resolver,
            locker,
            driver,
            playlist_item_repo,
            media_file_repo,
            udp_stream_repo,
            overlay_repo,
            channel_state_repo,
            media_cache: Arc::new(SyncMutex::new(HashMap::new())),
            cancel,
        }
    }

    /// Runs until cancelled, an unrecoverable error occurs, or (in practice,
    /// never, since cancellation is the only designed exit) the channel is
    /// disabled out from under it. Database failures during initialization
    /// are fatal; failures in the steady-state loop are logged and skipped.
    #[instrument(skip(self), fields(channel_id = %self.channel.id))]
    pub async fn run(mut self) -> Result<()> {
        let init = self.initialize().await?;
        let mut playlist = init.playlist;
        let mut items = init.items;
        let mut current_index = init.start_index;
        let mut start_offset = init.start_offset;
        let mut locked_next_id = init.locked_next_id;

        let result = self
            .run_loop(&mut playlist, &mut items, &mut current_index, &mut start_offset, &mut locked_next_id)
            .await;

        self.teardown(&playlist.id).await;
        result
    }

    /// The steady-state play loop. Every exit path — cancellation or a
    /// propagated error — returns through `run()`'s single `teardown()` call,
    /// so the current playlist's item locks are always released no matter
    /// how this loop ends.
    async fn run_loop(
        &mut self,
        playlist: &mut Playlist,
        items: &mut Vec<PlaylistItem>,
        current_index: &mut usize,
        start_offset: &mut f64,
        locked_next_id: &mut crate::models::PlaylistItemId,
    ) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let now = Utc::now();
            let next_day_anchor = self.next_day_anchor(now);
            let time_until_transition = seconds_between(now, next_day_anchor);

            let current_item = items[*current_index].clone();
            let resolved = match self.resolve_input(&current_item).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(item_id = %current_item.id, error = %e, "failed to resolve item input, skipping");
                    *current_index = (*current_index + 1) % items.len();
                    continue;
                }
            };

            let duration_cap = effective_duration_cap(&resolved, *start_offset, time_until_transition);
            let config = match self.build_stream_config(&resolved).await {
                Ok(config) => config.with_offsets(*start_offset, duration_cap),
                Err(e) => {
                    error!(item_id = %current_item.id, error = %e, "failed to build stream config");
                    return Err(e);
                }
            };

            let prefetch = self.spawn_prefetch(playlist.id.clone(), current_item.id.clone(), locked_next_id.clone());

            self.driver.reset().await?;

            let boundary_state = ChannelState {
                channel_id: self.channel.id.clone(),
                current_playlist_id: Some(playlist.id.clone()),
                current_item_id: Some(current_item.id.clone()),
                position_seconds: *start_offset,
                running: true,
                encoder_pid: 0,
                updated_at: Utc::now(),
            };
            if let Err(e) = self.channel_state_repo.upsert(&boundary_state).await {
                warn!(channel_id = %self.channel.id, error = %e, "failed to record item boundary in channel state");
            }

            let state_repo = self.channel_state_repo.clone();
            let channel_id = self.channel.id.clone();
            self.driver.set_progress_callback(move |position_seconds| {
                let state_repo = state_repo.clone();
                let channel_id = channel_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = state_repo
                        .update_progress(&channel_id, position_seconds, true, 0)
                        .await
                    {
                        warn!(%channel_id, error = %e, "failed to write progress tick");
                    }
                });
            });

            if let Err(e) = self.driver.start(config).await {
                error!(item_id = %current_item.id, error = %e, "encoder spawn failed");
                let _ = prefetch.await;
                return Err(e);
            }

            if let Some(pid) = self.driver.pid() {
                if let Err(e) = self
                    .channel_state_repo
                    .update_progress(&self.channel.id, *start_offset, true, pid as i32)
                    .await
                {
                    warn!(channel_id = %self.channel.id, error = %e, "failed to record encoder pid");
                }
            }

            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.driver.stop().await.ok();
                }
                () = self.driver.done() => {
                    if self.cancel.is_cancelled() {
                        info!(item_id = %current_item.id, "encoder stopped on cancellation");
                    } else {
                        info!(item_id = %current_item.id, "encoder exited, advancing");
                    }
                }
            }

            *start_offset = 0.0;

            let (refreshed_items, next_index) = match prefetch.await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!(error = %e, "prefetch failed, reusing previous item list");
                    (items.clone(), (*current_index + 1) % items.len())
                }
                Err(e) => {
                    warn!(error = %e, "prefetch task panicked, reusing previous item list");
                    (items.clone(), (*current_index + 1) % items.len())
                }
            };
            *items = refreshed_items;
            *locked_next_id = items[next_index.min(items.len().saturating_sub(1))].id.clone();

            if self.cancel.is_cancelled() {
                break;
            }

            let now = Utc::now();
            if now > next_day_anchor {
                match self.transition(now).await {
                    Ok(next) => {
                        *playlist = next.playlist;
                        *items = next.items;
                        *current_index = next.start_index;
                        *start_offset = next.start_offset;
                        *locked_next_id = next.locked_next_id;
                    }
                    Err(e) => {
                        error!(error = %e, "day-boundary transition failed");
                        return Err(e);
                    }
                }
            } else {
                *current_index = next_index.min(items.len().saturating_sub(1));
            }
        }

        Ok(())
    }

    async fn initialize(&self) -> Result<InitialPosition> {
        let now = Utc::now();
        let playlist = self.resolver.resolve(&self.channel, now).await?;
        let items = self.playlist_item_repo.list_by_playlist(&playlist.id).await?;
        if items.is_empty() {
            return Err(Error::EmptyPlaylist(playlist.id.to_string()));
        }

        let durations = self.resolve_durations(&items).await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to resolve durations at init, falling back to item 0");
            Vec::new()
        });
        let effective_date = PlaylistResolver::effective_date(&self.channel, now);
        let anchor = PlaylistResolver::anchor_instant(&self.channel, effective_date);
        let (start_index, start_offset) = position::calculate(&durations, anchor, now);

        let next_index = (start_index + 1) % items.len();
        self.locker
            .lock_current_and_next(&playlist.id, &items[start_index].id, &items[next_index].id)
            .await?;
        let locked_next_id = items[next_index].id.clone();

        Ok(InitialPosition { playlist, items, start_index, start_offset, locked_next_id })
    }

    /// Day-boundary transition: cancel the current item's driver state,
    /// resolve the next effective playlist (respecting the fallback chain),
    /// and reinitialize at index 0.
    async fn transition(&self, now: DateTime<Utc>) -> Result<InitialPosition> {
        self.driver.reset().await?;
        let playlist = self.resolver.resolve(&self.channel, now).await?;
        let items = self.playlist_item_repo.list_by_playlist(&playlist.id).await?;
        if items.is_empty() {
            return Err(Error::EmptyPlaylist(playlist.id.to_string()));
        }

        let next_index = if items.len() > 1 { 1 } else { 0 };
        self.locker
            .lock_current_and_next(&playlist.id, &items[0].id, &items[next_index].id)
            .await?;
        let locked_next_id = items[next_index].id.clone();

        Ok(InitialPosition { playlist, items, start_index: 0, start_offset: 0.0, locked_next_id })
    }

    async fn teardown(&self, playlist_id: &crate::models::PlaylistId) {
        self.driver.stop().await.ok();

        if let Err(e) = self.locker.release_all(playlist_id).await {
            warn!(channel_id = %self.channel.id, playlist_id = %playlist_id, error = %e, "failed to release item locks on teardown");
        }

        if let Err(e) = self
            .channel_state_repo
            .upsert(&ChannelState::stopped(self.channel.id.clone()))
            .await
        {
            warn!(channel_id = %self.channel.id, error = %e, "failed to clear channel state on teardown");
        }
    }

    fn next_day_anchor(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let effective_date = PlaylistResolver::effective_date(&self.channel, now);
        let next_date = effective_date.succ_opt().unwrap_or(effective_date);
        PlaylistResolver::anchor_instant(&self.channel, next_date)
    }

    /// Spawns the concurrent prefetch task: re-reads the playlist's item
    /// list to pick up authoring edits, computes the next index relative to
    /// `current_item_id`'s position in the refreshed list, and swaps the
    /// "next" lock from `locked_next_id` onto the freshly-computed next item.
    /// This runs while `current_item_id` is still streaming, so it must
    /// never touch `current`'s lock — only [`initialize`](Self::initialize)
    /// and [`transition`](Self::transition), which run with no encoder live,
    /// are allowed to reset current+next together.
    fn spawn_prefetch(
        &self,
        playlist_id: crate::models::PlaylistId,
        current_item_id: crate::models::PlaylistItemId,
        locked_next_id: crate::models::PlaylistItemId,
    ) -> tokio::task::JoinHandle<Result<(Vec<PlaylistItem>, usize)>> {
        let repo = self.playlist_item_repo.clone();
        let locker = self.locker.clone();
        tokio::spawn(async move {
            let items = repo.list_by_playlist(&playlist_id).await?;
            if items.is_empty() {
                return Err(Error::EmptyPlaylist(playlist_id.to_string()));
            }
            let current_index = items.iter().position(|i| i.id == current_item_id).unwrap_or(0);
            let next_index = (current_index + 1) % items.len();
            locker.swap_next(Some(&locked_next_id), &items[next_index].id).await?;
            Ok((items, next_index))
        })
    }

    async fn resolve_durations(&self, items: &[PlaylistItem]) -> Result<Vec<f64>> {
        let mut durations = Vec::with_capacity(items.len());
        for item in items {
            let resolved = self.resolve_input(item).await?;
            durations.push(match resolved {
                ResolvedInput::Media { duration_seconds, .. } => duration_seconds,
                ResolvedInput::Udp { duration_seconds: Some(d), .. } => d,
                ResolvedInput::Udp { duration_seconds: None, .. } => ONE_DAY_SECONDS,
            });
        }
        Ok(durations)
    }

    async fn resolve_input(&self, item: &PlaylistItem) -> Result<ResolvedInput> {
        match &item.source {
            PlaylistItemSource::Media(media_file_id) => {
                let media_file = self.media_file(media_file_id).await?;
                Ok(ResolvedInput::Media {
                    path: self.channel.media_path(&media_file.relative_path),
                    duration_seconds: media_file.duration_seconds as f64,
                    program_name: media_file.program_name.clone(),
                })
            }
            PlaylistItemSource::Udp(udp_stream_id) => {
                let stream = self
                    .udp_stream_repo
                    .get_by_id(udp_stream_id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("udp stream {udp_stream_id}")))?;
                Ok(ResolvedInput::Udp {
                    url: stream.url,
                    duration_seconds: stream.duration_seconds.map(|d| d as f64),
                })
            }
        }
    }

    /// Write-through cache: populated on first miss, never evicted for the
    /// life of the engine (engines are recycled on every Stop/Start so
    /// unbounded growth within one run is acceptable).
    async fn media_file(&self, media_file_id: &MediaFileId) -> Result<MediaFile> {
        if let Some(cached) = self.media_cache.lock().get(media_file_id).cloned() {
            return Ok(cached);
        }
        let media_file = self
            .media_file_repo
            .get_by_id(media_file_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("media file {media_file_id}")))?;
        self.media_cache.lock().insert(media_file_id.clone(), media_file.clone());
        Ok(media_file)
    }

    async fn build_stream_config(&self, resolved: &ResolvedInput) -> Result<StreamConfig> {
        let mut overlays = self.overlay_repo.list_enabled_by_channel(&self.channel.id).await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load overlays, continuing without them");
            Vec::new()
        });

        if let ResolvedInput::Media { program_name: Some(name), .. } = resolved {
            if !name.is_empty() {
                overlays.push(program_name_overlay(&self.channel.id, name));
            }
        }

        let input = match resolved {
            ResolvedInput::Media { path, .. } => InputSpec::Media { path: path.clone() },
            ResolvedInput::Udp { url, .. } => InputSpec::Udp { url: url.clone() },
        };

        Ok(StreamConfig {
            input,
            start_offset_seconds: 0.0,
            duration_cap_seconds: 0.0,
            encoder: self.channel.encoder.clone(),
            overlays,
            font_dir: self.channel.font_dir(),
            output_url: self.channel.output_url(),
        })
    }
}

/// A channel has no configured program-name overlay row, so this is
/// synthesized with a fixed layout rather than read from the Overlay table.
fn program_name_overlay(channel_id: &crate::models::ChannelId, program_name: &str) -> Overlay {
    Overlay {
        id: crate::models::OverlayId::new(),
        channel_id: channel_id.clone(),
        overlay_type: OverlayType::Text,
        image_path: None,
        text: Some(program_name.to_string()),
        x_expr: "w-tw-20".to_string(),
        y_expr: "h-th-20".to_string(),
        font_size: Some(28),
        font_color: Some("white".to_string()),
        enabled: true,
    }
}

fn effective_duration_cap(resolved: &ResolvedInput, start_offset: f64, time_until_transition: f64) -> f64 {
    match resolved {
        ResolvedInput::Media { duration_seconds, .. } => {
            (duration_seconds - start_offset).min(time_until_transition).max(0.0)
        }
        ResolvedInput::Udp { duration_seconds: Some(d), .. } => (d - start_offset).min(time_until_transition).max(0.0),
        ResolvedInput::Udp { duration_seconds: None, .. } => (time_until_transition - start_offset).max(0.0),
    }
}

fn seconds_between(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    (then - now).num_milliseconds() as f64 / 1000.0
}

impl StreamConfig {
    /// A UDP source is always joined at its live position: per the open
    /// question resolved in SPEC_FULL.md/DESIGN.md, `start_offset_seconds`
    /// (computed only to size the duration cap against the day boundary)
    /// is never surfaced as a `-ss` seek for `InputSpec::Udp`.
    fn with_offsets(mut self, start_offset_seconds: f64, duration_cap_seconds: f64) -> Self {
        self.start_offset_seconds = match self.input {
            InputSpec::Media { .. } => start_offset_seconds,
            InputSpec::Udp { .. } => 0.0,
        };
        self.duration_cap_seconds = duration_cap_seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelId, EncoderParams};

    #[test]
    fn duration_cap_clamps_to_time_until_transition() {
        let resolved = ResolvedInput::Media { path: "x".into(), duration_seconds: 600.0, program_name: None };
        assert_eq!(effective_duration_cap(&resolved, 0.0, 10.0), 10.0);
        assert_eq!(effective_duration_cap(&resolved, 590.0, 1000.0), 10.0);
    }

    #[test]
    fn infinite_udp_cap_uses_time_until_transition_minus_offset() {
        let resolved = ResolvedInput::Udp { url: "udp://x".into(), duration_seconds: None };
        assert_eq!(effective_duration_cap(&resolved, 100.0, 56_500.0), 56_400.0);
    }

    #[test]
    fn negative_cap_clamps_to_zero() {
        let resolved = ResolvedInput::Media { path: "x".into(), duration_seconds: 10.0, program_name: None };
        assert_eq!(effective_duration_cap(&resolved, 20.0, 100.0), 0.0);
    }

    #[test]
    fn program_name_overlay_has_fixed_layout() {
        let overlay = program_name_overlay(&ChannelId::from_string("c1".into()), "Evening News");
        assert_eq!(overlay.text.as_deref(), Some("Evening News"));
        assert!(overlay.enabled);
        assert_eq!(overlay.overlay_type, OverlayType::Text);
    }

    #[test]
    fn encoder_params_default_is_used_when_building_config() {
        let params = EncoderParams::default();
        assert_eq!(params.video_codec, "h264_nvenc");
    }
}
