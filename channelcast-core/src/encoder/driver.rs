use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::args::StreamConfig;
use super::progress::parse_progress_line;
use crate::{Error, Result};

/// Grace window `Reset` waits before escalating to `SIGKILL`. Distinct from
/// `EncoderRuntimeConfig::shutdown_grace_seconds`, which governs the
/// background escalation `Stop` schedules.
const RESET_GRACE: Duration = Duration::from_millis(100);

type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

struct DriverState {
    pid: Option<u32>,
    cancel: CancellationToken,
    done_rx: Option<watch::Receiver<bool>>,
    position_seconds: f64,
}

impl Default for DriverState {
    fn default() -> Self {
        Self {
            pid: None,
            cancel: CancellationToken::new(),
            done_rx: None,
            position_seconds: 0.0,
        }
    }
}

/// Owns exactly one encoder subprocess at a time. Cheaply cloneable; clones
/// share the same underlying child process and state.
#[derive(Clone)]
pub struct EncoderDriver {
    ffmpeg_binary: String,
    shutdown_grace: Duration,
    state: Arc<SyncMutex<DriverState>>,
    child: Arc<AsyncMutex<Option<Child>>>,
    progress_callback: Arc<SyncMutex<Option<ProgressCallback>>>,
}

impl EncoderDriver {
    #[must_use]
    pub fn new(ffmpeg_binary: impl Into<String>, shutdown_grace: Duration) -> Self {
        Self {
            ffmpeg_binary: ffmpeg_binary.into(),
            shutdown_grace,
            state: Arc::new(SyncMutex::new(DriverState::default())),
            child: Arc::new(AsyncMutex::new(None)),
            progress_callback: Arc::new(SyncMutex::new(None)),
        }
    }

    /// Installs the ~1 Hz progress observer. Replaces any previously
    /// installed callback.
    pub fn set_progress_callback<F>(&self, callback: F)
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        *self.progress_callback.lock() = Some(Box::new(callback));
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.state.lock().pid
    }

    /// Reconciles the driver's internal flag against OS liveness via
    /// `/proc/<pid>`, per the contract's explicit requirement.
    #[must_use]
    pub fn is_running(&self) -> bool {
        match self.pid() {
            Some(pid) => process_alive(pid),
            None => false,
        }
    }

    /// Spawns the child and attaches the diagnostic reader. Returns once the
    /// process has been created; does not wait for completion.
    pub async fn start(&self, config: StreamConfig) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyRunning("encoder".to_string()));
        }

        let args = super::args::build_args(&config);
        debug!(ffmpeg_args = ?args, "spawning encoder");

        let mut command = Command::new(&self.ffmpeg_binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| Error::EncoderSpawnFailed(e.to_string()))?;
        let pid = child
            .id()
            .ok_or_else(|| Error::EncoderSpawnFailed("child exited before its pid could be read".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::EncoderSpawnFailed("stderr was not piped".to_string()))?;

        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(false);

        {
            let mut state = self.state.lock();
            state.pid = Some(pid);
            state.cancel = cancel.clone();
            state.done_rx = Some(done_rx);
            state.position_seconds = config.start_offset_seconds;
        }
        *self.child.lock().await = Some(child);

        let reader_state = self.state.clone();
        let reader_cancel = cancel.clone();
        let start_offset = config.start_offset_seconds;
        let reader_task = tokio::spawn(read_progress_loop(stderr, reader_state, start_offset, reader_cancel));

        let ticker_state = self.state.clone();
        let ticker_callback = self.progress_callback.clone();
        let ticker_cancel = cancel.clone();
        let ticker_task = tokio::spawn(progress_ticker(ticker_state, ticker_callback, ticker_cancel));

        let child_slot = self.child.clone();
        let drain_cancel = cancel;
        let pid_for_log = pid;
        tokio::spawn(async move {
            {
                let mut guard = child_slot.lock().await;
                if let Some(child) = guard.as_mut() {
                    let _ = child.wait().await;
                }
            }
            let _ = reader_task.await;
            drain_cancel.cancel();
            let _ = ticker_task.await;
            info!(pid = pid_for_log, "encoder process and monitors have drained");
            let _ = done_tx.send(true);
        });

        Ok(())
    }

    /// Sends a graceful termination signal and schedules a `SIGKILL`
    /// escalation if the process has not exited within the configured grace
    /// period. Does not block on the outcome. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        let Some(pid) = self.pid() else {
            return Ok(());
        };

        send_signal(pid, "-TERM").await;

        let child = self.child.clone();
        let grace = self.shutdown_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if process_alive(pid) {
                warn!(pid, "encoder did not exit within grace period, sending SIGKILL");
                let mut guard = child.lock().await;
                if let Some(child) = guard.as_mut() {
                    let _ = child.start_kill();
                }
            }
        });

        Ok(())
    }

    /// Cancels in-flight work, force-terminating after a short (~100 ms)
    /// grace window if the process is still alive, then clears internal
    /// state so the driver is immediately ready for another `start`.
    pub async fn reset(&self) -> Result<()> {
        let (cancel, pid) = {
            let state = self.state.lock();
            (state.cancel.clone(), state.pid)
        };
        cancel.cancel();

        if let Some(pid) = pid {
            send_signal(pid, "-TERM").await;
            tokio::time::sleep(RESET_GRACE).await;
            if process_alive(pid) {
                let mut guard = self.child.lock().await;
                if let Some(child) = guard.as_mut() {
                    let _ = child.start_kill();
                }
            }
        }

        *self.child.lock().await = None;
        let mut state = self.state.lock();
        *state = DriverState::default();

        Ok(())
    }

    /// Resolves once the child has exited and its monitoring tasks have
    /// drained. Resolves immediately if nothing has ever been started.
    pub async fn done(&self) {
        let mut done_rx = {
            let state = self.state.lock();
            match &state.done_rx {
                Some(rx) => rx.clone(),
                None => return,
            }
        };

        if *done_rx.borrow() {
            return;
        }
        let _ = done_rx.changed().await;
    }
}

async fn read_progress_loop(
    stderr: tokio::process::ChildStderr,
    state: Arc<SyncMutex<DriverState>>,
    start_offset_seconds: f64,
    cancel: CancellationToken,
) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(parsed_seconds) = parse_progress_line(&line) {
                            state.lock().position_seconds = parsed_seconds + start_offset_seconds;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }
}

async fn progress_ticker(
    state: Arc<SyncMutex<DriverState>>,
    callback: Arc<SyncMutex<Option<ProgressCallback>>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let position = state.lock().position_seconds;
                if let Some(callback) = callback.lock().as_ref() {
                    callback(position);
                }
            }
        }
    }
}

/// Shells out to `kill` rather than calling `libc::kill` directly, keeping
/// this crate free of `unsafe` FFI for a single signal-send.
async fn send_signal(pid: u32, signal: &str) {
    let result = Command::new("kill").arg(signal).arg(pid.to_string()).status().await;
    if let Err(e) = result {
        warn!(pid, signal, error = %e, "failed to signal encoder process");
    }
}

#[must_use]
fn process_alive(pid: u32) -> bool {
    process_alive_at(Path::new("/proc"), pid)
}

fn process_alive_at(proc_root: &Path, pid: u32) -> bool {
    proc_root.join(pid.to_string()).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_alive_checks_given_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("1234")).unwrap();
        assert!(process_alive_at(dir.path(), 1234));
        assert!(!process_alive_at(dir.path(), 5678));
    }

    #[tokio::test]
    async fn pid_and_is_running_are_none_before_start() {
        let driver = EncoderDriver::new("ffmpeg", Duration::from_secs(5));
        assert_eq!(driver.pid(), None);
        assert!(!driver.is_running());
    }

    #[tokio::test]
    async fn done_resolves_immediately_when_never_started() {
        let driver = EncoderDriver::new("ffmpeg", Duration::from_secs(5));
        driver.done().await;
    }

    #[tokio::test]
    async fn reset_without_start_is_a_harmless_no_op() {
        let driver = EncoderDriver::new("ffmpeg", Duration::from_secs(5));
        driver.reset().await.unwrap();
        assert!(!driver.is_running());
    }
}
