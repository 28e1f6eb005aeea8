//! File-change watcher for the project document
//!
//! Polls the file's size and modification time. A change is reported only
//! after the new fingerprint has held for a number of consecutive polls, so a
//! write in progress never triggers a reload. Registration takes a baseline
//! and does not fire.

use crate::engine::ProjectParser;
use crate::loader::ProjectLoader;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A settled change to the watched file.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    size: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn read(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

pub struct ProjectWatcher {
    path: PathBuf,
    poll_interval: Duration,
    stable_polls: u32,
    /// Fingerprint of the last reported state (or the baseline)
    reported: Option<Fingerprint>,
    /// Candidate fingerprint and how many polls it has held
    pending: Option<(Fingerprint, u32)>,
}

impl ProjectWatcher {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration, stable_polls: u32) -> Self {
        let path = path.into();
        let reported = Fingerprint::read(&path);
        Self {
            path,
            poll_interval,
            stable_polls: stable_polls.max(1),
            reported,
            pending: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One poll step. Returns a change once a new fingerprint has settled.
    pub fn poll(&mut self) -> Option<FileChange> {
        // Missing file: mid atomic save, or deleted. Wait for it to come back.
        let Some(current) = Fingerprint::read(&self.path) else {
            self.pending = None;
            return None;
        };

        if self.reported == Some(current) {
            self.pending = None;
            return None;
        }

        let held = match self.pending {
            Some((candidate, held)) if candidate == current => held + 1,
            _ => {
                debug!(
                    "{} changed ({} bytes), waiting for write to settle",
                    self.path.display(),
                    current.size
                );
                self.pending = Some((current, 0));
                return None;
            }
        };
        if held < self.stable_polls {
            self.pending = Some((current, held));
            return None;
        }

        self.pending = None;
        self.reported = Some(current);
        Some(FileChange {
            path: self.path.clone(),
            size: current.size,
            modified: current.modified,
        })
    }

    /// Run the poll loop, sending settled changes to the channel.
    pub async fn run(mut self, tx: mpsc::Sender<FileChange>, cancel: CancellationToken) {
        info!("ProjectWatcher started on {}", self.path.display());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("ProjectWatcher cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            if let Some(change) = self.poll() {
                if tx.send(change).await.is_err() {
                    info!("ProjectWatcher channel closed, shutting down");
                    return;
                }
            }
        }
    }
}

/// Owns the background watch. Dropping it stops watching; call
/// [`detach`](Self::detach) to leave the watch running for the rest of the
/// process instead.
#[must_use = "dropping the handle stops the watch; call detach() to keep it running"]
pub struct WatchHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// A handle with nothing running behind it (watching disabled).
    pub fn inactive() -> Self {
        Self {
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Let the reload loop run until the runtime shuts down.
    pub fn detach(mut self) {
        // The loop listens on the original token; Drop cancels this fresh one.
        self.cancel = CancellationToken::new();
        self.task.take();
    }

    /// Cancel and wait for the reload loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start the watcher and reload the project on every settled change.
pub fn spawn_reload_loop<P>(loader: ProjectLoader<P>, watcher: ProjectWatcher) -> WatchHandle
where
    P: ProjectParser + ?Sized + 'static,
{
    let cancel = CancellationToken::new();
    let (change_tx, mut change_rx) = mpsc::channel::<FileChange>(16);

    let watch_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        tokio::spawn(watcher.run(change_tx, watch_cancel.clone()));

        loop {
            let change = tokio::select! {
                _ = watch_cancel.cancelled() => break,
                change = change_rx.recv() => match change {
                    Some(c) => c,
                    None => break,
                },
            };
            info!("Project file changed ({} bytes), reloading...", change.size);
            // Failures are logged inside and keep the previous project.
            let _ = loader.reload().await;
        }
    });

    WatchHandle {
        cancel,
        task: Some(task),
    }
}
