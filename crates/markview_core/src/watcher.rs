//! Background watching of the displayed file.
//!
//! One named OS thread owns the watch loop. It resolves the converter once,
//! then converts the file whenever its modification time differs from the one
//! seen last, and hands every outcome to the viewer through an unbounded
//! channel. Change notifications come from the native file system watcher
//! when it can be started, polling covers the rest.

use crate::document::Format;
use crate::resolver::Resolver;
use markview_config::Settings;
use notify::{Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::UnboundedSender;

/// Native events arriving within this window are coalesced.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("can not watch {0}: not a file path")]
    InvalidPath(PathBuf),
    #[error("failed to spawn the watcher thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Outcome of one watch cycle, sent to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The file was converted.
    Rendered { html: String },
    /// The converter failed, the file keeps being watched.
    Failed { message: String },
    /// The file can not be read, usually because it was deleted.
    Missing { message: String },
    /// No converter is usable for the format, nothing is watched.
    Unavailable { format: Format },
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Interval of the polling fallback.
    pub poll_interval: Duration,
    /// Try the native file system watcher before polling.
    pub use_native: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            use_native: true,
        }
    }
}

impl WatcherConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Observation {
    Changed,
    Unchanged,
    Missing(String),
}

/// Remembers the last seen modification time.
#[derive(Debug, Default)]
struct ChangeTracker {
    last: Option<SystemTime>,
    reported_missing: bool,
}

impl ChangeTracker {
    fn observe(&mut self, modified: std::io::Result<SystemTime>) -> Observation {
        match modified {
            Ok(mtime) => {
                self.reported_missing = false;
                if self.last == Some(mtime) {
                    Observation::Unchanged
                } else {
                    self.last = Some(mtime);
                    Observation::Changed
                }
            }
            Err(err) => {
                // A reappearing file must be converted again.
                self.last = None;
                if self.reported_missing {
                    Observation::Unchanged
                } else {
                    self.reported_missing = true;
                    Observation::Missing(err.to_string())
                }
            }
        }
    }
}

/// Source of wake-ups for the watch loop.
enum ChangeSignal {
    Native {
        // Dropping the watcher stops the notifications.
        _watcher: RecommendedWatcher,
        events: mpsc::Receiver<()>,
        timeout: Duration,
    },
    Polling(Duration),
}

impl ChangeSignal {
    fn new(path: &Path, config: &WatcherConfig) -> Self {
        if config.use_native {
            match Self::native(path, config.poll_interval) {
                Ok(signal) => {
                    tracing::info!(path = %path.display(), "Started native file watcher");
                    return signal;
                }
                Err(err) => {
                    tracing::warn!(
                        ?err,
                        path = %path.display(),
                        "Native file watcher failed, falling back to polling"
                    );
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "Started polling file watcher"
        );
        Self::Polling(config.poll_interval)
    }

    fn native(path: &Path, timeout: Duration) -> notify::Result<Self> {
        let (watch_target, file_name) = parent_and_name(path)
            .ok_or_else(|| notify::Error::generic("file path has no parent directory"))?;

        let (tx, events) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => {
                    // Editors often write through a rename, watch the
                    // directory and filter by name.
                    let is_target_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));

                    if is_target_file
                        && (event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove())
                    {
                        let _ = tx.send(());
                    }
                }
                Err(err) => tracing::error!(?err, "File watcher error"),
            },
            notify::Config::default(),
        )?;

        watcher.watch(&watch_target, RecursiveMode::NonRecursive)?;

        Ok(Self::Native {
            _watcher: watcher,
            events,
            timeout,
        })
    }

    /// Blocks until the file may have changed.
    ///
    /// The native watcher also wakes up after `timeout` so that missed events
    /// are caught by the modification time check.
    fn wait(&mut self) {
        match self {
            Self::Native {
                events, timeout, ..
            } => match events.recv_timeout(*timeout) {
                Ok(()) => {
                    std::thread::sleep(DEBOUNCE_DELAY);
                    while events.try_recv().is_ok() {}
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Native file watcher stopped, falling back to polling");
                    *self = Self::Polling(*timeout);
                }
            },
            Self::Polling(interval) => std::thread::sleep(*interval),
        }
    }
}

fn parent_and_name(path: &Path) -> Option<(PathBuf, OsString)> {
    let file_name = path.file_name()?.to_os_string();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((parent, file_name))
}

/// Handle of a running watcher thread.
#[derive(Debug)]
pub struct WatchHandle {
    path: PathBuf,
    thread: JoinHandle<()>,
}

impl WatchHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the watcher thread to exit.
    pub fn join(self) {
        if self.thread.join().is_err() {
            tracing::error!(path = %self.path.display(), "File watcher thread panicked");
        }
    }
}

pub struct FileWatcher;

impl FileWatcher {
    /// Starts watching `path` on a dedicated thread.
    ///
    /// The thread exits on its own when no converter is available or once
    /// the receiving end of `tx` is dropped.
    pub fn spawn(
        path: PathBuf,
        resolver: Arc<Resolver>,
        config: WatcherConfig,
        tx: UnboundedSender<Delivery>,
    ) -> Result<WatchHandle, WatchError> {
        if path.file_name().is_none() {
            return Err(WatchError::InvalidPath(path));
        }

        let thread = std::thread::Builder::new()
            .name("file-watcher".into())
            .spawn({
                let path = path.clone();
                move || run(&path, &resolver, &config, &tx)
            })?;

        Ok(WatchHandle { path, thread })
    }
}

fn run(path: &Path, resolver: &Resolver, config: &WatcherConfig, tx: &UnboundedSender<Delivery>) {
    let converter = resolver.resolve(path);

    if !converter.is_available() {
        let _ = tx.send(Delivery::Unavailable {
            format: converter.format,
        });
        return;
    }

    let mut signal = ChangeSignal::new(path, config);
    let mut tracker = ChangeTracker::default();

    while !tx.is_closed() {
        let modified = std::fs::metadata(path).and_then(|metadata| metadata.modified());

        let delivery = match tracker.observe(modified) {
            Observation::Unchanged => None,
            Observation::Missing(message) => {
                tracing::warn!(path = %path.display(), %message, "Watched file is missing");
                Some(Delivery::Missing { message })
            }
            Observation::Changed => {
                let started = std::time::Instant::now();
                match converter.convert_file(path) {
                    Ok(html) => {
                        tracing::debug!(
                            path = %path.display(),
                            format = %converter.format,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Converted file"
                        );
                        Some(Delivery::Rendered { html })
                    }
                    Err(err) => {
                        tracing::error!(?err, path = %path.display(), "Failed to convert file");
                        Some(Delivery::Failed {
                            message: err.to_string(),
                        })
                    }
                }
            }
        };

        if let Some(delivery) = delivery {
            if tx.send(delivery).is_err() {
                break;
            }
        }

        signal.wait();
    }

    tracing::debug!(path = %path.display(), "File watcher exited");
}
