//! File system watcher for the SFX source directory
//!
//! Broadcasts the path of every `.wav` file that is created, modified or
//! removed so the owner can reload the track library.

use crate::domain::config::Result;
use crate::domain::library::is_eligible;
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{error, info};

/// Watches a source directory for track changes
pub struct DirectoryWatcher {
    _watcher: notify::RecommendedWatcher,
    change_tx: broadcast::Sender<PathBuf>,
    dir: PathBuf,
}

impl DirectoryWatcher {
    /// Start watching `dir`, creating it if it doesn't exist
    pub fn new(dir: PathBuf) -> Result<Self> {
        let (change_tx, _change_rx) = broadcast::channel(32);

        std::fs::create_dir_all(&dir)?;

        let tx_clone = change_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!(error = %e, "SFX directory watch error");
                    return;
                }
            };

            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }

            for path in event.paths.into_iter().filter(|p| is_eligible(p)) {
                // No receivers just means nobody is listening yet
                let _ = tx_clone.send(path);
            }
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        info!(path = %dir.display(), "SFX directory watcher started");

        Ok(Self {
            _watcher: watcher,
            change_tx,
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Subscribe to track change events
    pub fn subscribe(&self) -> broadcast::Receiver<PathBuf> {
        self.change_tx.subscribe()
    }
}
