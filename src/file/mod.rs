//! File based backend.
//!
//! # Data Flow
//! ```text
//! <configs_directory>/<name>.<ext>
//!     → watcher.rs (directory events routed by file name, started first)
//!     → initial load (every file must exist and parse)
//!     → one reload task per config: debounce → re-read → parse → swap snapshot
//!     → listener notified
//! ```
//!
//! # Design Decisions
//! - No partial success at startup: one bad file aborts construction
//! - A document that fails to parse after a change keeps the previous snapshot; the
//!   listener is still told about the attempt
//! - A missing file after a change also keeps the previous snapshot, silently

pub mod watcher;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::RecommendedWatcher;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};

use crate::accessor::ConfigSource;
use crate::client::Client;
use crate::error::{ConfigError, Result};
use crate::format::ConfigType;
use crate::lifecycle::Shutdown;
use crate::listeners::{ChangeListener, ListenerRegistry};
use crate::observability::metrics;
use crate::options::validation::validate_file_options;
use crate::options::FileOptions;
use crate::store::{self, ConfigCell, ConfigStore};

use self::watcher::DirectoryWatcher;

/// Serves configs from documents in one directory, reloading them on change.
pub struct FileBackend {
    options: FileOptions,
    store: ConfigStore,
    shutdown: Shutdown,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileBackend {
    /// Load every configured document and start watching them.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(options: FileOptions) -> Result<Self> {
        validate_file_options(&options).map_err(ConfigError::InvalidOptions)?;

        let mut dir_watcher = DirectoryWatcher::new(&options.configs_directory);
        let mut routed = Vec::with_capacity(options.config_names.len());
        for name in &options.config_names {
            let path = resolve_path(&options.configs_directory, name, options.config_type).await?;
            let file_name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
            let events = dir_watcher.route(file_name);
            routed.push((name, path, events));
        }

        // running before the initial reads: writes made while loading still reach the reloaders
        let watcher = dir_watcher.run()?;

        let mut store = ConfigStore::new();
        let mut reloaders = Vec::with_capacity(routed.len());
        for (name, path, events) in routed {
            let data = load_document(&path, options.config_type).await?;
            let cell = Arc::new(ConfigCell::new(name.clone(), data));
            store.insert(Arc::clone(&cell));
            tracing::info!(config = %name, path = %path.display(), "Config loaded");

            reloaders.push(Reloader {
                cell,
                events,
                path,
                config_type: options.config_type,
                debounce: Duration::from_millis(options.debounce_ms),
                listeners: Arc::clone(store.listeners()),
            });
        }

        let shutdown = Shutdown::new();
        for reloader in reloaders {
            tokio::spawn(reloader.run(shutdown.subscribe()));
        }

        Ok(Self {
            options,
            store,
            shutdown,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    pub fn options(&self) -> &FileOptions {
        &self.options
    }
}

impl ConfigSource for FileBackend {
    fn get(&self, config: &str, key: &str) -> Result<Value> {
        self.store.get(config, key)
    }
}

impl Client for FileBackend {
    fn add_change_listener(&self, config: &str, listener: ChangeListener) -> Result<()> {
        self.store.add_listener(config, listener)
    }

    fn remove_change_listener(&self, config: &str) -> Result<()> {
        self.store.remove_listener(config)
    }

    fn config_names(&self) -> Vec<String> {
        self.store.names()
    }

    fn close(&self) -> Result<()> {
        if self.shutdown.trigger() {
            tracing::info!(dir = %self.options.configs_directory.display(), "File config backend closed");
        }
        self.watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        self.store.listeners().clear();
        Ok(())
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("configs_directory", &self.options.configs_directory)
            .field("configs", &self.store.names())
            .finish()
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// First existing candidate file for `name`.
async fn resolve_path(dir: &Path, name: &str, config_type: ConfigType) -> Result<PathBuf> {
    let mut first_error = None;
    for candidate in config_type.candidate_files(name) {
        let path = dir.join(candidate);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => return Ok(path),
            Ok(_) => {
                first_error.get_or_insert_with(|| ConfigError::Io {
                    path: path.clone(),
                    source: std::io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
                });
            }
            Err(source) => {
                first_error.get_or_insert(ConfigError::Io { path, source });
            }
        }
    }
    Err(first_error.unwrap_or_else(|| ConfigError::Io {
        path: dir.join(name),
        source: ErrorKind::NotFound.into(),
    }))
}

async fn load_document(path: &Path, config_type: ConfigType) -> Result<Map<String, Value>> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    config_type.parse(&bytes)
}

/// Reload task for one config file.
struct Reloader {
    cell: Arc<ConfigCell>,
    events: mpsc::UnboundedReceiver<()>,
    path: PathBuf,
    config_type: ConfigType,
    debounce: Duration,
    listeners: Arc<ListenerRegistry>,
}

impl Reloader {
    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                event = self.events.recv() => {
                    if event.is_none() {
                        break;
                    }
                }
                _ = shutdown.recv() => break,
            }

            // let a burst of events from one save settle before reading
            tokio::select! {
                _ = tokio::time::sleep(self.debounce) => {}
                _ = shutdown.recv() => break,
            }
            while self.events.try_recv().is_ok() {}

            self.reload().await;
        }
        tracing::debug!(config = %self.cell.name(), "File reloader stopped");
    }

    async fn reload(&self) {
        let name = self.cell.name();
        match load_document(&self.path, self.config_type).await {
            Ok(data) => {
                let snapshot = self.cell.replace(data);
                tracing::info!(config = %name, path = %self.path.display(), "Config reloaded");
                metrics::record_reload(name, "file", metrics::OUTCOME_APPLIED);
                store::notify(&self.listeners, &self.cell, snapshot, true);
            }
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    config = %name,
                    path = %self.path.display(),
                    "Config file missing after change, keeping last known good"
                );
            }
            Err(e) => {
                tracing::warn!(
                    config = %name,
                    error = %e,
                    "Failed to reload config, keeping current snapshot"
                );
                metrics::record_reload(name, "file", metrics::OUTCOME_REJECTED);
                store::notify(&self.listeners, &self.cell, self.cell.snapshot(), false);
            }
        }
    }
}
