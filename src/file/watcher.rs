//! Directory watcher feeding per-config reload channels.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Watches a configs directory and signals the channel of every routed file touched.
///
/// The directory is watched rather than each file so that a document replaced by
/// rename (editors, deploy tools) keeps being observed.
pub struct DirectoryWatcher {
    dir: PathBuf,
    routes: HashMap<OsString, mpsc::UnboundedSender<()>>,
}

impl DirectoryWatcher {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            routes: HashMap::new(),
        }
    }

    /// Route events for `file_name` to the returned receiver.
    pub fn route(&mut self, file_name: OsString) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.insert(file_name, tx);
        rx
    }

    /// Start watching. Events stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let routes = self.routes;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !is_content_event(&event.kind) {
                        return;
                    }
                    for path in &event.paths {
                        let Some(name) = path.file_name() else { continue };
                        if let Some(tx) = routes.get(name) {
                            tracing::debug!(path = %path.display(), kind = ?event.kind, "Config file event");
                            let _ = tx.send(());
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %self.dir.display(), "Config directory watcher started");
        Ok(watcher)
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => true,
        _ => false,
    }
}
