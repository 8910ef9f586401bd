//! Per-config snapshot cells and the name -> cell map shared by both backends.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};
use crate::listeners::{ChangeEvent, ChangeListener, ListenerRegistry};
use crate::resolver::resolve;

/// Parsed content of a config at a point in time.
pub type Snapshot = Arc<Value>;

/// One independently refreshed unit of configuration.
///
/// Readers load the current snapshot without blocking the refresh path; a refresh
/// publishes a whole new snapshot, so a reader sees either the old or the new tree,
/// never a mix.
#[derive(Debug)]
pub struct ConfigCell {
    name: String,
    current: ArcSwap<Value>,
}

impl ConfigCell {
    pub fn new(name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            current: ArcSwap::from_pointee(Value::Object(data)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.current.load_full()
    }

    /// Publish `data` as the new snapshot and return it.
    pub fn replace(&self, data: Map<String, Value>) -> Snapshot {
        let snapshot = Arc::new(Value::Object(data));
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Resolve `key` against the current snapshot.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let guard = self.current.load();
        resolve(&guard, key).cloned()
    }
}

/// Config cells and listeners of one client instance.
///
/// The set of names is fixed once the backend is constructed.
#[derive(Debug, Default)]
pub struct ConfigStore {
    cells: HashMap<String, Arc<ConfigCell>>,
    listeners: Arc<ListenerRegistry>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, cell: Arc<ConfigCell>) {
        self.cells.insert(cell.name().to_string(), cell);
    }

    pub fn cell(&self, config: &str) -> Option<&Arc<ConfigCell>> {
        self.cells.get(config)
    }

    pub fn contains(&self, config: &str) -> bool {
        self.cells.contains_key(config)
    }

    /// Names of the configs served, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cells.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn get(&self, config: &str, key: &str) -> Result<Value> {
        let cell = self
            .cells
            .get(config)
            .ok_or_else(|| ConfigError::ConfigNotAdded(config.to_string()))?;
        cell.lookup(key).ok_or_else(|| ConfigError::KeyNotFound {
            config: config.to_string(),
            key: key.to_string(),
        })
    }

    pub fn add_listener(&self, config: &str, listener: ChangeListener) -> Result<()> {
        if !self.contains(config) {
            return Err(ConfigError::ConfigNotAdded(config.to_string()));
        }
        self.listeners.insert(config, listener);
        Ok(())
    }

    pub fn remove_listener(&self, config: &str) -> Result<()> {
        if !self.contains(config) {
            return Err(ConfigError::ConfigNotAdded(config.to_string()));
        }
        self.listeners.remove(config);
        Ok(())
    }
}

/// Notify the listener of `cell`'s config about `snapshot`.
pub(crate) fn notify(
    listeners: &ListenerRegistry,
    cell: &ConfigCell,
    snapshot: Snapshot,
    reloaded: bool,
) -> bool {
    listeners.notify(&ChangeEvent {
        config: cell.name().to_string(),
        snapshot,
        reloaded,
    })
}
