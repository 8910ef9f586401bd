//! Change listener registry.

use std::sync::Arc;

use dashmap::DashMap;

use crate::store::Snapshot;

/// Notification delivered to a listener after a config refresh.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Name of the config that changed.
    pub config: String,
    /// Snapshot current after the refresh.
    pub snapshot: Snapshot,
    /// `false` when the new content could not be parsed and the previous snapshot
    /// was kept.
    pub reloaded: bool,
}

/// Callback invoked after a config refresh.
pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// At most one listener per config name.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: DashMap<String, ChangeListener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `config`, replacing any previous one.
    pub fn insert(&self, config: &str, listener: ChangeListener) {
        self.inner.insert(config.to_string(), listener);
    }

    pub fn remove(&self, config: &str) {
        self.inner.remove(config);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Invoke the listener registered for `event.config`, if any.
    ///
    /// The registry shard is released before the call, so a listener may register or
    /// remove listeners itself.
    pub fn notify(&self, event: &ChangeEvent) -> bool {
        let listener = self.inner.get(&event.config).map(|l| Arc::clone(l.value()));
        match listener {
            Some(listener) => {
                listener(event);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("configs", &self.inner.iter().map(|e| e.key().clone()).collect::<Vec<_>>())
            .finish()
    }
}
