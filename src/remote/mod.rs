//! Remote managed backend.
//!
//! # Data Flow
//! ```text
//! for each config name (sequential):
//!     start_session → fetch_latest(initial token) → parse → store snapshot + token
//!     → spawn poller
//! poller, every check interval:
//!     fetch_latest(token) → next token
//!         empty payload     → unchanged
//!         parse failure     → revision discarded
//!         parsed            → swap snapshot → listener notified
//! ```
//!
//! # Design Decisions
//! - A config that cannot be opened at startup is skipped, not fatal; it is logged and
//!   counted, and lookups on it report `ConfigNotAdded`
//! - Fetch failures after startup follow [`crate::options::PollErrorPolicy`]
//! - Close broadcasts to every poller and does not wait for them

mod poller;
pub mod service;

use std::sync::Arc;

use serde_json::Value;

use crate::accessor::ConfigSource;
use crate::client::Client;
use crate::error::{ConfigError, Result};
use crate::lifecycle::Shutdown;
use crate::listeners::ChangeListener;
use crate::observability::metrics;
use crate::options::validation::validate_remote_options;
use crate::options::RemoteOptions;
use crate::store::{ConfigCell, ConfigStore};

use self::poller::Poller;
use self::service::{ConfigDataService, HttpConfigDataService, SessionRequest};

/// Serves configs from a remote configuration service, polling for changes.
pub struct RemoteBackend {
    options: RemoteOptions,
    store: ConfigStore,
    shutdown: Shutdown,
}

impl RemoteBackend {
    /// Connect to the AppConfig Data API described by `options`.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(options: RemoteOptions) -> Result<Self> {
        validate_remote_options(&options).map_err(ConfigError::InvalidOptions)?;
        let service = HttpConfigDataService::new(&options).await;
        tracing::debug!(client = %options.id, endpoint = %options.endpoint_url(), "Remote config service ready");
        Ok(Self::start(options, Arc::new(service)).await)
    }

    /// Like [`RemoteBackend::new`] but against any [`ConfigDataService`].
    pub async fn with_service(options: RemoteOptions, service: Arc<dyn ConfigDataService>) -> Result<Self> {
        validate_remote_options(&options).map_err(ConfigError::InvalidOptions)?;
        Ok(Self::start(options, service).await)
    }

    async fn start(options: RemoteOptions, service: Arc<dyn ConfigDataService>) -> Self {
        let mut store = ConfigStore::new();
        let shutdown = Shutdown::new();
        let interval = options.check_interval();

        for name in &options.config_names {
            let session = SessionRequest::new(&options, name);
            let (cell, token) = match open_config(service.as_ref(), &options, &session).await {
                Ok(opened) => opened,
                Err(e) => {
                    tracing::warn!(
                        client = %options.id,
                        config = %name,
                        error = %e,
                        "Skipping config that could not be loaded"
                    );
                    metrics::record_startup_failure(name);
                    continue;
                }
            };
            store.insert(Arc::clone(&cell));
            tracing::info!(client = %options.id, config = %name, "Config loaded");

            let poller = Poller {
                cell,
                token,
                session,
                service: Arc::clone(&service),
                config_type: options.config_type,
                interval,
                policy: options.on_poll_error,
                listeners: Arc::clone(store.listeners()),
                client_id: options.id.clone(),
            };
            tokio::spawn(poller.run(shutdown.subscribe()));
        }

        if store.names().is_empty() {
            tracing::warn!(client = %options.id, "No remote config could be loaded");
        }

        Self {
            options,
            store,
            shutdown,
        }
    }

    pub fn options(&self) -> &RemoteOptions {
        &self.options
    }

    /// Number of polling tasks that have not exited yet.
    pub fn active_pollers(&self) -> usize {
        self.shutdown.receiver_count()
    }
}

/// Open a session for one config and load its first snapshot.
async fn open_config(
    service: &dyn ConfigDataService,
    options: &RemoteOptions,
    session: &SessionRequest,
) -> Result<(Arc<ConfigCell>, String)> {
    let initial = service.start_session(session).await?;
    let fetched = service.fetch_latest(&initial).await?;
    let data = options.config_type.parse(&fetched.payload)?;
    let cell = Arc::new(ConfigCell::new(session.configuration_profile_identifier.clone(), data));
    Ok((cell, fetched.next_token))
}

impl ConfigSource for RemoteBackend {
    fn get(&self, config: &str, key: &str) -> Result<Value> {
        self.store.get(config, key)
    }
}

impl Client for RemoteBackend {
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
            tracing::info!(client = %self.options.id, "Remote config backend closed");
        }
        self.store.listeners().clear();
        Ok(())
    }
}

impl Drop for RemoteBackend {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("id", &self.options.id)
            .field("configs", &self.store.names())
            .field("on_poll_error", &self.options.on_poll_error)
            .finish()
    }
}
