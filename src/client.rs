//! Client contract and backend factory.

use serde_json::Value;

use crate::accessor::ConfigSource;
use crate::error::Result;
use crate::file::FileBackend;
use crate::listeners::ChangeListener;
use crate::options::{ClientOptions, Provider};
use crate::remote::RemoteBackend;

/// Operations every backend offers on top of raw lookups.
///
/// Typed getters come from [`crate::accessor::TypedAccessor`], which is implemented
/// for every [`ConfigSource`].
pub trait Client: ConfigSource + Send + Sync {
    /// Register the listener for `config`, replacing any previous one.
    fn add_change_listener(&self, config: &str, listener: ChangeListener) -> Result<()>;

    fn remove_change_listener(&self, config: &str) -> Result<()>;

    /// Names of the configs this client serves, sorted.
    fn config_names(&self) -> Vec<String>;

    /// Stop background refresh and drop all listeners. Calling it again is a no-op.
    ///
    /// Snapshots stay readable after close; they just no longer change.
    fn close(&self) -> Result<()>;
}

/// A client over whichever backend the options select.
#[derive(Debug)]
pub enum ConfigClient {
    File(FileBackend),
    Remote(RemoteBackend),
}

impl ConfigClient {
    /// Build the backend selected by `options` and load its configs.
    pub async fn new(options: ClientOptions) -> Result<Self> {
        let client = match options {
            ClientOptions::FileBased(options) => ConfigClient::File(FileBackend::new(options).await?),
            ClientOptions::RemoteManaged(options) => ConfigClient::Remote(RemoteBackend::new(options).await?),
        };
        tracing::info!(
            provider = ?client.provider(),
            configs = ?client.config_names(),
            "Config client started"
        );
        Ok(client)
    }

    pub fn provider(&self) -> Provider {
        match self {
            ConfigClient::File(_) => Provider::FileBased,
            ConfigClient::Remote(_) => Provider::RemoteManaged,
        }
    }

    fn backend(&self) -> &dyn Client {
        match self {
            ConfigClient::File(backend) => backend,
            ConfigClient::Remote(backend) => backend,
        }
    }
}

impl From<FileBackend> for ConfigClient {
    fn from(backend: FileBackend) -> Self {
        ConfigClient::File(backend)
    }
}

impl From<RemoteBackend> for ConfigClient {
    fn from(backend: RemoteBackend) -> Self {
        ConfigClient::Remote(backend)
    }
}

impl ConfigSource for ConfigClient {
    fn get(&self, config: &str, key: &str) -> Result<Value> {
        self.backend().get(config, key)
    }
}

impl Client for ConfigClient {
    fn add_change_listener(&self, config: &str, listener: ChangeListener) -> Result<()> {
        self.backend().add_change_listener(config, listener)
    }

    fn remove_change_listener(&self, config: &str) -> Result<()> {
        self.backend().remove_change_listener(config)
    }

    fn config_names(&self) -> Vec<String> {
        self.backend().config_names()
    }

    fn close(&self) -> Result<()> {
        self.backend().close()
    }
}
