//! Dynamic configuration client.
//!
//! Configuration is organized in named configs, each served by one backend: documents in
//! a local directory ([`file`]) or profiles on a remote configuration service
//! ([`remote`]). Backends keep every config fresh in the background and publish each
//! refresh as a whole new snapshot, so reads never block and never see half an update.
//!
//! ```no_run
//! use dynconf::{ClientOptions, ConfigClient, ConfigType, FileOptions, TypedAccessor};
//!
//! # async fn run() -> dynconf::Result<()> {
//! let options = FileOptions::new("/etc/myapp", ["app"], ConfigType::Yaml);
//! let client = ConfigClient::new(ClientOptions::FileBased(options)).await?;
//! let level = client.get_string_d("app", "log.level", "info".into());
//! # let _ = level;
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod client;
pub mod env;
pub mod error;
pub mod file;
pub mod format;
pub mod lifecycle;
pub mod listeners;
pub mod observability;
pub mod options;
pub mod remote;
pub mod resilience;
pub mod resolver;
pub mod store;

pub use accessor::{ConfigSource, FromConfigValue, TypedAccessor};
pub use client::{Client, ConfigClient};
pub use error::{ConfigError, Result};
pub use file::FileBackend;
pub use format::ConfigType;
pub use listeners::{ChangeEvent, ChangeListener};
pub use options::{
    load_options, ClientOptions, CredentialsOptions, FileOptions, HttpClientOptions, PollErrorPolicy,
    Provider, RemoteOptions,
};
pub use remote::RemoteBackend;
pub use store::Snapshot;
