//! Client option definitions.
//!
//! All types derive Serde traits so options can be read from a TOML file as well as
//! built in code.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::ConfigType;

/// Check intervals at or below this are raised to [`DEFAULT_CHECK_INTERVAL`].
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Poll interval used when none (or a too short one) is configured.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Longest accepted check interval. The service rejects longer minimum poll intervals.
pub const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Which backend a client is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    FileBased,
    RemoteManaged,
}

/// Construction options for a configuration client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ClientOptions {
    FileBased(FileOptions),
    RemoteManaged(RemoteOptions),
}

impl ClientOptions {
    pub fn provider(&self) -> Provider {
        match self {
            ClientOptions::FileBased(_) => Provider::FileBased,
            ClientOptions::RemoteManaged(_) => Provider::RemoteManaged,
        }
    }
}

/// Options for the file based backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileOptions {
    /// Directory holding one document per config name.
    pub configs_directory: PathBuf,

    /// Names of the configs to load (file stem of each document).
    pub config_names: Vec<String>,

    /// Document format.
    pub config_type: ConfigType,

    /// Quiet period after a file event before the file is re-read.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    100
}

impl FileOptions {
    pub fn new<I, S>(configs_directory: impl Into<PathBuf>, config_names: I, config_type: ConfigType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configs_directory: configs_directory.into(),
            config_names: config_names.into_iter().map(Into::into).collect(),
            config_type,
            debounce_ms: default_debounce_ms(),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = debounce.as_millis() as u64;
        self
    }
}

/// Options for the remote managed backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteOptions {
    /// Identifier of this client, used in logs and metrics.
    pub id: String,

    /// Region of the remote service.
    pub region: String,

    /// How credentials are obtained.
    #[serde(default)]
    pub credentials: CredentialsOptions,

    /// Application identifier on the remote service.
    pub app: String,

    /// Environment identifier on the remote service.
    pub env: String,

    /// Format of the documents served.
    pub config_type: ConfigType,

    /// Configuration profiles to load.
    pub config_names: Vec<String>,

    /// Poll interval in seconds. Values at or below 15 use the default of 60; values
    /// above one day are rejected.
    #[serde(default)]
    pub check_interval_secs: u64,

    /// Endpoint override (default: `https://appconfigdata.<region>.amazonaws.com`).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// HTTP client tuning.
    #[serde(default)]
    pub http: HttpClientOptions,

    /// What a polling task does when a fetch fails.
    #[serde(default)]
    pub on_poll_error: PollErrorPolicy,
}

impl RemoteOptions {
    pub fn new<I, S>(
        id: impl Into<String>,
        region: impl Into<String>,
        app: impl Into<String>,
        env: impl Into<String>,
        config_type: ConfigType,
        config_names: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            region: region.into(),
            credentials: CredentialsOptions::default(),
            app: app.into(),
            env: env.into(),
            config_type,
            config_names: config_names.into_iter().map(Into::into).collect(),
            check_interval_secs: 0,
            endpoint: None,
            http: HttpClientOptions::default(),
            on_poll_error: PollErrorPolicy::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: CredentialsOptions) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_secs = interval.as_secs();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_poll_error_policy(mut self, policy: PollErrorPolicy) -> Self {
        self.on_poll_error = policy;
        self
    }

    /// Poll interval after applying the floor.
    pub fn check_interval(&self) -> Duration {
        let interval = Duration::from_secs(self.check_interval_secs);
        if interval <= MIN_CHECK_INTERVAL {
            DEFAULT_CHECK_INTERVAL
        } else {
            interval
        }
    }

    /// Service endpoint after applying the region default.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://appconfigdata.{}.amazonaws.com", self.region),
        }
    }
}

/// Credential source for the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CredentialsOptions {
    /// Explicit key pair.
    Static {
        access_key_id: String,
        secret_key: String,
        #[serde(default)]
        session_token: Option<String>,
    },
    /// The SDK's default provider chain, optionally pinned to a named profile.
    Shared {
        #[serde(default)]
        profile: Option<String>,
    },
}

impl Default for CredentialsOptions {
    fn default() -> Self {
        CredentialsOptions::Shared { profile: None }
    }
}

/// Timeouts and retry budget of the SDK's HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpClientOptions {
    /// Connection establishment timeout, TLS handshake included.
    pub connect_timeout_secs: u64,

    /// Longest wait for the first response byte once a request is sent.
    pub read_timeout_secs: u64,

    /// Overall deadline for one call, SDK retries included.
    pub timeout_secs: u64,

    /// Attempts per call before the error reaches the poller.
    pub max_attempts: u32,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
            timeout_secs: 15,
            max_attempts: 3,
        }
    }
}

/// Behavior of a remote polling task after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PollErrorPolicy {
    /// Stop refreshing the config; its last snapshot stays in place.
    Stop,
    /// Retry with exponential backoff, opening a new session after `reopen_after`
    /// consecutive failures.
    Retry {
        base_delay_ms: u64,
        max_delay_ms: u64,
        reopen_after: u32,
    },
}

impl Default for PollErrorPolicy {
    fn default() -> Self {
        PollErrorPolicy::Retry {
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            reopen_after: 3,
        }
    }
}
