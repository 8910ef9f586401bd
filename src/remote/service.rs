//! Remote configuration data service.
//!
//! The backend only needs two calls: open a session for one configuration profile, then
//! fetch the latest payload for a continuation token. [`HttpConfigDataService`] makes them
//! through the AppConfig Data SDK client; tests plug in their own implementation.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_appconfigdata::error::{DisplayErrorContext, SdkError};
use aws_sdk_appconfigdata::Client;

use crate::error::{ConfigError, Result};
use crate::options::{CredentialsOptions, HttpClientOptions, RemoteOptions};

const CREDENTIALS_PROVIDER_NAME: &str = "dynconf-static";

/// Parameters of a session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub application_identifier: String,
    pub environment_identifier: String,
    pub configuration_profile_identifier: String,
    pub required_minimum_poll_interval_in_seconds: i32,
}

impl SessionRequest {
    pub fn new(options: &RemoteOptions, config_name: &str) -> Self {
        Self {
            application_identifier: options.app.clone(),
            environment_identifier: options.env.clone(),
            configuration_profile_identifier: config_name.to_string(),
            required_minimum_poll_interval_in_seconds: i32::try_from(options.check_interval().as_secs())
                .unwrap_or(i32::MAX),
        }
    }
}

/// Result of one fetch. An empty payload means "unchanged since the token was issued".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub next_token: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait ConfigDataService: Send + Sync {
    /// Open a session and return its initial token.
    async fn start_session(&self, request: &SessionRequest) -> Result<String>;

    /// Fetch the configuration for `token`.
    async fn fetch_latest(&self, token: &str) -> Result<FetchResult>;
}

/// AppConfig Data API client.
#[derive(Debug, Clone)]
pub struct HttpConfigDataService {
    inner_client: Client,
}

impl HttpConfigDataService {
    /// Build the SDK client for `options`.
    ///
    /// Credentials are not resolved here. In shared mode the SDK's default provider chain
    /// (environment, profile files, web identity, SSO, container and instance metadata)
    /// is consulted on the first request.
    pub async fn new(options: &RemoteOptions) -> Self {
        let sdk_config = sdk_config(options).await;
        Self {
            inner_client: Client::new(&sdk_config),
        }
    }
}

pub(crate) async fn sdk_config(options: &RemoteOptions) -> SdkConfig {
    let mut loader = aws_config::from_env()
        .region(Region::new(options.region.clone()))
        .timeout_config(timeout_config(&options.http))
        .retry_config(RetryConfig::standard().with_max_attempts(options.http.max_attempts));

    match &options.credentials {
        CredentialsOptions::Static {
            access_key_id,
            secret_key,
            session_token,
        } => {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_key.clone(),
                session_token.clone(),
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }
        CredentialsOptions::Shared { profile: Some(profile) } => {
            loader = loader.profile_name(profile.clone());
        }
        CredentialsOptions::Shared { profile: None } => {}
    }

    if let Some(endpoint) = &options.endpoint {
        loader = loader.endpoint_url(endpoint.clone());
    }

    loader.load().await
}

fn timeout_config(http: &HttpClientOptions) -> TimeoutConfig {
    TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .read_timeout(Duration::from_secs(http.read_timeout_secs))
        .operation_timeout(Duration::from_secs(http.timeout_secs))
        .build()
}

#[async_trait]
impl ConfigDataService for HttpConfigDataService {
    async fn start_session(&self, request: &SessionRequest) -> Result<String> {
        let output = self
            .inner_client
            .start_configuration_session()
            .application_identifier(&request.application_identifier)
            .environment_identifier(&request.environment_identifier)
            .configuration_profile_identifier(&request.configuration_profile_identifier)
            .required_minimum_poll_interval_in_seconds(request.required_minimum_poll_interval_in_seconds)
            .send()
            .await
            .map_err(|e| sdk_error("StartConfigurationSession", e))?;

        output
            .initial_configuration_token()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::Service("session response is missing the initial token".into()))
    }

    async fn fetch_latest(&self, token: &str) -> Result<FetchResult> {
        let output = self
            .inner_client
            .get_latest_configuration()
            .configuration_token(token)
            .send()
            .await
            .map_err(|e| sdk_error("GetLatestConfiguration", e))?;

        let next_token = output
            .next_poll_configuration_token()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::Service("response is missing the next poll token".into()))?;
        let payload = output
            .configuration()
            .map(|blob| blob.as_ref().to_vec())
            .unwrap_or_default();

        Ok(FetchResult { next_token, payload })
    }
}

fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> ConfigError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{} failed: {}", operation, DisplayErrorContext(&err));
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ConfigError::Transport(message),
        _ => ConfigError::Service(message),
    }
}
