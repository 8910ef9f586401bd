//! Option validation.
//!
//! # Responsibilities
//! - Semantic checks that serde cannot express (non-empty names, existing directory)
//! - Report every offending field in one pass, not just the first
//!
//! Validation runs once, at construction; invalid options never produce a client.

use std::collections::HashSet;
use std::fmt;

use crate::options::schema::{
    ClientOptions, CredentialsOptions, FileOptions, HttpClientOptions, PollErrorPolicy,
    RemoteOptions, MAX_CHECK_INTERVAL,
};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ClientOptions {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        match self {
            ClientOptions::FileBased(options) => validate_file_options(options),
            ClientOptions::RemoteManaged(options) => validate_remote_options(options),
        }
    }
}

pub fn validate_file_options(options: &FileOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let dir = &options.configs_directory;
    if dir.as_os_str().is_empty() {
        errors.push(ValidationError::new("configs_directory", "must not be empty"));
    } else {
        match std::fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => {
                if let Err(e) = std::fs::read_dir(dir) {
                    errors.push(ValidationError::new(
                        "configs_directory",
                        format!("{} is not readable: {}", dir.display(), e),
                    ));
                }
            }
            Ok(_) => errors.push(ValidationError::new(
                "configs_directory",
                format!("{} is not a directory", dir.display()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "configs_directory",
                format!("{}: {}", dir.display(), e),
            )),
        }
    }

    check_config_names(&options.config_names, true, &mut errors);

    finish(errors)
}

pub fn validate_remote_options(options: &RemoteOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    require("id", &options.id, &mut errors);
    require("region", &options.region, &mut errors);
    require("app", &options.app, &mut errors);
    require("env", &options.env, &mut errors);

    if let CredentialsOptions::Static {
        access_key_id,
        secret_key,
        ..
    } = &options.credentials
    {
        require("credentials.access_key_id", access_key_id, &mut errors);
        require("credentials.secret_key", secret_key, &mut errors);
    }

    check_config_names(&options.config_names, false, &mut errors);

    if options.check_interval_secs > MAX_CHECK_INTERVAL.as_secs() {
        errors.push(ValidationError::new(
            "check_interval_secs",
            format!("must not exceed {} seconds", MAX_CHECK_INTERVAL.as_secs()),
        ));
    }

    if let Some(endpoint) = &options.endpoint {
        match url::Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => errors.push(ValidationError::new(
                "endpoint",
                "must be an http(s) URL with a host",
            )),
            Err(e) => errors.push(ValidationError::new("endpoint", e.to_string())),
        }
    }

    check_http(&options.http, &mut errors);

    if let PollErrorPolicy::Retry {
        base_delay_ms,
        max_delay_ms,
        reopen_after,
    } = options.on_poll_error
    {
        if base_delay_ms == 0 {
            errors.push(ValidationError::new("on_poll_error.base_delay_ms", "must be greater than 0"));
        }
        if max_delay_ms < base_delay_ms {
            errors.push(ValidationError::new(
                "on_poll_error.max_delay_ms",
                "must not be less than base_delay_ms",
            ));
        }
        if reopen_after == 0 {
            errors.push(ValidationError::new("on_poll_error.reopen_after", "must be greater than 0"));
        }
    }

    finish(errors)
}

fn require(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
    }
}

/// File stems must not escape the configs directory.
fn check_config_names(names: &[String], file_stems: bool, errors: &mut Vec<ValidationError>) {
    if names.is_empty() {
        errors.push(ValidationError::new("config_names", "must not be empty"));
        return;
    }

    let mut seen = HashSet::new();
    for (i, name) in names.iter().enumerate() {
        let field = format!("config_names[{}]", i);
        if name.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        } else if file_stems && (name.contains('/') || name.contains('\\') || name == "..") {
            errors.push(ValidationError::new(field, format!("{:?} must be a plain file name", name)));
        } else if !seen.insert(name.as_str()) {
            errors.push(ValidationError::new(field, format!("duplicate config name {:?}", name)));
        }
    }
}

fn check_http(http: &HttpClientOptions, errors: &mut Vec<ValidationError>) {
    let limits = [
        ("http.connect_timeout_secs", http.connect_timeout_secs),
        ("http.read_timeout_secs", http.read_timeout_secs),
        ("http.timeout_secs", http.timeout_secs),
        ("http.max_attempts", u64::from(http.max_attempts)),
    ];
    for (field, value) in limits {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
