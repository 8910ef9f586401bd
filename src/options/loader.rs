//! Client options loading from disk.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::format::ConfigType;
use crate::options::schema::ClientOptions;

/// Load and validate client options from a TOML file.
pub fn load_options(path: &Path) -> Result<ClientOptions> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let options: ClientOptions =
        toml::from_str(&content).map_err(|e| ConfigError::parse(ConfigType::Toml, e))?;

    options.validate().map_err(ConfigError::InvalidOptions)?;

    Ok(options)
}
