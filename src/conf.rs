//! Configuration for the server binary

use serde::Deserialize;

use crate::net;

/// All configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Network configuration
    pub server: net::Config,
}

impl Configuration {
    /// Load the configuration from the file `name`, if one exists, then override it
    /// with environment variables such as `REDLIST__SERVER__PORT=6380`.
    ///
    /// The file's extension can be omitted, any format supported by the `config`
    /// crate is accepted.
    pub fn get(name: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(config::Environment::with_prefix("REDLIST").separator("__"))
            .build()?
            .try_deserialize()
    }
}
