//! Client configuration: where the remote service lives and how long the
//! client waits for it.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Error;

fn default_timeout_secs() -> u64 {
    30
}

/// Everything the client needs to talk to the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The base URL of the service's REST API, e.g.,
    /// `https://api.example.com/v1`.
    pub base_url: String,
    /// The bearer token identifying the authenticated user.
    pub api_token: String,
    /// How long, in seconds, the client waits for slow operations (bulk
    /// import and bank removal) before reporting a timeout. Defaults to 30.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// The configured timeout as a [Duration].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Loads the config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [Error::Io] when the file cannot be read and [Error::Json]
    /// when it is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the config to a JSON file, creating parent directories as
    /// needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod client_config_tests {
    use super::ClientConfig;

    #[test]
    fn timeout_defaults_to_thirty_seconds() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url": "https://api.example.com", "api_token": "token"}"#,
        )
        .expect("could not parse config");

        assert_eq!(config.timeout().as_secs(), 30);
    }

    #[test]
    fn explicit_timeout_is_respected() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url": "https://api.example.com", "api_token": "token", "timeout_secs": 5}"#,
        )
        .expect("could not parse config");

        assert_eq!(config.timeout().as_secs(), 5);
    }
}
