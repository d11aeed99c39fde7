//! Mock authentication
//!
//! Login is delegated to an [`Authenticator`]. The bundled
//! [`StaticCredentials`] reads a username → password map from a JSON file and
//! compares plaintext; it only stands in for a real identity provider.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

/// Identity provider capability injected into the API.
pub trait Authenticator: Send + Sync {
    /// Succeeds if the credentials are valid.
    fn authenticate(&self, username: &str, password: &str) -> Result<()>;

    /// Accounts offered to the login picker.
    fn usernames(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    credentials: BTreeMap<String, String>,
}

impl StaticCredentials {
    pub fn new(credentials: BTreeMap<String, String>) -> Self {
        Self { credentials }
    }

    /// Load a JSON object of `"username": "password"` pairs.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        let credentials: BTreeMap<String, String> = serde_json::from_str(&raw)?;
        info!("Loaded {} mock accounts", credentials.len());
        Ok(Self { credentials })
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        match self.credentials.get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(Error::unauthorized("invalid username or password")),
        }
    }

    fn usernames(&self) -> Vec<String> {
        self.credentials.keys().cloned().collect()
    }
}
