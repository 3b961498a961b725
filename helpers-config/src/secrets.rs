//! Secret sources for `gSecret://` values

use helpers_error::{Error, Result};
use std::collections::HashMap;

/// Prefix marking a config value as a reference to a secret.
pub const SECRET_PREFIX: &str = "gSecret://";

/// Resolves a secret path, e.g. `projects/p/secrets/db-password/versions/latest`.
pub trait SecretSource: Send + Sync {
    fn get_secret(&self, path: &str) -> Result<String>;
}

/// The secret path of `value`, if it is a secret reference.
pub fn secret_path(value: &str) -> Option<&str> {
    value
        .strip_prefix(SECRET_PREFIX)
        .filter(|path| !path.is_empty())
}

/// In-memory secrets (volatile, but useful for testing and local runs)
#[derive(Debug, Clone, Default)]
pub struct MemorySecrets {
    secrets: HashMap<String, String>,
}

impl MemorySecrets {
    pub fn new() -> Self {
        Self {
            secrets: HashMap::new(),
        }
    }

    pub fn with_secret(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(path.into(), value.into());
    }
}

impl SecretSource for MemorySecrets {
    fn get_secret(&self, path: &str) -> Result<String> {
        self.secrets
            .get(path)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("secret '{}' not found", path)))
    }
}
