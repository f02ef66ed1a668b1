//! Secret lookup for the external collaborators.
//!
//! Secrets never live in the TOML config. They are read through a
//! [`SecretSource`] (the process environment in production) and resolved
//! once at startup into [`LoadedCredentials`]. A missing required secret is
//! fatal: the binary refuses to start either the scheduler or the console.

mod loader;

pub use loader::{LoadedCredentials, SecretNames, load_credentials};

use std::collections::HashMap;

/// Read-only lookup of named secrets.
pub trait SecretSource {
    /// Return the secret value for `name`, or `None` when it is not set.
    fn get(&self, name: &str) -> Option<String>;
}

/// Secrets taken from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretSource;

impl SecretSource for EnvSecretSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed secret map, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MapSecretSource {
    values: HashMap<String, String>,
}

impl MapSecretSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_owned(), value.to_owned());
        self
    }
}

impl SecretSource for MapSecretSource {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}
