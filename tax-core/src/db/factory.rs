use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::repository::{AnalysisRepository, RepositoryError};

/// Which backend to open and how to reach it.
///
/// `connection_string` is handed to the backend untouched.
///
/// | backend  | connection_string examples                |
/// |----------|-------------------------------------------|
/// | `sqlite` | `tax-assistant.db`, `:memory:`            |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "tax-assistant.db".to_string(),
        }
    }
}

/// Opens repositories for one backend. Backend crates export a unit struct
/// implementing this and callers register it with a [`RepositoryRegistry`].
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase backend identifier, e.g. `"sqlite"`.
    fn backend_name(&self) -> &'static str;

    /// Opens a ready-to-use repository, running any migrations first.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn AnalysisRepository>, RepositoryError>;
}

/// Factories keyed by backend name.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory, replacing any registered under the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a repository with the factory named by `config.backend`.
    ///
    /// # Errors
    /// * [`RepositoryError::Configuration`] if no such backend is registered.
    /// * Whatever the factory itself returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn AnalysisRepository>, RepositoryError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}
