//! Configuration loader with layered sources.

use crate::{AppConfig, CacheBackendKind, SameSite};
use config::{Config, ConfigError, Environment, File};
use coral_core::CoralError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides (not committed)
    /// 4. Environment variables with `CORAL_` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, CoralError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, CoralError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), CoralError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str) -> Result<AppConfig, CoralError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("CORAL_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        // 1. Load default configuration
        let default_path = format!("{}/default.toml", config_dir);
        if Path::new(&default_path).exists() {
            debug!("Loading default config from: {}", default_path);
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        // 2. Load environment-specific configuration
        let env_path = format!("{}/{}.toml", config_dir, environment);
        if Path::new(&env_path).exists() {
            debug!("Loading environment config from: {}", env_path);
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        // 3. Load local overrides (not committed to version control)
        let local_path = format!("{}/local.toml", config_dir);
        if Path::new(&local_path).exists() {
            debug!("Loading local config from: {}", local_path);
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        // 4. Override with environment variables (CORAL_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("CORAL")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_coral_error)?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_coral_error)?;
        app_config.app.environment = environment;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration.
    fn validate_config(config: &AppConfig) -> Result<(), CoralError> {
        if config.session.enabled && config.session.cookie_name.is_empty() {
            return Err(CoralError::Configuration(
                "Session cookie name must not be empty".to_string(),
            ));
        }

        // Session data must live in a store shared by all serving processes.
        // A memory backend silently scopes sessions to one process, so it is
        // only tolerated in development.
        if config.session.enabled && config.cache.backend == CacheBackendKind::Memory {
            if config.app.is_development() {
                warn!(
                    "Sessions are backed by the in-memory cache; session data \
                     will not be shared across processes"
                );
            } else {
                return Err(CoralError::Configuration(format!(
                    "Sessions require a shared cache backend in the '{}' environment; \
                     set cache.backend = \"redis\"",
                    config.app.environment
                )));
            }
        }

        if config.cache.backend == CacheBackendKind::Redis && !config.redis.enabled {
            warn!("Cache backend is Redis but Redis is disabled; caching will be a no-op");
        }

        if config.session.same_site == SameSite::None && !config.session.https_only {
            warn!("SameSite=None session cookies require the Secure flag to be honored by browsers");
        }

        if config.server.max_body_size == 0 {
            return Err(CoralError::Configuration(
                "server.max_body_size must be greater than zero".to_string(),
            ));
        }

        if config.worker.blocking_pool_size == 0 {
            return Err(CoralError::Configuration(
                "worker.blocking_pool_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn config_error_to_coral_error(err: ConfigError) -> CoralError {
    CoralError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheConfig, SessionConfig};

    fn production_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.app.environment = "production".to_string();
        config
    }

    #[test]
    fn test_memory_sessions_rejected_in_production() {
        let config = production_config();
        let result = ConfigLoader::validate_config(&config);
        assert!(matches!(result, Err(CoralError::Configuration(_))));
    }

    #[test]
    fn test_memory_sessions_tolerated_in_development() {
        let config = AppConfig::default();
        assert!(ConfigLoader::validate_config(&config).is_ok());
    }

    #[test]
    fn test_redis_sessions_accepted_in_production() {
        let mut config = production_config();
        config.cache = CacheConfig {
            backend: CacheBackendKind::Redis,
            ..CacheConfig::default()
        };
        assert!(ConfigLoader::validate_config(&config).is_ok());
    }

    #[test]
    fn test_disabled_sessions_skip_backend_check() {
        let mut config = production_config();
        config.session = SessionConfig {
            enabled: false,
            ..SessionConfig::default()
        };
        assert!(ConfigLoader::validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_cookie_name_rejected() {
        let mut config = AppConfig::default();
        config.session.cookie_name = String::new();
        assert!(ConfigLoader::validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_body_size_rejected() {
        let mut config = AppConfig::default();
        config.server.max_body_size = 0;
        assert!(ConfigLoader::validate_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_loader_from_missing_directory_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("nope").to_string_lossy()).unwrap();
        let config = loader.get().await;
        assert_eq!(config.server.port, 8000);
    }

    #[tokio::test]
    async fn test_loader_reads_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[server]\nhost = \"127.0.0.1\"\nport = 9000\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        let config = loader.get().await;
        assert_eq!(config.server.addr(), "127.0.0.1:9000");
    }
}
