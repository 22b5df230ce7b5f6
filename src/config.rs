use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Shipshape
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShipshapeConfig {
    /// Acting identity for CLI sessions
    pub identity: IdentityConfig,
    /// Workflow tuning
    pub workflow: WorkflowConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// User id reported to the workflow for every CLI action
    pub user_id: String,
    /// Role name: administrator or user
    pub role: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Bound on request-number allocation attempts
    pub request_number_attempts: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Enable structured tracing output
    pub tracing_enabled: bool,
    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for ShipshapeConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig {
                user_id: "local-user".to_string(),
                role: "user".to_string(),
            },
            workflow: WorkflowConfig {
                request_number_attempts: 5,
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                log_level: "info".to_string(),
            },
            database: Some(DatabaseConfig {
                url: ".shipshape/shipshape.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
            }),
        }
    }
}

impl ShipshapeConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (shipshape.toml, .shipshape-rc)
    /// 3. Environment variables (prefixed with SHIPSHAPE_)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&ShipshapeConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("shipshape.toml").exists() {
            builder = builder.add_source(File::with_name("shipshape"));
        }

        if Path::new(".shipshape-rc").exists() {
            builder = builder.add_source(File::with_name(".shipshape-rc"));
        }

        builder = builder.add_source(
            Environment::with_prefix("SHIPSHAPE")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ShipshapeConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = ShipshapeConfig::load_env_file();
        ShipshapeConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ShipshapeConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shipshape.toml");

        let config = ShipshapeConfig::default();
        config.save_to_file(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: ShipshapeConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.identity.user_id, "local-user");
        assert_eq!(parsed.workflow.request_number_attempts, 5);
        assert!(parsed.database.is_some());
    }
}
