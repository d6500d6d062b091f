use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Server configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// Path to the SQLite database file (":memory:" for an in-memory store)
    #[validate(length(min = 1, message = "Database path cannot be empty"))]
    pub database_path: String,

    /// Base URL of the host publishing receipt PDFs
    #[validate(length(min = 1, message = "Receipt base URL cannot be empty"))]
    pub receipt_base_url: String,

    /// Timeout for outbound receipt HEAD probes, in milliseconds
    #[validate(range(
        min = 1,
        max = 120_000,
        message = "Receipt timeout must be between 1ms and 120s"
    ))]
    pub receipt_timeout_ms: u64,

    /// Page size used when the client does not ask for one
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Default page size must be between 1 and 1000"
    ))]
    pub default_page_size: u64,

    /// Hard ceiling on client-requested page sizes
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Max page size must be between 1 and 1000"
    ))]
    pub max_page_size: u64,

    /// Whether to run the server in daemon mode
    pub daemon: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            database_path: "quotawatch.db".to_string(),
            receipt_base_url: "https://www.camara.gov.br".to_string(),
            receipt_timeout_ms: 5_000,
            default_page_size: 100,
            max_page_size: 1000,
            daemon: false,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("QUOTAWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("QUOTAWATCH_PORT", "8080")?,
            database_path: env::var("QUOTAWATCH_DATABASE")
                .unwrap_or_else(|_| "quotawatch.db".to_string()),
            receipt_base_url: env::var("QUOTAWATCH_RECEIPT_BASE_URL")
                .unwrap_or_else(|_| "https://www.camara.gov.br".to_string()),
            receipt_timeout_ms: parse_env_var("QUOTAWATCH_RECEIPT_TIMEOUT_MS", "5000")?,
            default_page_size: parse_env_var("QUOTAWATCH_PAGE_SIZE", "100")?,
            max_page_size: parse_env_var("QUOTAWATCH_MAX_PAGE_SIZE", "1000")?,
            daemon: false, // Environment-based config always runs in foreground
        };

        config.check()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            http_host: cli.http_host,
            http_port: cli.http_port,
            database_path: cli.database_path,
            receipt_base_url: cli.receipt_base_url,
            receipt_timeout_ms: cli.receipt_timeout_ms,
            default_page_size: cli.default_page_size,
            max_page_size: cli.max_page_size,
            daemon: cli.daemon,
        };

        config.check()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.check()?;
        Ok(config)
    }

    /// Field validation plus the cross-field rules validator cannot express
    fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if !self.receipt_base_url.starts_with("http://")
            && !self.receipt_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                field: "receipt_base_url".to_string(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid {
                field: "default_page_size".to_string(),
                reason: "cannot exceed max_page_size".to_string(),
            });
        }
        Ok(())
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub http_host: String,
    pub http_port: u16,
    pub database_path: String,
    pub receipt_base_url: String,
    pub receipt_timeout_ms: u64,
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub daemon: bool,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
