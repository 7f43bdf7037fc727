use std::path::PathBuf;

use clap::Parser;
use config::{
    builder::DefaultState, Config, ConfigBuilder, ConfigError as BaseConfigError, Environment, File,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command-line flags. Each one, when given, overrides every other configuration source.
#[derive(Debug, Default, Parser)]
#[command(name = "snippetbox", version, about = "Share short-lived text snippets")]
pub struct Cli {
    /// HTTP network address
    #[arg(long)]
    pub addr: Option<String>,
    /// HTTP network port
    #[arg(long)]
    pub port: Option<u16>,
    /// SQLite data source name
    #[arg(long)]
    pub dsn: Option<String>,
    /// Show error details and backtraces in HTTP responses
    #[arg(long)]
    pub debug: bool,
    /// Path to a TOML configuration file
    #[arg(long, env = "SNIPPETBOX_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub lifetime_hours: u64,
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tls: TlsConfig,
    pub session: SessionConfig,
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] BaseConfigError),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl AppConfig {
    /// Resolve configuration from defaults, an optional file, the environment and `cli`.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match &cli.config {
            Some(path) => File::from(path.as_path()).required(true),
            None => File::with_name("snippetbox").required(false),
        };

        let settings = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("SNIPPETBOX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = apply_cli_overrides(settings, cli)?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server port cannot be 0".to_string(),
            ));
        }

        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server bind address cannot be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database max_connections must be at least 1".to_string(),
            ));
        }

        if self.session.lifetime_hours == 0 {
            return Err(ConfigError::Validation(
                "session lifetime must be at least one hour".to_string(),
            ));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "session cookie name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn apply_cli_overrides(
    mut settings: ConfigBuilder<DefaultState>,
    cli: &Cli,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if let Some(addr) = &cli.addr {
        settings = settings.set_override("server.bind_addr", addr.as_str())?;
    }
    if let Some(port) = cli.port {
        settings = settings.set_override("server.port", i64::from(port))?;
    }
    if let Some(dsn) = &cli.dsn {
        settings = settings.set_override("database.url", dsn.as_str())?;
    }
    if cli.debug {
        settings = settings.set_override("debug", true)?;
    }
    Ok(settings)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "localhost".to_string(),
                port: 4000,
            },
            database: DatabaseConfig {
                url: "sqlite://snippetbox.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            tls: TlsConfig {
                enabled: true,
                cert_path: PathBuf::from("./tls/cert.pem"),
                key_path: PathBuf::from("./tls/key.pem"),
            },
            session: SessionConfig {
                cookie_name: "snippetbox_session".to_string(),
                lifetime_hours: 12,
                cookie_secure: true,
            },
            debug: false,
        }
    }
}
