use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "commentary", about = "A comment service with likes")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix the comment routes are nested under.
    pub mount_path: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            mount_path: "/api/comments".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 8,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "commentary_session".to_string(),
            session_hours: 720,
        }
    }
}

impl Config {
    /// Layer the TOML file (if any) and then the CLI flags over the defaults.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?
        } else {
            Config::default()
        };

        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("commentary.db"));
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing sections and keys keep their defaults.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mount = &self.server.mount_path;
        anyhow::ensure!(
            mount.is_empty() || mount.starts_with('/'),
            "server.mount_path must start with '/', got {:?}",
            mount
        );
        anyhow::ensure!(
            !mount.contains('{') && !mount.contains('}'),
            "server.mount_path must not contain route parameters, got {:?}",
            mount
        );
        anyhow::ensure!(
            self.database.max_connections > 0,
            "database.max_connections must be at least 1"
        );
        anyhow::ensure!(
            !self.auth.cookie_name.is_empty(),
            "auth.cookie_name must not be empty"
        );
        Ok(())
    }

    /// Mount path without a trailing slash. Empty means the comment routes sit
    /// at the root.
    pub fn mount_prefix(&self) -> &str {
        self.server.mount_path.trim_end_matches('/')
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .with_context(|| format!("Invalid listen address {}", addr))
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match &cli.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".commentary"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    /// Database file, resolved against the data dir by `load`.
    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("commentary.db"))
    }
}
