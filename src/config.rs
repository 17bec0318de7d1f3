use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Directory the transport collaborator drops source files into.
    #[serde(default = "default_landing_dir")]
    pub landing_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    /// Fixed day-month-year format source dates are parsed against.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            landing_dir: default_landing_dir(),
            include_globs: default_include_globs(),
            date_format: default_date_format(),
        }
    }
}

fn default_landing_dir() -> PathBuf {
    PathBuf::from("./landing")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.csv".to_string(), "**/*.json".to_string()]
}

fn default_date_format() -> String {
    "%d-%m-%Y".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> i64 {
    50
}

fn default_max_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7410".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.query.default_limit < 1 {
        anyhow::bail!("query.default_limit must be >= 1");
    }

    if config.query.max_limit < config.query.default_limit {
        anyhow::bail!("query.max_limit must be >= query.default_limit");
    }

    if config.ingest.date_format.is_empty() {
        anyhow::bail!("ingest.date_format must not be empty");
    }

    Ok(config)
}
