// src/config.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

/// Run configuration. Every field has a default so a partial YAML file is enough.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub metadata_dir: PathBuf,
    pub database: DatabaseConfig,
    /// Prefix for destination tables, followed by the lowercased table id.
    pub table_prefix: String,
    /// Request variable that carries the time filter.
    pub time_variable: String,
    /// Destination column holding the period, after renaming.
    pub time_column: String,
    /// Variables whose comparison filters are expanded into literal codes.
    pub materialized_variables: Vec<String>,
    pub batch_size: usize,
    pub text_length: u32,
    /// Above this many filter values a request goes out as POST.
    pub get_max_values: usize,
    pub max_concurrent_tables: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub target_schema: String,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.statbank.dk/v1".into(),
            metadata_dir: PathBuf::from("tables"),
            database: DatabaseConfig::default(),
            table_prefix: "dst_".into(),
            time_variable: "Tid".into(),
            time_column: "time".into(),
            materialized_variables: vec!["OMRÅDE".into(), "BOPOMR".into()],
            batch_size: 1000,
            text_length: 150,
            get_max_values: 100,
            max_concurrent_tables: 1,
            request_timeout_secs: 60,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: "bbr".into(),
            target_schema: "input".into(),
            max_connections: 5,
        }
    }
}

impl Config {
    /// Read `path` as YAML if given, then apply credentials from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_yaml(&text).with_context(|| format!("parsing config {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env(&mut self) {
        if let Ok(user) = env::var("MARIADB_USR") {
            self.database.user = user;
        }
        if let Ok(password) = env::var("MARIADB_PSW") {
            self.database.password = password;
        }
        if let Ok(host) = env::var("MARIADB_HOST") {
            self.database.host = host;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be greater than zero");
        }
        if self.max_concurrent_tables == 0 {
            bail!("max_concurrent_tables must be greater than zero");
        }
        let base = url::Url::parse(&self.api_base_url)
            .with_context(|| format!("api_base_url {:?} is not a valid URL", self.api_base_url))?;
        if base.cannot_be_a_base() {
            bail!("api_base_url {} cannot carry a path", base);
        }
        Ok(())
    }
}
