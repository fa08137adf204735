//! Daemon configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional file
//! named by `JSONIFY_CONFIG` (TOML, YAML or JSON by extension), then
//! `JSONIFY_*` environment variables (`JSONIFY_RPC_PORT=9600`, ...).

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use jsonify_core::application::worker::constants::DEFAULT_WORKER_COUNT;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

pub const CONFIG_PATH_ENV: &str = "JSONIFY_CONFIG";
const ENV_PREFIX: &str = "JSONIFY";

const DEFAULT_DB_PATH: &str = "~/.jsonify/jsonify.db";
const DEFAULT_ARTIFACT_URL_BASE: &str = "/artifacts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub workers: usize,
    pub async_enabled: bool,
    pub log_format: LogFormat,
    #[serde(default)]
    pub log_dir: Option<String>,
    pub artifact_url_base: String,
}

impl DaemonConfig {
    /// Load from `JSONIFY_CONFIG` and the process environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from(file, None)
    }

    /// Load with an explicit file and (for tests) an explicit environment map
    pub fn load_from(file: Option<PathBuf>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("rpc_host", jsonify_api_rpc::server::DEFAULT_RPC_HOST)?
            .set_default("rpc_port", i64::from(jsonify_api_rpc::server::DEFAULT_RPC_PORT))?
            .set_default("workers", DEFAULT_WORKER_COUNT as i64)?
            .set_default("async_enabled", true)?
            .set_default("log_format", "pretty")?
            .set_default("artifact_url_base", DEFAULT_ARTIFACT_URL_BASE)?;

        if let Some(path) = &file {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let mut cfg: DaemonConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        cfg.db_path = expand(&cfg.db_path);
        cfg.log_dir = cfg.log_dir.as_deref().map(expand);
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 && self.async_enabled {
            bail!("workers must be at least 1 when async_enabled is true");
        }
        if self.db_path.trim().is_empty() {
            bail!("db_path cannot be empty");
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.contains(":memory:")
    }
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}
