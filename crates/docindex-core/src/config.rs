//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge `docindex.toml` + `docindex.<env>.toml` + `DOCINDEX_*`
//! env vars. `expand_path` handles `~` and `${VAR}` in embedded engine paths.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// How to reach the engine.
///
/// `url` is either an HTTP endpoint or, for the embedded engine,
/// `memory://` or a directory (`file://` prefix optional).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub url: String,
    #[serde(default)]
    pub enable_compression: bool,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { url: "memory://".to_string(), enable_compression: false, request_timeout_secs: default_timeout_secs() }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidConfig("engine.url must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig("engine.request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::default("engine", EngineConfig::default()))
            .merge(Toml::file("docindex.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("docindex.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("docindex.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("docindex.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("DOCINDEX_").split("__"));

        let config = Self { figment };
        config.engine()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn engine(&self) -> Result<EngineConfig> {
        let engine: EngineConfig = self.get("engine")?;
        engine.validate()?;
        Ok(engine)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
