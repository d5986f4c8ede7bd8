//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/graphmap/config.toml` (XDG) or platform config dir
//! 2. Project config: `.graphmap.toml`
//! 3. Environment variables: `GRAPHMAP_*` (nested keys separated by `__`)
//!
//! # Example
//!
//! ```toml
//! [neo4j]
//! uri = "bolt://localhost:7687"
//! user = "neo4j"
//! password = "secret"
//!
//! [search]
//! default_page_size = 50
//! ```
//!
//! The same values can come from the environment, e.g. `GRAPHMAP_NEO4J__URI`.

use std::ops::Deref;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::synth::SearchModel;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub neo4j: Neo4jConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    /// Bolt URI (required). Example: `bolt://localhost:7687`
    pub uri: String,
    /// Database user (required).
    pub user: String,
    /// Password; empty when absent.
    #[serde(default)]
    pub password: Option<String>,
    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Rows fetched per round trip.
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_max_connections() -> usize {
    16
}

fn default_fetch_size() -> usize {
    256
}

/// Defaults applied to new search models.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_order_by")]
    pub default_order_by: String,
    #[serde(default = "default_descending")]
    pub default_descending: bool,
}

fn default_page_size() -> u32 {
    25
}

fn default_order_by() -> String {
    "created_at".to_string()
}

fn default_descending() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            default_order_by: default_order_by(),
            default_descending: default_descending(),
        }
    }
}

impl SearchConfig {
    /// A fresh search model (page 1) carrying the configured defaults.
    pub fn search_model(&self) -> SearchModel {
        SearchModel {
            page_size: self.default_page_size,
            order_by_field: Some(self.default_order_by.clone()),
            descending: self.default_descending,
            ..SearchModel::default()
        }
    }
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        let config: Config = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered figment used by [`Config::load`].
    pub fn figment() -> Figment {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(".graphmap.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("GRAPHMAP_").split("__"))
    }

    /// Rejects blank connection parameters that deserialized successfully.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neo4j.uri.trim().is_empty() {
            return Err(figment::Error::from("neo4j.uri must not be empty".to_string()).into());
        }
        if self.neo4j.user.trim().is_empty() {
            return Err(figment::Error::from("neo4j.user must not be empty".to_string()).into());
        }
        Ok(())
    }

    /// User config path: ~/.config/graphmap/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("graphmap").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("graphmap").join("config.toml"))
            .unwrap_or_default()
    }
}
