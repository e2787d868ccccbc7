use crate::error::{Result, VecGraphError};
use config::{Config, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables that override the file config, mapped to their config keys.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("NEO4J_URL", "neo4j.url"),
    ("NEO4J_USER", "neo4j.user"),
    ("NEO4J_PASS", "neo4j.password"),
    ("OPENAI_API_KEY", "openai.api_key"),
    ("OPENAI_API_BASE", "openai.base_url"),
];

const REDACTED: &str = "***";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: Neo4jConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub chain: ChainConfig,
}

/// Connection settings for the graph database. Every field may be unset;
/// the driver decides what an empty value means.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub embedding_model: Option<String>,
    pub chat_model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Echo the leading embedding values of every question.
    pub verbose: bool,
}

impl AppConfig {
    /// Copy of the config that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.neo4j.password.is_some() {
            copy.neo4j.password = Some(REDACTED.to_string());
        }
        if copy.openai.api_key.is_some() {
            copy.openai.api_key = Some(REDACTED.to_string());
        }
        copy
    }
}

pub struct ConfigManager;

impl ConfigManager {
    /// Load the config file (if any) and apply process environment overrides.
    pub fn load() -> Result<AppConfig> {
        let path = Self::config_path()?;
        Self::load_from(Some(&path), |var| std::env::var(var).ok())
    }

    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "vecgraph", "vecgraph").ok_or_else(|| {
            VecGraphError::Configuration("Could not determine config directory".to_string())
        })?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Build an [`AppConfig`] from an optional TOML file plus variables resolved
    /// through `lookup`. Variables that resolve to `None` leave the file value alone.
    pub fn load_from<F>(path: Option<&Path>, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, lookup(var)).map_err(|e| {
                VecGraphError::Configuration(format!("Failed to apply {}: {}", var, e))
            })?;
        }

        let settings = builder
            .build()
            .map_err(|e| VecGraphError::Configuration(format!("Failed to build config: {}", e)))?;

        settings.try_deserialize().map_err(|e| {
            VecGraphError::Configuration(format!("Failed to deserialize config: {}", e))
        })
    }
}
