use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ConvertError, Result};

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Log which source URLs did not survive conversion.
    pub debug: bool,
    pub backend: BackendConfig,
    pub bridge: BridgeConfig,
    pub links: LinksConfig,
    pub code: CodeConfig,
    pub tables: TablesConfig,
}

/// Which backend a `Converter` tries first.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Builtin,
    Bridge,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec!["markdown_to_notion.js".to_string()],
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Wrap every backend in the placeholder protocol.
    pub preserve: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self { preserve: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub default_language: String,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            default_language: "plain text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    /// Tables wider than this degrade to plain-text paragraphs.
    pub max_columns: usize,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self { max_columns: 100 }
    }
}

impl Config {
    /// The configuration bundled with the crate (validated by the build script).
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Parse a TOML document; missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.tables.max_columns == 0 {
            return Err(ConvertError::Config("tables.max_columns must be at least 1".to_string()));
        }
        if self.backend.kind == BackendKind::Bridge && self.bridge.program.trim().is_empty() {
            return Err(ConvertError::Config(
                "bridge.program is required when backend.kind is \"bridge\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::compiled_default()
            }),
            Err(_) => Self::compiled_default(),
        }
    }
}
