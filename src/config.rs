use crate::domain::Style;
use crate::error::{Result, TagverError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "tagver.toml";

/// Represents the complete configuration for tagver.
///
/// Every setting is optional; command-line flags take precedence.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
}

/// Default values for the `from` command.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(default)]
    pub style: Option<Style>,

    /// Preset name or custom regular expression
    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub format: Option<String>,

    /// Unset means commit metadata only past the tag
    #[serde(default)]
    pub metadata: Option<bool>,

    #[serde(default)]
    pub dirty: bool,

    #[serde(default)]
    pub bump: bool,

    #[serde(default)]
    pub full_commit: bool,

    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub tagged_metadata: bool,

    #[serde(default)]
    pub tag_branch: Option<String>,

    /// `any` or a VCS name
    #[serde(default)]
    pub vcs: Option<String>,
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `tagver.toml` in current directory
/// 3. `tagver.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Errors
/// * [TagverError::Config] - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => match locate_config() {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };

    tracing::debug!(path = %path.display(), "loading configuration");
    let config_str = fs::read_to_string(&path).map_err(|e| {
        TagverError::config(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    parse_config(&config_str)
        .map_err(|e| TagverError::config(format!("Invalid '{}': {}", path.display(), e)))
}

/// Parse configuration from TOML text
pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}

fn locate_config() -> Option<PathBuf> {
    let local = Path::new(".").join(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_FILE))
        .filter(|path| path.exists())
}
