use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::CliError;

/// Default settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "fakeschema.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Values read from `fakeschema.toml`. Command-line flags win over them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliSettings {
    pub catalog: Option<PathBuf>,
    pub seed: Option<u64>,
    pub passes: Option<u32>,
    /// Anchor date as a quoted `YYYY-MM-DD` string.
    pub today: Option<NaiveDate>,
    pub format: Option<OutputFormat>,
    pub run_dir: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

impl CliSettings {
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path`, or `fakeschema.toml` when present. Missing default file
    /// yields empty settings.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?),
            None => {
                let default_path = Path::new(SETTINGS_FILE);
                if default_path.exists() {
                    Self::from_toml(&std::fs::read_to_string(default_path)?)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
