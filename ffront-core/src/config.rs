#![forbid(unsafe_code)]

//! Frontend configuration, read from `ffront.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "ffront.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Backend used by programs that were not given one explicitly.
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// Report a warning when the default backend is picked.
    #[serde(default = "default_warn_on_default_backend")]
    pub warn_on_default_backend: bool,
}

fn default_backend() -> String {
    "roundtrip".to_string()
}

fn default_warn_on_default_backend() -> bool {
    true
}

impl Default for FrontendConfig {
    fn default() -> Self {
        FrontendConfig {
            default_backend: default_backend(),
            warn_on_default_backend: default_warn_on_default_backend(),
        }
    }
}

impl FrontendConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Load the nearest `ffront.toml` at or above `start`, or the defaults
    /// if there is none.
    pub fn find_and_load(start: &Path) -> Result<Self, ConfigError> {
        match find_config(start) {
            Some(path) => {
                debug!(path = %path.display(), "loading frontend config");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = cur.parent()?.to_path_buf();
    }
}
