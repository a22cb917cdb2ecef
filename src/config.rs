//! Checker configuration, optionally loaded from an `lpg.toml` file

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::interp::Limits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Limits and paths used by `check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Nesting depth of expressions before `expression_recursion_limit_reached`
    pub max_expression_recursion: usize,
    /// Call depth of the compile-time interpreter
    pub max_recursion: usize,
    /// Instructions the compile-time interpreter may execute during one check
    pub max_executed_instructions: u64,
    /// Bytes the compile-time interpreter may allocate during one check
    pub max_compile_time_memory: usize,
    /// Searched first by `import`
    pub module_directory: Option<PathBuf>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            max_expression_recursion: 100,
            max_recursion: limits.max_recursion,
            max_executed_instructions: limits.max_executed_instructions,
            max_compile_time_memory: limits.max_memory,
            module_directory: None,
        }
    }
}

impl CheckConfig {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let mut config = Self::from_toml(&content, path)?;
        // relative module directories are relative to the config file
        if let (Some(directory), Some(parent)) = (&config.module_directory, path.parent()) {
            if directory.is_relative() {
                config.module_directory = Some(parent.join(directory));
            }
        }
        Ok(config)
    }

    pub fn interpreter_limits(&self) -> Limits {
        Limits {
            max_recursion: self.max_recursion,
            max_executed_instructions: self.max_executed_instructions,
            max_memory: self.max_compile_time_memory,
        }
    }
}
