use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config source not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config source '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid INI syntax in '{path}' at line {line}: {message}")]
    IniSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("unsupported config file type: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to walk config directory '{path}': {source}")]
    WalkError {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to write override file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid override key: {0:?}")]
    InvalidOverrideKey(String),

    #[error("override key '{0}' is both a value and a group")]
    InconsistentOverride(String),
}

impl ConfigError {
    /// The source location the error refers to, if any.
    pub fn location(&self) -> Option<&Path> {
        match self {
            ConfigError::NotFound(path) | ConfigError::UnsupportedFormat(path) => Some(path),
            ConfigError::ReadError { path, .. }
            | ConfigError::ParseError { path, .. }
            | ConfigError::IniSyntax { path, .. }
            | ConfigError::WalkError { path, .. }
            | ConfigError::WriteError { path, .. } => Some(path),
            ConfigError::InvalidOverrideKey(_) | ConfigError::InconsistentOverride(_) => None,
        }
    }
}
