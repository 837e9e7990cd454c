//! Error taxonomy for CLI flag synthesis and parsing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("error adding CLI arguments{flag} for field '{path}': {message}")]
    Config { flag: String, path: String, message: String },

    #[error("error parsing CLI arguments{flag} for field '{path}': {message}")]
    Parse { flag: String, path: String, message: String },

    #[error(transparent)]
    Resolution(#[from] omniconfig_core::error::Error),
}

impl CliError {
    pub fn config(path: impl Into<String>, flag: Option<&str>, message: impl Into<String>) -> Self {
        CliError::Config {
            flag: flag.map(|f| format!(" of flag '{f}'")).unwrap_or_default(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn parse(path: impl Into<String>, flag: Option<&str>, message: impl Into<String>) -> Self {
        CliError::Parse {
            flag: flag.map(|f| format!(" of flag '{f}'")).unwrap_or_default(),
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
