//! Error taxonomy for the public facade.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error(transparent)]
    CliParser(#[from] omniconfig_cli::CliError),

    #[error(transparent)]
    File(#[from] omniconfig_file::FileError),

    #[error(transparent)]
    Resolution(#[from] omniconfig_core::error::Error),
}

impl ParserError {
    pub fn config(message: impl Into<String>) -> Self {
        ParserError::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ParserError>;
