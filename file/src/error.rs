//! Error taxonomy for file loading and merging.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("recipe file not found: {0}")]
    RecipeNotFound(String),

    #[error("config file in recipe {recipe} not found: {file}")]
    RecipeEntryNotFound { recipe: String, file: String },

    #[error("unsupported config file in recipe {recipe}: {file}")]
    RecipeEntryUnsupported { recipe: String, file: String },

    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("no valid configuration files provided")]
    NoFiles,

    #[error("failed to load file {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("configuration file must contain a mapping: {0}")]
    NotAMapping(String),

    #[error("error merging configs at {path}: {message}")]
    Merge { path: String, message: String },

    #[error(transparent)]
    Resolution(#[from] omniconfig_core::error::Error),
}

pub type Result<T> = std::result::Result<T, FileError>;
