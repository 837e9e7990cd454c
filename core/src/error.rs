//! Error taxonomy for the resolution engine.
//!
//! Exactly the six kinds a caller may observe; every other failure inside
//! this crate is a bug. Each variant carries the failed node's path (or the
//! offending reference / cycle) so a caller can report where resolution
//! broke down.

use thiserror::Error;

/// The six error kinds the resolution engine emits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed structure detected while building the node tree.
    #[error("parse error at {path}: {message}")]
    Parse { path: String, message: String },

    /// Reference target missing, reference-to-a-reference, or malformed
    /// reference string.
    #[error("reference error at {path}: {message}")]
    Reference { path: String, message: String },

    /// The dependency graph contains a cycle.
    #[error("circular reference detected: {cycle}")]
    Circular { cycle: String },

    /// No type chain succeeded while factorying a node.
    #[error("factory error at {path}: {message}")]
    Factory { path: String, message: String },

    /// Attempt to register an ineligible type or a conflicting redefinition.
    #[error("type registration error: {0}")]
    TypeRegistration(String),

    /// Reserved for caller post-construction validation hooks; the engine
    /// propagates but never generates this variant itself.
    #[error("validation error at {path}: {message}")]
    Validation { path: String, message: String },
}

impl Error {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse { path: path.into(), message: message.into() }
    }

    pub fn reference(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Reference { path: path.into(), message: message.into() }
    }

    pub fn factory(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Factory { path: path.into(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
