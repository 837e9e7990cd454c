pub mod error;
pub mod namespace;
pub mod parser;

pub use error::{ParserError, Result};
pub use namespace::OmniConfigNamespace;
pub use parser::{OmniConfigParser, ParseOutcome, FILE_SCOPE};

pub use omniconfig_core::registry::global_type_system;
