pub mod dump;
pub mod error;
pub mod loader;
pub mod merger;

pub use dump::{dumps_to_json, dumps_to_yaml};
pub use error::{FileError, Result};
pub use loader::FileLoader;
pub use merger::ConfigMerger;
