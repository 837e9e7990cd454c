use std::{env, path::PathBuf};

/// The directory `__default__.{ext}` discovery and user-level defaults live
/// under: `$HOME/.omniconfig`, falling back to the current directory.
pub fn default_config_dir() -> PathBuf {
    let mut config_dir = env::home_dir().or_else(|| env::current_dir().ok()).unwrap_or_default();
    config_dir.push(".omniconfig");
    config_dir
}
