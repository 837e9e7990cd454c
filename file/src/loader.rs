//! Config file discovery and loading.
//!
//! Ported from `parsing/file_loader.py`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use omniconfig_core::value::Value;

use crate::error::{FileError, Result};

pub const CONFIG_FILE_EXTS: &[&str] = &["yaml", "yml", "json", "jsonl"];
pub const RECIPE_FILE_EXTS: &[&str] = &["recipe"];

#[derive(Debug, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        FileLoader
    }

    /// Expand recipe files, discover directory defaults, and load every
    /// file (defaults first) into a `Value::Map`, in load order.
    pub fn load_with_defaults(&self, files: &[String]) -> Result<Vec<Value>> {
        let mut config_files = Vec::new();
        for file in files {
            if has_ext(file, RECIPE_FILE_EXTS) {
                if !Path::new(file).is_file() {
                    return Err(FileError::RecipeNotFound(file.clone()));
                }
                let contents = fs::read_to_string(file)
                    .map_err(|source| FileError::Io { path: file.clone(), source })?;
                for line in contents.lines() {
                    let entry = line.trim();
                    if entry.is_empty() {
                        continue;
                    }
                    if !Path::new(entry).is_file() {
                        return Err(FileError::RecipeEntryNotFound {
                            recipe: file.clone(),
                            file: entry.to_string(),
                        });
                    }
                    if !has_ext(entry, CONFIG_FILE_EXTS) {
                        return Err(FileError::RecipeEntryUnsupported {
                            recipe: file.clone(),
                            file: entry.to_string(),
                        });
                    }
                    config_files.push(entry.to_string());
                }
            } else if has_ext(file, CONFIG_FILE_EXTS) {
                if !Path::new(file).is_file() {
                    return Err(FileError::NotFound(file.clone()));
                }
                config_files.push(file.clone());
            } else {
                return Err(FileError::UnsupportedType(file.clone()));
            }
        }
        if config_files.is_empty() {
            return Err(FileError::NoFiles);
        }

        let default_files = self.discover_default_files(&config_files)?;
        tracing::debug!(?default_files, ?config_files, "loading configuration files");

        default_files
            .iter()
            .chain(config_files.iter().map(Path::new))
            .map(|p| self.load_file(p))
            .collect()
    }

    /// Walk from the current directory down to each file's containing
    /// directory, collecting at most one `__default__.{ext}` per directory.
    /// Files outside the current working directory tree are skipped.
    pub fn discover_default_files(&self, files: &[String]) -> Result<Vec<PathBuf>> {
        let cwd = std::env::current_dir().map_err(|source| FileError::Io { path: ".".to_string(), source })?;
        let mut default_files = Vec::new();
        let mut seen_dirs: BTreeSet<PathBuf> = BTreeSet::new();

        for file in files {
            let resolved = fs::canonicalize(file).map_err(|source| FileError::Io { path: file.clone(), source })?;
            let Ok(relative) = resolved.strip_prefix(&cwd) else { continue };
            let Some(parent_parts) = relative.parent() else { continue };

            let mut current = cwd.clone();
            for part in parent_parts.components() {
                current.push(part);
                if seen_dirs.insert(current.clone()) {
                    for ext in CONFIG_FILE_EXTS {
                        let candidate = current.join(format!("__default__.{ext}"));
                        if candidate.is_file() {
                            if !default_files.contains(&candidate) {
                                default_files.push(candidate);
                            }
                            break;
                        }
                    }
                }
            }
        }
        Ok(default_files)
    }

    /// Load a single config file by extension, requiring the top-level
    /// value to be a mapping.
    pub fn load_file(&self, path: &Path) -> Result<Value> {
        if !path.exists() {
            return Err(FileError::NotFound(path.display().to_string()));
        }
        if !path.is_file() {
            return Err(FileError::UnsupportedType(path.display().to_string()));
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_lowercase();
        let contents =
            fs::read_to_string(path).map_err(|source| FileError::Io { path: path.display().to_string(), source })?;
        let value = match ext.as_str() {
            "yaml" | "yml" => {
                if contents.trim().is_empty() {
                    Value::Map(Default::default())
                } else {
                    serde_yaml::from_str::<serde_json::Value>(&contents)
                        .map_err(|e| FileError::Parse { path: path.display().to_string(), message: e.to_string() })?
                        .into()
                }
            }
            "json" | "jsonl" => serde_json::from_str::<serde_json::Value>(&contents)
                .map_err(|e| FileError::Parse { path: path.display().to_string(), message: e.to_string() })?
                .into(),
            other => return Err(FileError::UnsupportedType(format!(".{other}"))),
        };
        if !value.is_map() {
            return Err(FileError::NotAMapping(path.display().to_string()));
        }
        Ok(value)
    }
}

fn has_ext(file: &str, exts: &[&str]) -> bool {
    exts.iter().any(|ext| file.ends_with(ext) && file.len() > ext.len() && file.as_bytes()[file.len() - ext.len() - 1] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn loads_json_mapping() {
        let mut file = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        write!(file, r#"{{"a": 1}}"#).unwrap();
        let loader = FileLoader::new();
        let value = loader.load_file(file.path()).unwrap();
        assert_eq!(value.as_map().unwrap().get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn rejects_non_mapping_top_level() {
        let mut file = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        write!(file, "[1, 2]").unwrap();
        let loader = FileLoader::new();
        assert!(matches!(loader.load_file(file.path()), Err(FileError::NotAMapping(_))));
    }

    #[test]
    fn has_ext_requires_dot_separator() {
        assert!(has_ext("a.yaml", CONFIG_FILE_EXTS));
        assert!(!has_ext("yaml", CONFIG_FILE_EXTS));
    }
}
