//! Where configuration lives on disk
//!
//! `SEMANTIC_MEMORY_CONFIG` names the file directly. Otherwise the file is
//! looked up in the config directory (`SEMANTIC_MEMORY_CONFIG_DIR`, else the
//! platform config dir), preferring `config.toml` over `config.json`.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "semantic-memory";
const DIR_VAR: &str = "SEMANTIC_MEMORY_CONFIG_DIR";
const FILE_VAR: &str = "SEMANTIC_MEMORY_CONFIG";

/// Recognised file names in lookup order; the last one is used for new files
const FILE_NAMES: [&str; 2] = ["config.toml", "config.json"];

/// Directory holding the configuration file
pub fn config_dir() -> PathBuf {
    resolve_dir(env_path(DIR_VAR), dirs::config_dir())
}

/// Configuration file to load, or to create when none exists yet
pub fn config_path() -> PathBuf {
    resolve_file(env_path(FILE_VAR), &config_dir())
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn resolve_dir(explicit: Option<PathBuf>, platform: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| platform.map(|dir| dir.join(APP_DIR)))
        .unwrap_or_else(|| Path::new(".").join(APP_DIR))
}

fn resolve_file(explicit: Option<PathBuf>, dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }

    FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .unwrap_or_else(|| dir.join(FILE_NAMES[FILE_NAMES.len() - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_dir() {
        let explicit = PathBuf::from("/etc/sm");
        assert_eq!(resolve_dir(Some(explicit.clone()), Some("/home/u/.config".into())), explicit);
        assert_eq!(
            resolve_dir(None, Some("/home/u/.config".into())),
            PathBuf::from("/home/u/.config/semantic-memory")
        );
        assert_eq!(resolve_dir(None, None), Path::new(".").join("semantic-memory"));
    }

    #[test]
    fn test_resolve_file_lookup_order() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_file(None, dir.path()), dir.path().join("config.json"));

        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        assert_eq!(resolve_file(None, dir.path()), dir.path().join("config.json"));

        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        assert_eq!(resolve_file(None, dir.path()), dir.path().join("config.toml"));

        let explicit = dir.path().join("other.json5");
        assert_eq!(resolve_file(Some(explicit.clone()), dir.path()), explicit);
    }
}
