//! Loader configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming an extra directory searched for master files.
pub const DATA_DIR_ENV: &str = "ATOMIX_DATA_DIR";

// ---------------------------------------------------------------------------
// Loader configuration
// ---------------------------------------------------------------------------

/// Knobs for [`crate::data::loader::load_with`]. Every field has a default,
/// so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Lines starting with this character (after leading blanks) are skipped.
    pub comment_char: char,
    /// Directory that relative sub-file paths resolve against. Defaults to
    /// the master file's own directory.
    pub base_dir: Option<PathBuf>,
    /// Extra directories searched, in order, when the master file is not
    /// found relative to the working directory.
    pub search_dirs: Vec<PathBuf>,
    /// Appended to a master file name that has no extension.
    pub default_extension: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            comment_char: '#',
            base_dir: None,
            search_dirs: Vec::new(),
            default_extension: "dat".to_string(),
        }
    }
}

impl LoadConfig {
    /// Read a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Append `$ATOMIX_DATA_DIR` to the search directories when it is set.
    pub fn with_env(mut self) -> Self {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            if !dir.is_empty() {
                self.search_dirs.push(PathBuf::from(dir));
            }
        }
        self
    }

    /// Candidate paths for a master file `name`, in search order.
    pub fn master_candidates(&self, name: &Path) -> Vec<PathBuf> {
        let mut file = name.to_path_buf();
        if file.extension().is_none() && !self.default_extension.is_empty() {
            file.set_extension(&self.default_extension);
        }
        let mut candidates = vec![file.clone()];
        if file.is_relative() {
            candidates.extend(self.search_dirs.iter().map(|dir| dir.join(&file)));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: LoadConfig = serde_json::from_str(r#"{ "comment_char": "!" }"#).unwrap();
        assert_eq!(cfg.comment_char, '!');
        assert_eq!(cfg.default_extension, "dat");
        assert!(cfg.search_dirs.is_empty());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atomix.json");
        let json = r#"{ "search_dirs": ["/opt/data"], "default_extension": "txt" }"#;
        std::fs::write(&path, json).unwrap();
        let cfg = LoadConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.search_dirs, vec![PathBuf::from("/opt/data")]);
        assert_eq!(cfg.default_extension, "txt");
    }

    #[test]
    fn bad_config_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LoadConfig::from_json_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn master_candidates_add_extension_and_search_dirs() {
        let cfg = LoadConfig {
            search_dirs: vec![PathBuf::from("/data/a"), PathBuf::from("/data/b")],
            ..LoadConfig::default()
        };
        assert_eq!(
            cfg.master_candidates(Path::new("standard80")),
            vec![
                PathBuf::from("standard80.dat"),
                PathBuf::from("/data/a/standard80.dat"),
                PathBuf::from("/data/b/standard80.dat"),
            ]
        );
        assert_eq!(
            cfg.master_candidates(Path::new("/abs/master.txt")),
            vec![PathBuf::from("/abs/master.txt")]
        );
    }
}
