//! Simulator configuration
//!
//! Read from an optional `pagesim.toml`:
//!
//! ```toml
//! state_dir = "state"
//! page_table_file = "page_table.dat"
//! physical_memory_file = "physical_memory.dat"
//! backing_dir = "state/pages"
//! log_level = "info"
//! ```
//!
//! Every key is optional. File names are relative to `state_dir`; the
//! backing directory defaults to `<state_dir>/pages`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::snapshot::SnapshotFiles;

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pagesim.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the snapshot files
    pub state_dir: PathBuf,
    /// Page table snapshot, relative to `state_dir`
    pub page_table_file: PathBuf,
    /// Physical memory snapshot, relative to `state_dir`
    pub physical_memory_file: PathBuf,
    /// Directory of backing page files
    pub backing_dir: Option<PathBuf>,
    /// Log level name
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("."),
            page_table_file: PathBuf::from("page_table.dat"),
            physical_memory_file: PathBuf::from("physical_memory.dat"),
            backing_dir: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// With an explicit `path` the file must exist. Without one,
    /// `pagesim.toml` in the working directory is used if present and the
    /// defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                match fs::read_to_string(path) {
                    Ok(text) => Self::parse(&text, path),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
                    Err(source) => Err(ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    }),
                }
            }
        }
    }

    /// Load a config file that must exist
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace the state directory, e.g. from `--state-dir`
    pub fn with_state_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        self.state_dir = state_dir.into();
        self
    }

    pub fn page_table_path(&self) -> PathBuf {
        self.state_dir.join(&self.page_table_file)
    }

    pub fn physical_memory_path(&self) -> PathBuf {
        self.state_dir.join(&self.physical_memory_file)
    }

    pub fn backing_path(&self) -> PathBuf {
        match &self.backing_dir {
            Some(dir) => dir.clone(),
            None => self.state_dir.join("pages"),
        }
    }

    /// Snapshot locations named by this config
    pub fn snapshot_files(&self) -> SnapshotFiles {
        SnapshotFiles::new(self.page_table_path(), self.physical_memory_path())
    }
}
