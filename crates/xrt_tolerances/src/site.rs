//! Site configuration: where on this machine outputs go.
//!
//! A `site.toml` maps logical names to directories:
//!
//! ```toml
//! [paths]
//! tolerances = "/data/xrt/tolerances"
//! tolerances_chirp = "results/chirp"
//! ```
//!
//! Relative paths are taken relative to the file that declares them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const FILE_NAME: &str = "site.toml";
pub const ENV_VAR: &str = "XRT_SITE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no site configuration found; searched {}", SearchList(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{config} has no path named `{name}`")]
    MissingPath { name: String, config: PathBuf },
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

struct SearchList<'a>(&'a [PathBuf]);

impl fmt::Display for SearchList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self.0.iter().map(|p| p.display().to_string()).collect();
        f.write_str(&paths.join(", "))
    }
}

#[derive(Debug, Deserialize)]
struct SiteFile {
    #[serde(default)]
    paths: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    source: PathBuf,
    paths: BTreeMap<String, PathBuf>,
}

impl SiteConfig {
    /// Load from `explicit` if given, otherwise from the first existing
    /// candidate of [`default_search_paths`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_search_paths(&[path.to_path_buf()]),
            None => Self::from_search_paths(&default_search_paths()),
        }
    }

    pub fn from_search_paths(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(path),
            None => Err(ConfigError::NotFound {
                searched: candidates.to_vec(),
            }),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: SiteFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let paths = parsed
            .paths
            .into_iter()
            .map(|(name, dir)| {
                let dir = if dir.is_relative() { base.join(dir) } else { dir };
                (name, dir)
            })
            .collect();
        log::debug!("Loaded site configuration from {}", path.display());
        Ok(Self {
            source: path.to_path_buf(),
            paths,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory registered under `name`, created if it does not exist yet.
    pub fn get_path(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let dir = self
            .paths
            .get(name)
            .ok_or_else(|| ConfigError::MissingPath {
                name: name.to_string(),
                config: self.source.clone(),
            })?;
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir.clone())
    }
}

/// `$XRT_SITE_CONFIG`, `./site.toml`, then `site.toml` at the workspace root.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = std::env::var_os(ENV_VAR) {
        candidates.push(PathBuf::from(path));
    }
    candidates.push(PathBuf::from(FILE_NAME));
    candidates.push(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(FILE_NAME),
    );
    candidates
}
