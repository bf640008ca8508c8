//! Runtime configuration via `test-optimization.toml`
//!
//! The file is optional. Every field has a default, so an empty file (or no
//! file at all) yields a configuration that loads the engine library from the
//! platform search path and initializes it with the process working directory.
//!
//! `TEST_OPTIMIZATION_SDK_NATIVE_SEARCH_PATH`, when set, replaces
//! `library.search_path`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::runtime::InitOptions;

/// Config file name looked up by callers that keep one next to their project.
pub const CONFIG_FILE_NAME: &str = "test-optimization.toml";

/// Environment variable naming a directory that holds the engine library.
pub const NATIVE_SEARCH_PATH_ENV: &str = "TEST_OPTIMIZATION_SDK_NATIVE_SEARCH_PATH";

/// File name of the engine library on this platform.
#[cfg(target_os = "macos")]
pub const LIBRARY_FILE_NAME: &str = "libtestoptimization.dylib";
/// File name of the engine library on this platform.
#[cfg(target_os = "windows")]
pub const LIBRARY_FILE_NAME: &str = "testoptimization.dll";
/// File name of the engine library on this platform.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const LIBRARY_FILE_NAME: &str = "libtestoptimization.so";

/// Where to look for the engine library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory searched first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_path: Option<PathBuf>,
    /// Directory shipped alongside the application, searched second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled_dir: Option<PathBuf>,
}

/// Runtime configuration loaded from `test-optimization.toml`.
///
/// # Example
///
/// ```toml
/// use_mock_tracer = false
/// working_directory = "/src/project"
///
/// [library]
/// search_path = "/opt/test-optimization/lib"
///
/// [environment_variables]
/// DD_SERVICE = "my-service"
///
/// [global_tags]
/// team = "infra"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub library: LibraryConfig,
    /// Working directory reported to the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    /// Record spans in memory instead of sending them
    #[serde(default)]
    pub use_mock_tracer: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub global_tags: BTreeMap<String, String>,
}

impl RuntimeConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`. An empty value is ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(NATIVE_SEARCH_PATH_ENV).filter(|p| !p.is_empty()) {
            self.library.search_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Candidate library locations, in lookup order. The last entry is the
    /// bare file name, left to the platform loader's own search.
    pub fn library_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(dir) = &self.library.search_path {
            candidates.push(dir.join(LIBRARY_FILE_NAME));
        }
        if let Some(dir) = &self.library.bundled_dir {
            candidates.push(dir.join(LIBRARY_FILE_NAME));
        }
        candidates.push(PathBuf::from(LIBRARY_FILE_NAME));
        candidates
    }

    /// First candidate that exists on disk, falling back to the bare name.
    pub fn resolve_library(&self) -> PathBuf {
        let candidates = self.library_candidates();
        let fallback = PathBuf::from(LIBRARY_FILE_NAME);
        candidates
            .into_iter()
            .find(|path| path.is_file())
            .unwrap_or(fallback)
    }

    /// Init options carrying this configuration's defaults.
    pub fn init_options(&self) -> InitOptions {
        InitOptions {
            working_directory: self.working_directory.clone(),
            environment_variables: self.environment_variables.clone(),
            global_tags: self.global_tags.clone(),
            use_mock_tracer: self.use_mock_tracer,
            ..InitOptions::default()
        }
    }
}
