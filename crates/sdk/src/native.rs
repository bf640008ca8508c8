//! Native engine loading
//!
//! Resolves the engine library from a [`RuntimeConfig`] and wraps the loaded
//! symbol table as a shared [`Engine`].

use std::path::Path;
use std::sync::Arc;

use topt_ffi::{Engine, EngineApi};
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// Load the engine library at `path`.
pub fn load_library(path: &Path) -> Result<Arc<dyn Engine>> {
    debug!(target: "topt::native", path = %path.display(), "loading engine library");
    let api = EngineApi::load(path)
        .map_err(|e| Error::LibraryLoad(format!("{}: {}", path.display(), e)))?;
    info!(
        target: "topt::native",
        path = %api.library_path().display(),
        "Engine library loaded"
    );
    Ok(Arc::new(api))
}

/// Load the engine library the configuration resolves to.
pub fn load_engine(config: &RuntimeConfig) -> Result<Arc<dyn Engine>> {
    load_library(&config.resolve_library())
}

impl Runtime {
    /// Runtime over the native engine located through `config`.
    ///
    /// The runtime is returned uninitialized.
    pub fn native(config: &RuntimeConfig) -> Result<Self> {
        Ok(Runtime::new(load_engine(config)?))
    }
}
