use std::sync::OnceLock;

use super::{Registry, RegistryError};

// One frozen registry per process.
static GLOBAL_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Installs the process-wide registry. Succeeds at most once.
pub fn install(registry: Registry) -> Result<&'static Registry, RegistryError> {
    let mut installed = false;
    let current = GLOBAL_REGISTRY.get_or_init(|| {
        installed = true;
        registry
    });
    if installed {
        Ok(current)
    } else {
        Err(RegistryError::AlreadyInstalled)
    }
}

/// The installed registry, if any.
pub fn global() -> Option<&'static Registry> {
    GLOBAL_REGISTRY.get()
}
