use thiserror::Error;

use crate::assemble::AssembleError;
use crate::config::ConfigError;
use crate::normalize::NormalizeError;
use crate::registry::RegistryError;
use crate::runtime::RuntimeError;
use crate::source::SourceError;
use crate::window::WindowError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A full pass over the dataset produced no windows, so restarting it
    /// would loop forever.
    #[error("dataset '{dataset}' produced no windows in a full pass")]
    NoWindows { dataset: String },
}

impl Error {
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Error::Normalize(NormalizeError::SchemaMismatch { .. }))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
