use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dataset '{0}' is already registered")]
    DuplicateDataset(String),

    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("invalid spec for dataset '{id}': {reason}")]
    InvalidSpec { id: String, reason: String },

    #[error("a global registry is already installed")]
    AlreadyInstalled,
}
