use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// Invalid batch/shard/shuffle sizing or weights. Raised at construction.
    #[error("invalid assembler configuration: {0}")]
    Configuration(String),

    /// A previous pull failed; the assembler emits nothing further.
    #[error("batch assembly halted after an earlier error")]
    Halted,
}
