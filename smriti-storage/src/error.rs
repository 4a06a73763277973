//! `smriti-storage`'s own error type (SPEC_FULL.md §2, "Ambient
//! stack" — a `thiserror`-derived enum per crate, grounded on
//! `memory-core/src/error/mod.rs`).
//!
//! Converts into `smriti_core::Error::Storage` at the trait boundary
//! so `smriti-core` never depends on this crate's error shape.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("libsql error: {0}")]
    Libsql(#[from] libsql::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row missing expected column: {0}")]
    MissingColumn(&'static str),

    #[error("unrecognized enum value in column {column}: {value}")]
    UnrecognizedEnum { column: &'static str, value: String },
}

impl From<Error> for smriti_core::Error {
    fn from(err: Error) -> Self {
        smriti_core::Error::Storage(err.to_string())
    }
}
