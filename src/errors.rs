use std::io;

use thiserror::Error;

/// Error initializing the probing resource.
///
/// Surfaced by [`Egtb::reconcile()`](crate::Egtb::reconcile). The context
/// stays unusable for the attempted configuration until it is changed or
/// tablebases are disabled.
#[derive(Debug, Error)]
pub enum InitError {
    /// Registering a tablebase path failed.
    #[error("could not register tablebase path {path:?}: {source}")]
    Path {
        path: std::path::PathBuf,
        #[source]
        source: io::Error,
    },
    /// The backend failed to initialize.
    #[error("tablebase initialization failed: {0}")]
    Init(#[source] io::Error),
    /// The requested cache does not fit into the address space.
    #[error("tablebase cache of {mib} MiB is too large")]
    CacheTooLarge { mib: u32 },
    /// The backend failed to allocate its cache.
    #[error("could not allocate tablebase cache of {mib} MiB: {source}")]
    Cache {
        mib: u32,
        #[source]
        source: io::Error,
    },
}

/// Reason a position cannot be translated into a query.
///
/// Absorbed by [`Egtb::probe()`](crate::Egtb::probe), which reports no
/// information instead.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum QueryError {
    /// Castling rights are present, but the castling mode does not tie them
    /// to the standard king and rook squares.
    #[error("castling rights are ambiguous in chess960")]
    AmbiguousCastling,
    /// One side has more pieces than a query can hold.
    #[error("too many pieces")]
    TooManyPieces,
}

/// Error applying an option to [`Settings`](crate::Settings).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SettingsError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("invalid value for option {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
