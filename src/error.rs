use std::io;
use thiserror::Error;

/// Convenience wrapper around `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by load order operations.
///
/// Every failing mutation leaves the in-memory load order exactly as it was
/// before the call; none of these errors indicate a partially applied change.
#[derive(Error, Debug)]
pub enum Error {
    /// The named file is missing, has the wrong extension, or failed the
    /// plugin header check.
    #[error("\"{0}\" is not a valid plugin file")]
    InvalidPlugin(String),

    /// The requested arrangement would break a load order rule (duplicate
    /// names, a non-master before a master, or the game's master file not
    /// loading first).
    #[error("invalid load order: {0}")]
    InvalidOrder(String),

    /// Applying the change would push the active plugin count past the
    /// game's limit of 255.
    #[error("maximum number of active plugins exceeded")]
    TooManyActive,

    /// The named plugin is forced active by the game and cannot be left
    /// inactive while its file exists.
    #[error("\"{0}\" is implicitly active")]
    ImplicitActive(String),

    /// A read was requested at a position past the end of the load order.
    #[error("position {0} is past the end of the load order")]
    OutOfRange(usize),

    /// A filesystem operation failed during load or save.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A plugin file's binary header could not be parsed.
    #[error("could not parse plugin header: {0}")]
    ParseError(String),

    /// A plugin name cannot be represented in the game's manifest codepage.
    #[error("\"{0}\" cannot be encoded in Windows-1252")]
    Encode(String),
}
