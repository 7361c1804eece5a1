use thiserror::Error;

/// Errors surfaced by the public [`crate::Shuffler`] API.
///
/// Internal plumbing (bucket file I/O, retry loops) works in terms of
/// `anyhow::Result` the way the rest of this crate's file-handling code
/// does; it is converted to [`ShufflerError::Io`] at the boundary.
#[derive(Debug, Error)]
pub enum ShufflerError {
    #[error("add() cannot be called after iterate() has started")]
    AlreadyReadOnly,

    #[error("key {key} does not fit in an unsigned 128-bit hkey")]
    KeyOutOfRange { key: i128 },

    #[error("duplicate keys detected during iteration (hkey={hkey})")]
    DuplicateKeys {
        hkey: u128,
        first: Vec<u8>,
        second: Vec<u8>,
    },

    #[error("io error")]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for ShufflerError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<std::io::Error>() {
            Ok(io_err) => ShufflerError::Io(io_err),
            Err(e) => ShufflerError::Io(std::io::Error::other(e.to_string())),
        }
    }
}
