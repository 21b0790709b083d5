use std::io;

use thiserror::Error;

use crate::alert::AlertDescription;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The record layer (or this layer's own bookkeeping) hit an
    /// unrecoverable condition. Carries the alert description the caller's
    /// TLS state machine should send before tearing down the association.
    #[error("fatal: {0}")]
    Fatal(AlertDescription),

    #[error("fragment_offset + fragment_length exceeds declared message length")]
    ErrFragmentOutOfBounds,

    #[error("declared message length {length} exceeds the configured maximum {max}")]
    ErrMessageTooLarge { length: u32, max: u32 },

    #[error("{0}")]
    Io(#[source] IoError),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
