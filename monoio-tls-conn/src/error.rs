use std::io;

use rustls::pki_types::InvalidDnsNameError;
use thiserror::Error;

/// Failures surfaced while establishing or writing to a secured connection.
///
/// Read-path and close-path failures never show up here: the
/// [`TlsConnection`](crate::TlsConnection) adapter absorbs them by
/// design.
#[derive(Error, Debug)]
pub enum TlsError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("rustls error: {0}")]
    Rustls(#[from] rustls::Error),
    #[error("invalid server name: {0}")]
    InvalidName(#[from] InvalidDnsNameError),
}

impl From<TlsError> for io::Error {
    fn from(e: TlsError) -> Self {
        match e {
            TlsError::Io(e) => e,
            TlsError::Rustls(e) => io::Error::new(io::ErrorKind::Other, e),
            TlsError::InvalidName(e) => io::Error::new(io::ErrorKind::InvalidInput, e),
        }
    }
}
