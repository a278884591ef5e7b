//! Stream error type.

use std::fmt::Display;

/// Error signal carried by a stream's terminal `error` notification.
///
/// Errors are cloned to every observer of a multicast source, so they carry
/// rendered messages rather than boxed sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A source failed to produce its value (e.g. a texture could not be decoded).
    #[error("{origin} failed: {message}")]
    SourceFailed {
        /// Name of the failing source.
        origin: String,
        /// Human-readable failure description.
        message: String,
    },
}

impl StreamError {
    /// Build a [`StreamError::SourceFailed`] from any displayable cause.
    pub fn source_failed(origin: impl Into<String>, cause: impl Display) -> Self {
        Self::SourceFailed {
            origin: origin.into(),
            message: cause.to_string(),
        }
    }
}
