/// Convenience result type used across subrender.
pub type SubResult<T> = Result<T, SubError>;

/// Top-level error taxonomy used by decoder and coordinator APIs.
///
/// Caller bugs (acquiring twice without releasing, releasing without acquiring) are not part of
/// this taxonomy: they panic.
#[derive(thiserror::Error, Debug)]
pub enum SubError {
    /// No backend accepted the stream's codec. The stream is unusable.
    #[error("no subtitle decoder for format '{0}'")]
    NoDecoder(String),

    /// Invalid user-provided options or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A packet could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A backend refused an operation (typically `init` for an unsupported codec).
    #[error("backend error: {0}")]
    Backend(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SubError {
    /// Build a [`SubError::NoDecoder`] value.
    pub fn no_decoder(codec: impl Into<String>) -> Self {
        Self::NoDecoder(codec.into())
    }

    /// Build a [`SubError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SubError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`SubError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
