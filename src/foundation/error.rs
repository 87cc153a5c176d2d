/// Convenience result type used across Lumina.
pub type LuminaResult<T> = Result<T, LuminaError>;

/// Top-level error taxonomy used by compositing, persistence and pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum LuminaError {
    /// Source pixel data for a photo or template could not be materialized.
    #[error("decode error: {0}")]
    Decode(String),

    /// Degenerate geometry or malformed buffers that make compositing undefined.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Encode failure or storage I/O failure while saving an artifact.
    #[error("persist error: {0}")]
    Persist(String),

    /// Operation invoked outside the pipeline state that allows it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid configuration values or unreadable configuration files.
    #[error("config error: {0}")]
    Config(String),

    /// Work was cancelled before it reached a point of no return.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The durable history log could not be read or replayed.
    #[error("history error: {0}")]
    History(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LuminaError {
    /// Build a [`LuminaError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`LuminaError::InvalidInput`] value.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build a [`LuminaError::Persist`] value.
    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    /// Build a [`LuminaError::InvalidState`] value.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Build a [`LuminaError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`LuminaError::Cancelled`] value.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Build a [`LuminaError::History`] value.
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    /// Return `true` for [`LuminaError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
