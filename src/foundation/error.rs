/// Convenience result type used across the keyframe engine.
pub type KeyframeResult<T> = Result<T, KeyframeError>;

/// Top-level error taxonomy.
///
/// Editing invariants (removing the anchor, moving onto an occupied frame) are not
/// errors: the editing API reports them as `false`. This type covers everything that
/// has to travel further up, such as rejected imports or a failed undo.
#[derive(thiserror::Error, Debug)]
pub enum KeyframeError {
    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialized animation text that could not be used at all.
    #[error("parse error: {0}")]
    Parse(String),

    /// Parameters of one keyframe list disagree on their keyframe positions.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// A recorded step could not be replayed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Errors when serializing or deserializing settings.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KeyframeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
