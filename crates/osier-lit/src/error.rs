/// Errors raised by literal access and conversion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LitError {
    #[error("cannot convert {0} to {1}")]
    Convert(String, String),

    #[error("not an index-accessible literal: {0}")]
    NotIdxr(String),

    #[error("not a key-accessible literal: {0}")]
    NotKeyr(String),

    #[error("no element for key {0}")]
    NoKey(String),

    #[error("index {0} out of bounds")]
    IdxBounds(i64),

    #[error("invalid selection path segment {0}")]
    BadPath(String),
}
