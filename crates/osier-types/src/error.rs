/// Errors raised by type construction, unification and parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("not a type variable {0}")]
    NotVar(String),

    #[error("type variable without id")]
    NoId,

    #[error("recursive type variable @{0}")]
    Recursive(u64),

    #[error("cannot unify {0} with {1}")]
    Mismatch(String, String),

    #[error("no alternative of {0} matches {1}")]
    NoAlt(String, String),

    #[error("immature type {0}")]
    Immature(String),

    #[error("unnamed {0} not allowed")]
    Unnamed(&'static str),

    #[error("type syntax error at {pos}: {msg}")]
    Parse { msg: String, pos: usize },
}
