use crate::el::El;
use osier_lexer::Span;

/// Errors raised during resolution and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The element could not be resolved yet. Carries the partially
    /// resolved element so callers can keep or retry it.
    #[error("unresolved element")]
    Unres(Box<El>),

    #[error("void result")]
    Void,

    #[error(transparent)]
    Typ(#[from] osier_types::TypeError),

    #[error(transparent)]
    Lit(#[from] osier_lit::LitError),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("{msg}")]
    User { msg: String, src: Span },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn unres(el: El) -> Error {
        Error::Unres(Box::new(el))
    }

    pub fn is_unres(&self) -> bool {
        matches!(self, Error::Unres(_))
    }

    /// The partially resolved element of an unresolved error.
    pub fn into_el(self) -> Result<El, Error> {
        match self {
            Error::Unres(b) => Ok(*b),
            e => Err(e),
        }
    }

    pub fn layout(msg: impl Into<String>) -> Error {
        Error::Layout(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Error {
        Error::Other(msg.into())
    }
}
