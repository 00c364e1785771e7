//! Error types for the forge core library.

#[cfg(feature = "python")]
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;

/// Top-level error enum for the forge core library.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// No extraction strategy is registered for the declared language tag.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A syntax tree could not be built. Recoverable: the analyzer degrades
    /// to pattern extraction instead of surfacing this to callers.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No template registered for {language}/{framework}/{category}")]
    NoTemplate {
        language: String,
        framework: String,
        category: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A refinement directive that could not be applied. The suite it was
/// applied to is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Directive rejected: {reason}")]
pub struct Rejected {
    pub reason: String,
}

impl Rejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "python")]
impl From<ForgeError> for PyErr {
    fn from(err: ForgeError) -> PyErr {
        match &err {
            ForgeError::UnsupportedLanguage(_) | ForgeError::NoTemplate { .. } => {
                PyValueError::new_err(err.to_string())
            }
            ForgeError::Parse(_) => PyValueError::new_err(err.to_string()),
            ForgeError::Store(_) | ForgeError::Sqlite(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            ForgeError::Io(_) => PyIOError::new_err(err.to_string()),
            ForgeError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

#[cfg(feature = "python")]
impl From<Rejected> for PyErr {
    fn from(err: Rejected) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;
