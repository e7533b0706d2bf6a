use std::path::PathBuf;

use thiserror::Error;

use logsieve_types::Target;

/// A rule pattern that could not be compiled
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid pattern '{pattern}': {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

impl PatternError {
    pub(crate) fn new(pattern: &str, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors from editing a rule set
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("a {target} rule does not belong in the {list} list")]
    TargetMismatch { target: &'static str, list: &'static str },

    #[error("rule index {index} out of range (list has {len} rules)")]
    IndexOutOfRange { index: usize, len: usize },
}

impl FilterError {
    pub(crate) fn mismatch(target: Target, list: &'static str) -> Self {
        Self::TargetMismatch {
            target: target.as_str(),
            list,
        }
    }
}

/// Errors from loading or saving rule sets
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML read error: {0}")]
    XmlRead(#[from] quick_xml::de::DeError),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::se::SeError),

    #[error("invalid filter data: {0}")]
    Invalid(String),

    #[error("no stashed filter named '{0}'")]
    UnknownSession(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FilterError> for StoreError {
    fn from(e: FilterError) -> Self {
        Self::Invalid(e.to_string())
    }
}
