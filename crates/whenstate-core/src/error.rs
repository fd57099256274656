use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("evaluation failed: {message}")]
    Evaluation { message: String },

    #[error("invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported flag {flag:?} in pattern {pattern}")]
    PatternFlag { pattern: String, flag: char },

    #[error("cannot apply {key}: {message}")]
    Apply { key: String, message: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    #[error("registration of {name:?} rejected: {message}")]
    Registry { name: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn apply(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Apply {
            key: key.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn registry(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registry {
            name: name.into(),
            message: message.into(),
        }
    }
}
