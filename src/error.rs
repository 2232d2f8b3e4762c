//! Error types for translation resolution and loading.

use thiserror::Error;

/// Errors produced by a [`TranslateLoader`](crate::loader::TranslateLoader).
///
/// Messages are stored as strings so a single failure can be handed to every
/// caller waiting on the same shared load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// Error when failing to read the translation source
    #[error("Failed to read translation file: {0}")]
    Io(String),
    /// Error when the translation source is not valid JSON
    #[error("Failed to parse translations: {0}")]
    Parse(String),
    /// Any other loader specific failure
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for LoaderError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

/// Errors surfaced by [`TranslateService`](crate::service::TranslateService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// An empty key (or empty batch) was passed to a lookup operation
    #[error("Parameter \"key\" is required and cannot be empty (in `{operation}`)")]
    EmptyKey {
        /// Name of the operation that rejected the key
        operation: &'static str,
    },
    /// A string-form interpolation parameter did not parse into an object
    #[error("Wrong interpolation parameter. Expected a valid object, received: {raw}")]
    InvalidParams {
        /// The raw parameter text as received
        raw: String,
    },
    /// The loader failed for a language
    #[error("Failed to load translations for '{lang}': {source}")]
    Load {
        /// Language whose load failed
        lang: String,
        /// Underlying loader failure
        #[source]
        source: LoaderError,
    },
    /// The task driving a load stopped before producing a result
    #[error("Loading translations for '{lang}' was interrupted")]
    Interrupted {
        /// Language whose load was interrupted
        lang: String,
    },
    /// A write needed a language but none was given and none is current
    #[error("No language given and no current language is set")]
    NoCurrentLang,
}
