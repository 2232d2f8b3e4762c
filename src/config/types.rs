use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "fallbackLang")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// 番号付きの一覧に整形する
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Construction-time options of a translation service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslateSettings {
    /// Consult the fallback language before the missing-translation handler.
    pub use_fallback_lang: bool,

    /// Use a private store instead of the shared one.
    pub isolate: bool,

    /// Merge loaded translations into existing ones instead of replacing them.
    pub extend: bool,

    /// Initial fallback language.
    pub fallback_lang: Option<String>,

    /// Language to switch to once the service is built.
    pub lang: Option<String>,
}

impl TranslateSettings {
    /// # Errors
    /// - A language name is empty
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(lang) = &self.fallback_lang
            && lang.trim().is_empty()
        {
            errors.push(ValidationError::new(
                "fallbackLang",
                "The language cannot be empty. Please specify a language (e.g., \"en\"), or remove this field",
            ));
        }

        if let Some(lang) = &self.lang
            && lang.trim().is_empty()
        {
            errors.push(ValidationError::new(
                "lang",
                "The language cannot be empty. Please specify a language (e.g., \"en\"), or remove this field",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            use_fallback_lang: true,
            isolate: false,
            extend: false,
            fallback_lang: None,
            lang: None,
        }
    }
}
