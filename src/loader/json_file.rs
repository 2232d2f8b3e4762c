//! Loads `<directory>/<lang><suffix>` JSON files.

use std::path::{
    Path,
    PathBuf,
};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use super::TranslateLoader;
use crate::error::LoaderError;
use crate::types::Translation;

/// Reads one JSON file per language from a directory.
///
/// # Examples
/// - `JsonFileLoader::new("assets/i18n")` loads `assets/i18n/en.json` for `en`
/// - `.with_suffix(".messages.json")` loads `assets/i18n/en.messages.json`
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    /// Directory holding the translation files
    directory: PathBuf,
    /// Appended to the language to form the file name
    suffix: String,
}

impl JsonFileLoader {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), suffix: ".json".to_string() }
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// File path for `lang`. Language names must not leave the directory.
    fn file_path(&self, lang: &str) -> Result<PathBuf, LoaderError> {
        if lang.is_empty() || lang.contains(['/', '\\']) || lang.contains("..") {
            return Err(LoaderError::Other(format!("Invalid language name '{lang}'")));
        }
        Ok(self.directory.join(format!("{lang}{}", self.suffix)))
    }
}

/// Reads and parses one translation file.
///
/// # Errors
/// Returns error if file read or JSON parse fails.
async fn load_translation_file(file_path: &Path) -> Result<Translation, LoaderError> {
    let content = tokio::fs::read_to_string(file_path).await?;
    let json: Value = serde_json::from_str(&content)?;

    tracing::debug!(file_path = %file_path.display(), "Loaded translation file");
    Ok(Translation::from_json(&json))
}

impl TranslateLoader for JsonFileLoader {
    fn get_translation(&self, lang: &str) -> BoxFuture<'static, Result<Translation, LoaderError>> {
        let file_path = self.file_path(lang);
        async move { load_translation_file(&file_path?).await }.boxed()
    }
}
