//! Sources of raw per-language translations.

mod json_file;

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

pub use json_file::JsonFileLoader;

use crate::error::LoaderError;
use crate::types::Translation;

/// Produces the raw translation tree of a language.
///
/// Called at most once per load; concurrent requests for the same language
/// share that single call.
pub trait TranslateLoader: Send + Sync {
    fn get_translation(&self, lang: &str) -> BoxFuture<'static, Result<Translation, LoaderError>>;
}

impl<T: TranslateLoader + ?Sized> TranslateLoader for Arc<T> {
    fn get_translation(&self, lang: &str) -> BoxFuture<'static, Result<Translation, LoaderError>> {
        (**self).get_translation(lang)
    }
}

/// Loads nothing: every language starts out empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeLoader;

impl TranslateLoader for FakeLoader {
    fn get_translation(&self, _lang: &str) -> BoxFuture<'static, Result<Translation, LoaderError>> {
        futures::future::ready(Ok(Translation::empty())).boxed()
    }
}
