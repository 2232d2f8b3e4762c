//! Policy for keys that resolve in neither the current nor the fallback language.

use crate::service::TranslateService;
use crate::types::{
    Deferred,
    Params,
    Translation,
};

/// What a [`MissingTranslationHandler`] is told about a failed lookup.
#[derive(Debug, Clone, Copy)]
pub struct MissingTranslationParams<'a> {
    /// The key that could not be resolved
    pub key: &'a str,
    /// The service performing the lookup
    pub service: &'a TranslateService,
    /// Parameters the caller asked to interpolate with
    pub interpolate_params: Option<&'a Params>,
}

/// Produces a substitute for a missing translation.
///
/// Returning `None` makes the service fall back to the key itself. A
/// [`Deferred::Pending`] result is awaited by `get` and `stream`, while
/// `instant` answers with the key instead of waiting.
pub trait MissingTranslationHandler: Send + Sync {
    fn handle(&self, params: &MissingTranslationParams<'_>) -> Option<Deferred<Translation>>;
}

impl<F> MissingTranslationHandler for F
where
    F: Fn(&MissingTranslationParams<'_>) -> Option<Deferred<Translation>> + Send + Sync,
{
    fn handle(&self, params: &MissingTranslationParams<'_>) -> Option<Deferred<Translation>> {
        self(params)
    }
}

/// Displays the key itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMissingHandler;

impl MissingTranslationHandler for DefaultMissingHandler {
    fn handle(&self, params: &MissingTranslationParams<'_>) -> Option<Deferred<Translation>> {
        tracing::trace!(key = params.key, "Missing translation");
        Some(Deferred::Ready(Translation::Text(params.key.to_string())))
    }
}
