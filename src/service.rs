//! The translation service: language switching, key resolution and streams.

mod coordinator;
mod stream;

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};

use futures::channel::mpsc;
use futures::future::{
    self,
    BoxFuture,
};
use futures::{
    FutureExt,
    StreamExt,
};
use tokio::runtime::Handle;

pub use coordinator::{
    LoadCoordinator,
    SharedLoad,
};
pub use stream::TranslationStream;

use crate::compiler::{
    NoopCompiler,
    TranslateCompiler,
};
use crate::config::{
    ConfigManager,
    TranslateSettings,
};
use crate::error::TranslateError;
use crate::loader::{
    FakeLoader,
    TranslateLoader,
};
use crate::missing::{
    DefaultMissingHandler,
    MissingTranslationHandler,
    MissingTranslationParams,
};
use crate::parser::{
    DefaultParser,
    TranslateParser,
    run_interpolation,
};
use crate::path::{
    get_value,
    insert_value,
};
use crate::store::{
    EventEmitter,
    Subscription,
    TranslationEvent,
    TranslationStore,
};
use crate::types::{
    Deferred,
    Keys,
    Params,
    Resolution,
    Translation,
};

/// Result of a language switch or load: the language's tree once available.
pub type LangFuture = BoxFuture<'static, Result<Arc<Translation>, TranslateError>>;

/// Result of [`TranslateService::get`].
pub type ResolutionFuture = BoxFuture<'static, Result<Resolution, TranslateError>>;

/// State shared by every clone of a service.
struct ServiceInner {
    /// Languages, trees and events
    store: TranslationStore,
    /// In-flight loads
    loads: LoadCoordinator,
    /// Applied to values written through `set` and `set_translation`
    compiler: Arc<dyn TranslateCompiler>,
    /// Renders resolved values
    parser: Arc<dyn TranslateParser>,
    /// Consulted for keys found in neither language
    missing_handler: Arc<dyn MissingTranslationHandler>,
    /// Look keys up in the fallback language before giving up
    use_fallback_lang: bool,
    /// Merge instead of replace
    extend: bool,
    /// Most recent `use_lang` request
    last_use_lang: Mutex<Option<String>>,
    /// Most recent `set_fallback_lang` request
    last_fallback_lang: Mutex<Option<String>>,
}

/// Resolves translation keys against a [`TranslationStore`].
///
/// Cloning is cheap and clones share everything, including the store.
/// Operations that start loads (`use_lang`, `set_fallback_lang`, `reload_lang`)
/// drive them on the current Tokio runtime; outside a runtime the returned
/// future has to be awaited for the load to happen.
#[derive(Clone)]
pub struct TranslateService {
    /// Shared state
    inner: Arc<ServiceInner>,
}

impl TranslateService {
    #[must_use]
    pub fn builder() -> TranslateServiceBuilder {
        TranslateServiceBuilder::default()
    }

    /// The store this service reads from and writes to.
    #[must_use]
    pub fn store(&self) -> &TranslationStore {
        &self.inner.store
    }

    #[must_use]
    pub fn get_current_lang(&self) -> Option<String> {
        self.inner.store.get_current_lang()
    }

    #[must_use]
    pub fn get_fallback_lang(&self) -> Option<String> {
        self.inner.store.get_fallback_lang()
    }

    /// Switches the current language, loading it first if needed.
    ///
    /// When no language is current yet, `lang` becomes current immediately
    /// without an event so lookups made during the load already target it.
    /// Otherwise the current language only changes once the tree is available,
    /// and only if no later `use_lang` call asked for another language.
    pub fn use_lang(&self, lang: &str) -> LangFuture {
        *self.inner.last_use_lang.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(lang.to_string());

        let store = &self.inner.store;
        let current = store.get_current_lang();
        if current.as_deref() == Some(lang) {
            if let Some(pending) = self.inner.loads.pending(lang) {
                return pending.boxed();
            }
            if store.has_translation_for(lang) {
                return future::ready(Ok(store.get_translations(lang))).boxed();
            }
        }
        if current.is_none() {
            store.set_current_lang(lang, false);
        }

        match self.inner.loads.retrieve_translations(lang) {
            Some(load) => {
                let service = self.clone();
                let requested = lang.to_string();
                spawn_load(
                    lang,
                    async move {
                        let translations = load.await?;
                        service.change_lang(&requested);
                        Ok(translations)
                    }
                    .boxed(),
                )
            }
            None => {
                self.change_lang(lang);
                future::ready(Ok(store.get_translations(lang))).boxed()
            }
        }
    }

    /// Makes `lang` current unless a later `use_lang` superseded it.
    fn change_lang(&self, lang: &str) {
        {
            let last = self.inner.last_use_lang.lock().unwrap_or_else(PoisonError::into_inner);
            if last.as_deref() != Some(lang) {
                tracing::warn!(lang, latest = ?*last, "Dropping superseded language switch");
                return;
            }
            self.inner.store.set_current_lang(lang, false);
        }

        tracing::debug!(lang, "Current language changed");
        self.inner.store.publish_lang_change(lang);

        if self.inner.store.get_fallback_lang().is_none() {
            *self.inner.last_fallback_lang.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(lang.to_string());
            self.change_fallback_lang(lang);
        }
    }

    /// Sets the language consulted for keys missing in the current one,
    /// loading it first if needed.
    pub fn set_fallback_lang(&self, lang: &str) -> LangFuture {
        *self.inner.last_fallback_lang.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(lang.to_string());

        let store = &self.inner.store;
        let fallback = store.get_fallback_lang();
        if fallback.as_deref() == Some(lang) {
            if let Some(pending) = self.inner.loads.pending(lang) {
                return pending.boxed();
            }
            if store.has_translation_for(lang) {
                return future::ready(Ok(store.get_translations(lang))).boxed();
            }
        }

        match self.inner.loads.retrieve_translations(lang) {
            Some(load) => {
                if fallback.is_none() {
                    store.set_fallback_lang(lang, false);
                }
                let service = self.clone();
                let requested = lang.to_string();
                spawn_load(
                    lang,
                    async move {
                        let translations = load.await?;
                        service.change_fallback_lang(&requested);
                        Ok(translations)
                    }
                    .boxed(),
                )
            }
            None => {
                self.change_fallback_lang(lang);
                future::ready(Ok(store.get_translations(lang))).boxed()
            }
        }
    }

    /// Makes `lang` the fallback unless a later request superseded it.
    fn change_fallback_lang(&self, lang: &str) {
        {
            let last = self.inner.last_fallback_lang.lock().unwrap_or_else(PoisonError::into_inner);
            if last.as_deref() != Some(lang) {
                tracing::warn!(lang, latest = ?*last, "Dropping superseded fallback language switch");
                return;
            }
            self.inner.store.set_fallback_lang(lang, false);
        }

        tracing::debug!(lang, "Fallback language changed");
        self.inner.store.publish_fallback_lang_change(lang);
    }

    /// Stores a tree for `lang` after compiling it. Merges with the existing
    /// tree when `merge` is set or the service extends.
    pub fn set_translation(&self, lang: &str, translations: impl Into<Translation>, merge: bool) {
        let compiled = self.inner.compiler.compile_translations(translations.into(), lang);
        self.inner.store.set_translations(lang, compiled, merge || self.inner.extend);
    }

    /// Writes a single value at `key`, replacing whatever was there.
    ///
    /// # Errors
    /// - `lang` is `None` and no language is current
    pub fn set(
        &self,
        key: &str,
        value: impl Into<Translation>,
        lang: Option<&str>,
    ) -> Result<(), TranslateError> {
        let lang = match lang {
            Some(lang) => lang.to_string(),
            None => self.get_current_lang().ok_or(TranslateError::NoCurrentLang)?,
        };

        let compiled = match value.into() {
            Translation::Text(text) => self.inner.compiler.compile(&text, &lang),
            other => self.inner.compiler.compile_translations(other, &lang),
        };
        let tree = insert_value(&self.inner.store.get_translations(&lang), key, compiled);
        self.inner.store.set_translations(&lang, tree, false);
        Ok(())
    }

    /// Resolves `keys` against `translations`.
    ///
    /// A key missing there is looked up in the fallback language (when enabled
    /// and different from the current one), then handed to the missing
    /// translation handler. The result is interpolated with `params`; if
    /// nothing can be rendered the key itself is returned.
    ///
    /// A batch is [`Deferred::Pending`] as soon as one of its keys is.
    #[must_use]
    pub fn get_parsed_result(
        &self,
        translations: &Translation,
        keys: &Keys,
        params: Option<&Params>,
    ) -> Deferred<Resolution> {
        match keys {
            Keys::One(key) => self.resolve_key(translations, key, params).map(Resolution::One),
            Keys::Many(keys) => {
                let entries: Vec<(String, Deferred<Translation>)> = unique(keys)
                    .into_iter()
                    .map(|key| (key.to_string(), self.resolve_key(translations, key, params)))
                    .collect();

                if entries.iter().all(|(_, value)| value.is_ready()) {
                    return Deferred::Ready(Resolution::Many(
                        entries
                            .into_iter()
                            .filter_map(|(key, value)| value.ready().map(|value| (key, value)))
                            .collect(),
                    ));
                }

                let (keys, values): (Vec<String>, Vec<Deferred<Translation>>) =
                    entries.into_iter().unzip();
                Deferred::Pending(
                    async move {
                        let values =
                            future::join_all(values.into_iter().map(Deferred::into_future)).await;
                        Resolution::Many(keys.into_iter().zip(values).collect())
                    }
                    .boxed(),
                )
            }
        }
    }

    /// Resolves a single key; see [`get_parsed_result`](Self::get_parsed_result).
    fn resolve_key(
        &self,
        translations: &Translation,
        key: &str,
        params: Option<&Params>,
    ) -> Deferred<Translation> {
        let found =
            get_value(translations, key).map(Cow::into_owned).or_else(|| self.fallback_value(key));

        let resolved = match found {
            Some(value) => Deferred::Ready(Some(value)),
            None => {
                let missing =
                    MissingTranslationParams { key, service: self, interpolate_params: params };
                match self.inner.missing_handler.handle(&missing) {
                    Some(Deferred::Ready(value)) => Deferred::Ready(Some(value)),
                    Some(Deferred::Pending(value)) => Deferred::Pending(value.map(Some).boxed()),
                    None => Deferred::Ready(None),
                }
            }
        };

        let parser = Arc::clone(&self.inner.parser);
        let params = params.cloned();
        let key = key.to_string();
        resolved.map(move |value| {
            value
                .and_then(|value| run_interpolation(parser.as_ref(), &value, params.as_ref()))
                .unwrap_or(Translation::Text(key))
        })
    }

    /// `key` in the fallback language, if it applies.
    fn fallback_value(&self, key: &str) -> Option<Translation> {
        if !self.inner.use_fallback_lang {
            return None;
        }
        let fallback = self.inner.store.get_fallback_lang()?;
        if self.inner.store.get_current_lang().as_deref() == Some(fallback.as_str()) {
            return None;
        }
        let translations = self.inner.store.get_translations(&fallback);
        get_value(translations.as_ref(), key).map(Cow::into_owned)
    }

    /// Tree of the current language; empty when none is set.
    fn current_translations(&self) -> Arc<Translation> {
        self.get_current_lang().map_or_else(
            || Arc::new(Translation::empty()),
            |lang| self.inner.store.get_translations(&lang),
        )
    }

    /// Resolves `keys` in the current language, waiting for its load if one
    /// is in flight.
    ///
    /// # Errors
    /// - `keys` is empty (returned immediately, not through the future)
    ///
    /// The future fails if the awaited load fails.
    pub fn get(
        &self,
        keys: impl Into<Keys>,
        params: Option<&Params>,
    ) -> Result<ResolutionFuture, TranslateError> {
        let keys = keys.into();
        keys.ensure_present("get")?;
        Ok(self.resolve_when_loaded(keys, params))
    }

    /// Resolves against the current language once its pending load, if any, completes.
    fn resolve_when_loaded(&self, keys: Keys, params: Option<&Params>) -> ResolutionFuture {
        let pending = self.get_current_lang().and_then(|lang| self.inner.loads.pending(&lang));
        match pending {
            Some(load) => {
                let service = self.clone();
                let params = params.cloned();
                async move {
                    let translations = load.await?;
                    let resolution = service
                        .get_parsed_result(&translations, &keys, params.as_ref())
                        .into_future()
                        .await;
                    Ok(resolution)
                }
                .boxed()
            }
            None => self
                .get_parsed_result(&self.current_translations(), &keys, params)
                .map(Ok::<_, TranslateError>)
                .into_future(),
        }
    }

    /// Resolves `keys` against what is stored right now.
    ///
    /// When the resolution would have to wait (an asynchronous missing
    /// translation handler), the bare key is returned. For a batch every key
    /// is then returned bare.
    ///
    /// # Errors
    /// - `keys` is empty
    pub fn instant(
        &self,
        keys: impl Into<Keys>,
        params: Option<&Params>,
    ) -> Result<Resolution, TranslateError> {
        let keys = keys.into();
        keys.ensure_present("instant")?;

        let translations = self.current_translations();
        let resolution = self.get_parsed_result(&translations, &keys, params).ready();

        Ok(resolution.unwrap_or_else(|| match &keys {
            Keys::One(key) => Resolution::One(Translation::Text(key.clone())),
            Keys::Many(keys) => Resolution::Many(
                unique(keys)
                    .into_iter()
                    .map(|key| (key.to_string(), Translation::Text(key.to_string())))
                    .collect(),
            ),
        }))
    }

    /// Emits the [`get`](Self::get) result, then re-resolves `keys` against
    /// the new tree on every language change.
    ///
    /// # Errors
    /// - `keys` is empty
    pub fn stream(
        &self,
        keys: impl Into<Keys>,
        params: Option<&Params>,
    ) -> Result<TranslationStream, TranslateError> {
        let keys = keys.into();
        keys.ensure_present("stream")?;
        Ok(self.event_stream(self.inner.store.on_lang_change(), |_| true, keys, params))
    }

    /// Emits the [`get`](Self::get) result, then re-resolves `keys` every time
    /// the translations of the current language change.
    ///
    /// # Errors
    /// - `keys` is empty
    pub fn get_stream_on_translation_change(
        &self,
        keys: impl Into<Keys>,
        params: Option<&Params>,
    ) -> Result<TranslationStream, TranslateError> {
        let keys = keys.into();
        keys.ensure_present("get_stream_on_translation_change")?;
        let store = self.inner.store.clone();
        Ok(self.event_stream(
            self.inner.store.on_translation_change(),
            move |event| store.get_current_lang().as_deref() == Some(event.lang.as_str()),
            keys,
            params,
        ))
    }

    /// Initial resolution followed by one per accepted event of `events`.
    fn event_stream(
        &self,
        events: &EventEmitter<TranslationEvent>,
        accept: impl Fn(&TranslationEvent) -> bool + Send + Sync + 'static,
        keys: Keys,
        params: Option<&Params>,
    ) -> TranslationStream {
        let (sender, receiver) = mpsc::unbounded();
        let subscription: Subscription = events.subscribe(move |event| {
            if accept(event) && sender.unbounded_send(event.clone()).is_err() {
                tracing::trace!(lang = %event.lang, "Stream receiver already dropped");
            }
        });

        let first = self.resolve_when_loaded(keys.clone(), params);
        let service = self.clone();
        let params = params.cloned();
        let updates = receiver
            .then(move |event: TranslationEvent| {
                service
                    .get_parsed_result(&event.translations, &keys, params.as_ref())
                    .map(Ok::<_, TranslateError>)
                    .into_future()
            })
            .boxed();

        TranslationStream::new(first, updates, subscription)
    }

    /// Registers languages without loading them.
    pub fn add_langs<S: AsRef<str>>(&self, langs: &[S]) {
        self.inner.store.add_languages(langs);
    }

    #[must_use]
    pub fn get_langs(&self) -> Vec<String> {
        self.inner.store.get_languages()
    }

    /// Forgets the in-flight load and the stored tree of `lang`.
    pub fn reset_lang(&self, lang: &str) {
        tracing::debug!(lang, "Resetting language");
        self.inner.loads.reset(lang);
        self.inner.store.delete_translations(lang);
    }

    /// Resets `lang` and loads it again.
    pub fn reload_lang(&self, lang: &str) -> LangFuture {
        self.reset_lang(lang);
        spawn_load(lang, self.inner.loads.load(lang).boxed())
    }

    #[must_use]
    pub fn on_translation_change(&self) -> &EventEmitter<TranslationEvent> {
        self.inner.store.on_translation_change()
    }

    #[must_use]
    pub fn on_lang_change(&self) -> &EventEmitter<TranslationEvent> {
        self.inner.store.on_lang_change()
    }

    #[must_use]
    pub fn on_fallback_lang_change(&self) -> &EventEmitter<TranslationEvent> {
        self.inner.store.on_fallback_lang_change()
    }
}

impl fmt::Debug for TranslateService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslateService")
            .field("store", &self.inner.store)
            .field("use_fallback_lang", &self.inner.use_fallback_lang)
            .field("extend", &self.inner.extend)
            .finish_non_exhaustive()
    }
}

/// Keys in request order with later duplicates removed.
fn unique(keys: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    keys.iter().map(String::as_str).filter(|key| seen.insert(*key)).collect()
}

/// Drives `load` on the current runtime so it makes progress even if the
/// returned future is dropped. Outside a runtime `load` is returned as is.
fn spawn_load(lang: &str, load: LangFuture) -> LangFuture {
    let Ok(handle) = Handle::try_current() else {
        tracing::debug!(lang, "No Tokio runtime; load runs when awaited");
        return load;
    };

    let task = handle.spawn(load);
    let lang = lang.to_string();
    async move {
        task.await.unwrap_or_else(|error| {
            tracing::warn!(lang = %lang, %error, "Load task stopped");
            Err(TranslateError::Interrupted { lang })
        })
    }
    .boxed()
}

/// Configures and creates a [`TranslateService`].
#[derive(Default)]
pub struct TranslateServiceBuilder {
    /// Flags and initial languages
    settings: TranslateSettings,
    /// Store to share, unless isolated
    store: Option<TranslationStore>,
    /// Defaults to [`FakeLoader`]
    loader: Option<Arc<dyn TranslateLoader>>,
    /// Defaults to [`NoopCompiler`]
    compiler: Option<Arc<dyn TranslateCompiler>>,
    /// Defaults to [`DefaultParser`]
    parser: Option<Arc<dyn TranslateParser>>,
    /// Defaults to [`DefaultMissingHandler`]
    missing_handler: Option<Arc<dyn MissingTranslationHandler>>,
}

impl TranslateServiceBuilder {
    /// Replaces every flag and initial language at once.
    #[must_use]
    pub fn settings(mut self, settings: TranslateSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Takes the settings a [`ConfigManager`] loaded from `.translate.json`.
    #[must_use]
    pub fn config(self, manager: &ConfigManager) -> Self {
        self.settings(manager.settings().clone())
    }

    /// Shares `store` with other services. Ignored when isolated.
    #[must_use]
    pub fn store(mut self, store: TranslationStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn TranslateLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    #[must_use]
    pub fn compiler(mut self, compiler: Arc<dyn TranslateCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn TranslateParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    #[must_use]
    pub fn missing_handler(mut self, handler: Arc<dyn MissingTranslationHandler>) -> Self {
        self.missing_handler = Some(handler);
        self
    }

    #[must_use]
    pub const fn use_fallback_lang(mut self, enabled: bool) -> Self {
        self.settings.use_fallback_lang = enabled;
        self
    }

    #[must_use]
    pub const fn isolate(mut self, enabled: bool) -> Self {
        self.settings.isolate = enabled;
        self
    }

    #[must_use]
    pub const fn extend(mut self, enabled: bool) -> Self {
        self.settings.extend = enabled;
        self
    }

    #[must_use]
    pub fn fallback_lang(mut self, lang: impl Into<String>) -> Self {
        self.settings.fallback_lang = Some(lang.into());
        self
    }

    #[must_use]
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.settings.lang = Some(lang.into());
        self
    }

    /// Creates the service, then applies the initial fallback language and
    /// language. Their loads run in the background on the current runtime.
    #[must_use]
    pub fn build(self) -> TranslateService {
        let settings = self.settings;
        let store = match self.store {
            Some(store) if !settings.isolate => store,
            _ => TranslationStore::new(),
        };
        let compiler = self.compiler.unwrap_or_else(|| Arc::new(NoopCompiler));
        let loader = self.loader.unwrap_or_else(|| Arc::new(FakeLoader));
        let loads =
            LoadCoordinator::new(loader, Arc::clone(&compiler), store.clone(), settings.extend);

        let service = TranslateService {
            inner: Arc::new(ServiceInner {
                store,
                loads,
                compiler,
                parser: self.parser.unwrap_or_else(|| Arc::new(DefaultParser)),
                missing_handler: self
                    .missing_handler
                    .unwrap_or_else(|| Arc::new(DefaultMissingHandler)),
                use_fallback_lang: settings.use_fallback_lang,
                extend: settings.extend,
                last_use_lang: Mutex::new(None),
                last_fallback_lang: Mutex::new(None),
            }),
        };
        tracing::debug!(
            isolate = settings.isolate,
            extend = settings.extend,
            use_fallback_lang = settings.use_fallback_lang,
            "Translate service created"
        );

        if let Some(lang) = &settings.fallback_lang {
            drop(service.set_fallback_lang(lang));
        }
        if let Some(lang) = &settings.lang {
            drop(service.use_lang(lang));
        }
        service
    }
}

impl fmt::Debug for TranslateServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslateServiceBuilder")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
