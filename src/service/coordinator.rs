//! Deduplicated language loads.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};

use futures::FutureExt;
use futures::future::{
    BoxFuture,
    Shared,
};

use crate::compiler::TranslateCompiler;
use crate::error::TranslateError;
use crate::loader::TranslateLoader;
use crate::store::TranslationStore;
use crate::types::Translation;

/// A load every interested caller can await; it runs once.
pub type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Translation>, TranslateError>>>;

/// An in-flight load and the id that tells it apart from later loads of the same language.
#[derive(Clone)]
struct PendingLoad {
    /// Load id
    id: u64,
    /// The shared load
    load: SharedLoad,
}

/// In-flight loads keyed by language.
type PendingLoads = Arc<Mutex<HashMap<String, PendingLoad>>>;

/// Starts language loads, shares them between concurrent callers, compiles
/// each result once and stores it.
pub struct LoadCoordinator {
    /// Raw translation source
    loader: Arc<dyn TranslateLoader>,
    /// Applied once per completed load
    compiler: Arc<dyn TranslateCompiler>,
    /// Where loaded trees end up
    store: TranslationStore,
    /// Merge loaded trees into existing ones instead of replacing them
    extend: bool,
    /// In-flight loads
    pending: PendingLoads,
    /// Next load id
    next_id: AtomicU64,
}

impl LoadCoordinator {
    #[must_use]
    pub fn new(
        loader: Arc<dyn TranslateLoader>,
        compiler: Arc<dyn TranslateCompiler>,
        store: TranslationStore,
        extend: bool,
    ) -> Self {
        Self {
            loader,
            compiler,
            store,
            extend,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// The load needed before `lang` can be used, if any.
    ///
    /// Returns `None` when the store already holds `lang` (unless extending).
    /// Otherwise joins the in-flight load or starts a new one.
    #[must_use]
    pub fn retrieve_translations(&self, lang: &str) -> Option<SharedLoad> {
        if self.store.has_translation_for(lang) && !self.extend {
            return None;
        }
        Some(self.load(lang))
    }

    /// Joins the in-flight load of `lang` or starts a new one.
    #[must_use]
    pub fn load(&self, lang: &str) -> SharedLoad {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = pending.get(lang) {
            tracing::debug!(lang, "Joining in-flight load");
            return existing.load.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let load = self.start(lang, id);
        pending.insert(lang.to_string(), PendingLoad { id, load: load.clone() });
        load
    }

    /// The in-flight load of `lang`, if one is running.
    #[must_use]
    pub fn pending(&self, lang: &str) -> Option<SharedLoad> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(lang)
            .map(|pending| pending.load.clone())
    }

    /// Forgets the in-flight load of `lang`. A load that is already running
    /// still completes for its current waiters.
    pub fn reset(&self, lang: &str) {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(lang);
    }

    /// Calls the loader and wraps the rest of the pipeline in a shared future.
    fn start(&self, lang: &str, id: u64) -> SharedLoad {
        tracing::debug!(lang, id, "Starting translation load");
        let fetch = self.loader.get_translation(lang);
        let compiler = Arc::clone(&self.compiler);
        let store = self.store.clone();
        let pending = Arc::clone(&self.pending);
        let extend = self.extend;
        let lang = lang.to_string();

        async move {
            let result = match fetch.await {
                Ok(raw) => {
                    let compiled = compiler.compile_translations(raw, &lang);
                    Ok(store.set_translations(&lang, compiled, extend))
                }
                Err(source) => {
                    tracing::warn!(lang = %lang, %source, "Translation load failed");
                    Err(TranslateError::Load { lang: lang.clone(), source })
                }
            };
            settle(&pending, &lang, id);
            result
        }
        .boxed()
        .shared()
    }
}

/// Removes the pending entry of `lang` if it still belongs to load `id`.
fn settle(pending: &PendingLoads, lang: &str, id: u64) {
    let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
    if pending.get(lang).is_some_and(|entry| entry.id == id) {
        pending.remove(lang);
    }
}

impl fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("extend", &self.extend)
            .field("pending", &"<HashMap<String, SharedLoad>>")
            .finish_non_exhaustive()
    }
}
