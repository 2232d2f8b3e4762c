//! Per-language translation storage and change notification.

mod events;

use std::collections::HashMap;
use std::fmt;
use std::sync::{
    Arc,
    PoisonError,
    RwLock,
    RwLockReadGuard,
    RwLockWriteGuard,
};

pub use events::{
    EventEmitter,
    Subscription,
    TranslationEvent,
};

use crate::path::merge_deep;
use crate::types::Translation;

/// Mutable store state, guarded by [`TranslationStore`].
#[derive(Debug, Default)]
struct StoreState {
    /// Language lookups resolve against
    current_lang: Option<String>,
    /// Language consulted when the current one lacks a key
    fallback_lang: Option<String>,
    /// Known languages in first-seen order
    langs: Vec<String>,
    /// Translation tree per language
    translations: HashMap<String, Arc<Translation>>,
}

/// Shared state behind every clone of a store.
#[derive(Default)]
struct StoreInner {
    /// Languages and trees
    state: RwLock<StoreState>,
    /// Content of a language was set or merged
    translation_change: EventEmitter<TranslationEvent>,
    /// Current language switched
    lang_change: EventEmitter<TranslationEvent>,
    /// Fallback language switched
    fallback_lang_change: EventEmitter<TranslationEvent>,
}

/// Holds the translation tree of each language together with the current and
/// fallback language.
///
/// Clones share the same state and events; [`TranslationStore::new`] creates an
/// independent store. Events are published after the state lock is released.
#[derive(Clone, Default)]
pub struct TranslationStore {
    /// Shared state
    inner: Arc<StoreInner>,
}

impl TranslationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether both handles point at the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read access to the state.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the state.
    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get_current_lang(&self) -> Option<String> {
        self.read().current_lang.clone()
    }

    /// Sets the current language. With `emit == false` the language is only
    /// staged and no event is published.
    pub fn set_current_lang(&self, lang: &str, emit: bool) {
        self.write().current_lang = Some(lang.to_string());
        if emit {
            self.publish_lang_change(lang);
        }
    }

    #[must_use]
    pub fn get_fallback_lang(&self) -> Option<String> {
        self.read().fallback_lang.clone()
    }

    /// Sets the fallback language. With `emit == false` the language is only
    /// staged and no event is published.
    pub fn set_fallback_lang(&self, lang: &str, emit: bool) {
        self.write().fallback_lang = Some(lang.to_string());
        if emit {
            self.publish_fallback_lang_change(lang);
        }
    }

    /// Stores `translations` for `lang` and publishes a translation change.
    ///
    /// With `merge` the tree is deep-merged into the existing one, otherwise it
    /// replaces it. The language becomes known. Returns the stored tree.
    pub fn set_translations(
        &self,
        lang: &str,
        translations: Translation,
        merge: bool,
    ) -> Arc<Translation> {
        let stored = {
            let mut state = self.write();
            let tree = match state.translations.get(lang) {
                Some(existing) if merge => merge_deep(Translation::clone(existing), translations),
                _ => translations,
            };
            let tree = Arc::new(tree);
            state.translations.insert(lang.to_string(), Arc::clone(&tree));
            if !state.langs.iter().any(|known| known == lang) {
                state.langs.push(lang.to_string());
            }
            tree
        };

        tracing::debug!(lang, merge, "Translations stored");
        self.inner.translation_change.emit(&TranslationEvent {
            lang: lang.to_string(),
            translations: Arc::clone(&stored),
        });
        stored
    }

    /// The tree of `lang`, or an empty map when nothing is stored.
    #[must_use]
    pub fn get_translations(&self, lang: &str) -> Arc<Translation> {
        self.read()
            .translations
            .get(lang)
            .map_or_else(|| Arc::new(Translation::empty()), Arc::clone)
    }

    #[must_use]
    pub fn has_translation_for(&self, lang: &str) -> bool {
        self.read().translations.contains_key(lang)
    }

    /// Forgets the tree of `lang`. The language stays known.
    pub fn delete_translations(&self, lang: &str) {
        self.write().translations.remove(lang);
    }

    /// Appends languages not seen before, keeping first-seen order.
    pub fn add_languages<S: AsRef<str>>(&self, langs: &[S]) {
        let mut state = self.write();
        for lang in langs {
            let lang = lang.as_ref();
            if !state.langs.iter().any(|known| known == lang) {
                state.langs.push(lang.to_string());
            }
        }
    }

    #[must_use]
    pub fn get_languages(&self) -> Vec<String> {
        self.read().langs.clone()
    }

    #[must_use]
    pub fn on_translation_change(&self) -> &EventEmitter<TranslationEvent> {
        &self.inner.translation_change
    }

    #[must_use]
    pub fn on_lang_change(&self) -> &EventEmitter<TranslationEvent> {
        &self.inner.lang_change
    }

    #[must_use]
    pub fn on_fallback_lang_change(&self) -> &EventEmitter<TranslationEvent> {
        &self.inner.fallback_lang_change
    }

    /// Publishes a language change for `lang` with its current tree.
    pub(crate) fn publish_lang_change(&self, lang: &str) {
        let event =
            TranslationEvent { lang: lang.to_string(), translations: self.get_translations(lang) };
        self.inner.lang_change.emit(&event);
    }

    /// Publishes a fallback language change for `lang` with its current tree.
    pub(crate) fn publish_fallback_lang_change(&self, lang: &str) {
        let event =
            TranslationEvent { lang: lang.to_string(), translations: self.get_translations(lang) };
        self.inner.fallback_lang_change.emit(&event);
    }
}

impl fmt::Debug for TranslationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("TranslationStore")
            .field("current_lang", &state.current_lang)
            .field("fallback_lang", &state.fallback_lang)
            .field("langs", &state.langs)
            .field("translations", &"<HashMap<String, Translation>>")
            .finish_non_exhaustive()
    }
}
