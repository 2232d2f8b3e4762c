//! Translation service behavior through the public API

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

use std::collections::{
    HashMap,
    HashSet,
};
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};

use futures::future::BoxFuture;
use futures::{
    FutureExt,
    StreamExt,
};
use googletest::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{
    Value,
    json,
};
use tokio::sync::oneshot;
use translate_core::{
    ConfigManager,
    Deferred,
    JsonFileLoader,
    Keys,
    LoaderError,
    MissingTranslationParams,
    NoopCompiler,
    Resolution,
    Subscription,
    TemplateCompiler,
    TranslateCompiler,
    TranslateError,
    TranslateLoader,
    TranslateService,
    Translation,
    TranslationEvent,
    TranslationStore,
};

/// Loader serving fixed JSON per language, with call counting, gated
/// completion and one-shot failures.
#[derive(Default)]
struct ScriptedLoader {
    translations: HashMap<String, Value>,
    calls: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    fail_once: Mutex<HashSet<String>>,
}

impl ScriptedLoader {
    fn new() -> Self {
        Self::default()
    }

    fn with(mut self, lang: &str, translations: Value) -> Self {
        self.translations.insert(lang.to_string(), translations);
        self
    }

    /// The next load of `lang` completes only once the returned sender fires.
    fn gate(&self, lang: &str) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.gates.lock().unwrap().insert(lang.to_string(), receiver);
        sender
    }

    /// The next load of `lang` fails.
    fn fail_next(&self, lang: &str) {
        self.fail_once.lock().unwrap().insert(lang.to_string());
    }

    fn calls(&self, lang: &str) -> usize {
        self.calls.lock().unwrap().get(lang).copied().unwrap_or_default()
    }
}

impl TranslateLoader for ScriptedLoader {
    fn get_translation(&self, lang: &str) -> BoxFuture<'static, Result<Translation, LoaderError>> {
        *self.calls.lock().unwrap().entry(lang.to_string()).or_default() += 1;

        let gate = self.gates.lock().unwrap().remove(lang);
        let result = if self.fail_once.lock().unwrap().remove(lang) {
            Err(LoaderError::Other(format!("Unavailable: {lang}")))
        } else {
            Ok(self.translations.get(lang).map_or_else(Translation::empty, Translation::from_json))
        };

        async move {
            if let Some(gate) = gate {
                gate.await.ok();
            }
            result
        }
        .boxed()
    }
}

#[derive(Default)]
struct CountingCompiler {
    calls: AtomicUsize,
}

impl TranslateCompiler for CountingCompiler {
    fn compile(&self, value: &str, lang: &str) -> Translation {
        NoopCompiler.compile(value, lang)
    }

    fn compile_translations(&self, translations: Translation, lang: &str) -> Translation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        NoopCompiler.compile_translations(translations, lang)
    }
}

fn service_with_loader(loader: &Arc<ScriptedLoader>) -> TranslateService {
    TranslateService::builder().loader(loader.clone()).build()
}

/// Records the language of every event published on `events`.
fn record(
    service: &TranslateService,
    select: fn(&TranslateService) -> &translate_core::store::EventEmitter<TranslationEvent>,
) -> (Arc<Mutex<Vec<String>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = select(service).subscribe(move |event| {
        sink.lock().unwrap_or_else(PoisonError::into_inner).push(event.lang.clone());
    });
    (seen, subscription)
}

async fn text(service: &TranslateService, key: &str) -> String {
    let resolution = service.get(key, None).unwrap().await.unwrap();
    resolution.as_text().unwrap().to_string()
}

#[googletest::test]
#[tokio::test]
async fn test_fallback_language_answers_missing_keys() {
    let loader = Arc::new(
        ScriptedLoader::new()
            .with("fr", json!({ "HELLO": "Bonjour" }))
            .with("nl", json!({ "TEST": "Dit is een test", "HELLO": "Hallo" })),
    );
    let service = service_with_loader(&loader);

    service.set_fallback_lang("nl").await.unwrap();
    service.use_lang("fr").await.unwrap();

    assert_eq!(text(&service, "HELLO").await, "Bonjour");
    assert_eq!(text(&service, "TEST").await, "Dit is een test");
    assert_eq!(text(&service, "MISSING").await, "MISSING");
}

#[googletest::test]
#[tokio::test]
async fn test_first_language_becomes_fallback() {
    let loader = Arc::new(ScriptedLoader::new().with("en", json!({ "TEST": "This is a test" })));
    let service = service_with_loader(&loader);
    let (fallback_events, _subscription) = record(&service, TranslateService::on_fallback_lang_change);

    service.use_lang("en").await.unwrap();

    expect_that!(service.get_fallback_lang(), some(eq("en")));
    expect_that!(fallback_events.lock().unwrap().clone(), elements_are![eq("en")]);
}

#[googletest::test]
#[tokio::test]
async fn test_concurrent_gets_share_one_load_and_compilation() {
    let loader = Arc::new(ScriptedLoader::new().with("en", json!({ "HELLO": "Hello" })));
    let gate = loader.gate("en");
    let compiler = Arc::new(CountingCompiler::default());
    let service = TranslateService::builder()
        .loader(loader.clone())
        .compiler(compiler.clone())
        .build();

    let switch = service.use_lang("en");
    let first = service.get("HELLO", None).unwrap();
    let second = service.get(["HELLO"], None).unwrap();
    let third = service.use_lang("en");
    gate.send(()).unwrap();

    let (switch, first, second, third) = futures::join!(switch, first, second, third);

    expect_that!(loader.calls("en"), eq(1));
    expect_that!(compiler.calls.load(Ordering::SeqCst), eq(1));
    expect_that!(first.unwrap().as_text(), some(eq("Hello")));
    expect_that!(second.unwrap().get("HELLO"), some(eq(&Translation::from("Hello"))));
    expect_that!(Arc::ptr_eq(&switch.unwrap(), &third.unwrap()), eq(true));
}

#[googletest::test]
#[tokio::test]
async fn test_most_recent_use_lang_wins() {
    let loader = Arc::new(
        ScriptedLoader::new()
            .with("en", json!({ "KEY": "en" }))
            .with("A", json!({ "KEY": "a" }))
            .with("B", json!({ "KEY": "b" })),
    );
    let service = service_with_loader(&loader);
    service.use_lang("en").await.unwrap();
    let (lang_events, _subscription) = record(&service, TranslateService::on_lang_change);

    let gate_a = loader.gate("A");
    let gate_b = loader.gate("B");
    let to_a = service.use_lang("A");
    let to_b = service.use_lang("B");

    gate_a.send(()).unwrap();
    to_a.await.unwrap();
    expect_that!(service.get_current_lang(), some(eq("en")));
    expect_that!(service.store().has_translation_for("A"), eq(true));

    gate_b.send(()).unwrap();
    to_b.await.unwrap();
    expect_that!(service.get_current_lang(), some(eq("B")));
    expect_that!(lang_events.lock().unwrap().clone(), elements_are![eq("B")]);
    assert_eq!(text(&service, "KEY").await, "b");

    service.use_lang("A").await.unwrap();
    expect_that!(loader.calls("A"), eq(1));
    expect_that!(service.get_current_lang(), some(eq("A")));
}

#[googletest::test]
#[tokio::test]
async fn test_stale_load_finishing_last_keeps_latest_language() {
    let loader = Arc::new(
        ScriptedLoader::new()
            .with("slow", json!({ "KEY": "slow" }))
            .with("fast", json!({ "KEY": "fast" })),
    );
    let service = service_with_loader(&loader);
    let (lang_events, _subscription) = record(&service, TranslateService::on_lang_change);

    let gate_slow = loader.gate("slow");
    let gate_fast = loader.gate("fast");
    let to_slow = service.use_lang("slow");
    let to_fast = service.use_lang("fast");

    gate_fast.send(()).unwrap();
    to_fast.await.unwrap();
    expect_that!(service.get_current_lang(), some(eq("fast")));

    gate_slow.send(()).unwrap();
    to_slow.await.unwrap();

    expect_that!(service.get_current_lang(), some(eq("fast")));
    expect_that!(service.store().has_translation_for("slow"), eq(true));
    expect_that!(lang_events.lock().unwrap().clone(), elements_are![eq("fast")]);
    assert_eq!(text(&service, "KEY").await, "fast");
}

#[googletest::test]
#[tokio::test]
async fn test_staged_language_is_visible_while_loading() {
    let loader = Arc::new(ScriptedLoader::new().with("en", json!({ "KEY": "value" })));
    let gate = loader.gate("en");
    let service = service_with_loader(&loader);
    let (lang_events, _subscription) = record(&service, TranslateService::on_lang_change);

    let switch = service.use_lang("en");

    expect_that!(service.get_current_lang(), some(eq("en")));
    expect_that!(lang_events.lock().unwrap().len(), eq(0));
    expect_that!(service.instant("KEY", None).unwrap().as_text(), some(eq("KEY")));

    gate.send(()).unwrap();
    switch.await.unwrap();
    expect_that!(lang_events.lock().unwrap().clone(), elements_are![eq("en")]);
    expect_that!(service.instant("KEY", None).unwrap().as_text(), some(eq("value")));
}

fn async_missing_handler(params: &MissingTranslationParams<'_>) -> Option<Deferred<Translation>> {
    let key = params.key.to_string();
    Some(Deferred::Pending(async move { Translation::Text(format!("async:{key}")) }.boxed()))
}

#[googletest::test]
#[tokio::test]
async fn test_instant_does_not_wait_for_async_missing_handler() {
    let service = TranslateService::builder().missing_handler(Arc::new(async_missing_handler)).build();
    service.set_translation("en", json!({ "PRESENT": "here" }), false);
    service.use_lang("en").await.unwrap();

    let single = service.instant("ABSENT", None).unwrap();
    let batch = service.instant(["PRESENT", "ABSENT"], None).unwrap();
    let awaited = service.get(["PRESENT", "ABSENT"], None).unwrap().await.unwrap();

    expect_that!(single.as_text(), some(eq("ABSENT")));
    expect_that!(batch.get("PRESENT"), some(eq(&Translation::from("PRESENT"))));
    expect_that!(batch.get("ABSENT"), some(eq(&Translation::from("ABSENT"))));
    expect_that!(awaited.get("ABSENT"), some(eq(&Translation::from("async:ABSENT"))));
    assert_eq!(awaited.keys(), vec!["PRESENT", "ABSENT"]);
    expect_that!(awaited.get("PRESENT"), some(eq(&Translation::from("here"))));
}

#[googletest::test]
#[tokio::test]
async fn test_instant_batch_resolves_when_nothing_waits() {
    let service = TranslateService::builder().missing_handler(Arc::new(async_missing_handler)).build();
    service.set_translation("en", json!({ "A": "a", "B": "b" }), false);
    service.use_lang("en").await.unwrap();

    let batch = service.instant(["A", "B"], None).unwrap();

    expect_that!(batch.get("A"), some(eq(&Translation::from("a"))));
    expect_that!(batch.get("B"), some(eq(&Translation::from("b"))));
}

fn no_translation(_params: &MissingTranslationParams<'_>) -> Option<Deferred<Translation>> {
    None
}

#[googletest::test]
#[tokio::test]
async fn test_handler_without_result_falls_back_to_key() {
    let service = TranslateService::builder().missing_handler(Arc::new(no_translation)).build();

    assert_eq!(text(&service, "nothing.here").await, "nothing.here");
}

#[googletest::test]
#[tokio::test]
async fn test_batch_get_keeps_request_order() {
    let service = TranslateService::builder().build();
    service.set_translation("en", json!({ "K1": "one", "K2": "two" }), false);
    service.use_lang("en").await.unwrap();

    let resolution = service.get(vec!["K2", "K1", "K2"], None).unwrap().await.unwrap();

    assert_eq!(
        resolution,
        Resolution::Many(vec![
            ("K2".to_string(), Translation::from("two")),
            ("K1".to_string(), Translation::from("one")),
        ])
    );
}

#[googletest::test]
#[tokio::test]
async fn test_get_interpolates_params() {
    let service = TranslateService::builder().compiler(Arc::new(TemplateCompiler)).build();
    service.set_translation(
        "en",
        json!({ "user": { "greeting": "Hi {{ user.name }}, you have {{ count }} messages" } }),
        false,
    );
    service.use_lang("en").await.unwrap();
    let params = translate_core::parser::parse_params("{count: 3, user: {name: 'Kim'}}").unwrap();

    let resolution = service.get("user.greeting", Some(&params)).unwrap().await.unwrap();

    expect_that!(resolution.as_text(), some(eq("Hi Kim, you have 3 messages")));
}

#[googletest::test]
#[tokio::test]
async fn test_get_on_subtree_interpolates_every_leaf() {
    let service = TranslateService::builder().build();
    service.set_translation("en", json!({ "menu": { "open": "Open {{ what }}", "close": "Close" } }), false);
    service.use_lang("en").await.unwrap();

    let resolution = service.get("menu", Some(&json!({ "what": "file" }))).unwrap().await.unwrap();

    assert_eq!(
        resolution.into_translation(),
        Translation::from_json(&json!({ "open": "Open file", "close": "Close" }))
    );
}

#[googletest::test]
#[tokio::test]
async fn test_set_translation_merges_or_replaces() {
    let service = TranslateService::builder().build();

    service.set_translation("en", json!({ "a": "A", "nested": { "x": "X" } }), false);
    service.set_translation("en", json!({ "b": "B", "nested": { "y": "Y" } }), true);
    assert_eq!(
        *service.store().get_translations("en"),
        Translation::from_json(&json!({ "a": "A", "b": "B", "nested": { "x": "X", "y": "Y" } }))
    );

    service.set_translation("en", json!({ "c": "C" }), false);
    assert_eq!(*service.store().get_translations("en"), Translation::from_json(&json!({ "c": "C" })));
    expect_that!(service.get_langs(), elements_are![eq("en")]);
}

#[googletest::test]
#[tokio::test]
async fn test_extend_mode_merges_loaded_translations() {
    let loader = Arc::new(ScriptedLoader::new().with("en", json!({ "loaded": "L" })));
    let service = TranslateService::builder().loader(loader.clone()).extend(true).build();
    service.set_translation("en", json!({ "local": "X" }), false);

    service.use_lang("en").await.unwrap();

    assert_eq!(
        *service.store().get_translations("en"),
        Translation::from_json(&json!({ "local": "X", "loaded": "L" }))
    );
    expect_that!(loader.calls("en"), eq(1));
}

#[googletest::test]
#[tokio::test]
async fn test_shared_and_isolated_stores() {
    let store = TranslationStore::new();
    let first = TranslateService::builder().store(store.clone()).build();
    let second = TranslateService::builder().store(store.clone()).build();
    let isolated = TranslateService::builder().store(store).isolate(true).build();

    first.set_translation("en", json!({ "KEY": "shared" }), false);
    first.use_lang("en").await.unwrap();

    expect_that!(second.get_current_lang(), some(eq("en")));
    expect_that!(second.instant("KEY", None).unwrap().as_text(), some(eq("shared")));
    expect_that!(isolated.get_current_lang(), none());
    expect_that!(isolated.instant("KEY", None).unwrap().as_text(), some(eq("KEY")));
}

#[googletest::test]
#[tokio::test]
async fn test_stream_emits_on_language_change() {
    let loader = Arc::new(
        ScriptedLoader::new()
            .with("en", json!({ "HELLO": "Hello" }))
            .with("fr", json!({ "HELLO": "Bonjour" })),
    );
    let service = service_with_loader(&loader);
    service.use_lang("en").await.unwrap();

    let mut stream = service.stream("HELLO", None).unwrap();
    expect_that!(stream.next().await.unwrap().unwrap().as_text(), some(eq("Hello")));

    service.use_lang("fr").await.unwrap();
    expect_that!(stream.next().await.unwrap().unwrap().as_text(), some(eq("Bonjour")));

    let listeners = service.on_lang_change().listener_count();
    drop(stream);
    expect_that!(service.on_lang_change().listener_count(), eq(listeners - 1));
}

#[googletest::test]
#[tokio::test]
async fn test_translation_change_stream_follows_current_language_only() {
    let service = TranslateService::builder().build();
    service.set_translation("en", json!({ "KEY": "first" }), false);
    service.use_lang("en").await.unwrap();

    let mut stream = service.get_stream_on_translation_change("KEY", None).unwrap();
    expect_that!(stream.next().await.unwrap().unwrap().as_text(), some(eq("first")));

    service.set("KEY", "other language", Some("fr")).unwrap();
    service.set("KEY", "second", None).unwrap();

    expect_that!(stream.next().await.unwrap().unwrap().as_text(), some(eq("second")));
}

#[googletest::test]
#[tokio::test]
async fn test_failed_load_surfaces_and_can_be_retried() {
    let loader = Arc::new(ScriptedLoader::new().with("de", json!({ "KEY": "Wert" })));
    loader.fail_next("de");
    let service = service_with_loader(&loader);

    let failed = service.use_lang("de").await;
    expect_that!(matches!(failed, Err(TranslateError::Load { ref lang, .. }) if lang == "de"), eq(true));
    expect_that!(service.store().has_translation_for("de"), eq(false));

    service.use_lang("de").await.unwrap();
    expect_that!(loader.calls("de"), eq(2));
    assert_eq!(text(&service, "KEY").await, "Wert");
}

#[googletest::test]
#[tokio::test]
async fn test_get_waits_for_failing_load() {
    let loader = Arc::new(ScriptedLoader::new());
    loader.fail_next("de");
    let gate = loader.gate("de");
    let service = service_with_loader(&loader);

    let switch = service.use_lang("de");
    let lookup = service.get("KEY", None).unwrap();
    gate.send(()).unwrap();

    let (switch, lookup) = futures::join!(switch, lookup);
    expect_that!(switch.is_err(), eq(true));
    expect_that!(lookup.err(), some(eq(&switch.unwrap_err())));
}

#[googletest::test]
#[tokio::test]
async fn test_set_inserts_nested_value() {
    let service = TranslateService::builder().build();
    service.set_translation("en", json!({ "home": { "title": "Home" } }), false);
    service.use_lang("en").await.unwrap();

    service.set("home.subtitle", "Welcome", None).unwrap();

    assert_eq!(
        *service.store().get_translations("en"),
        Translation::from_json(&json!({ "home": { "title": "Home", "subtitle": "Welcome" } }))
    );
}

#[googletest::test]
#[tokio::test]
async fn test_reset_and_reload_language() {
    let loader = Arc::new(ScriptedLoader::new().with("en", json!({ "KEY": "value" })));
    let service = service_with_loader(&loader);
    service.use_lang("en").await.unwrap();

    service.reset_lang("en");
    expect_that!(service.store().has_translation_for("en"), eq(false));
    expect_that!(service.get_langs(), elements_are![eq("en")]);

    service.reload_lang("en").await.unwrap();
    expect_that!(loader.calls("en"), eq(2));
    assert_eq!(text(&service, "KEY").await, "value");
}

#[googletest::test]
#[tokio::test]
async fn test_add_langs_keeps_first_seen_order() {
    let service = TranslateService::builder().build();

    service.add_langs(&["fr", "en"]);
    service.set_translation("de", json!({}), false);
    service.add_langs(&["en", "nl"]);

    expect_that!(service.get_langs(), elements_are![eq("fr"), eq("en"), eq("de"), eq("nl")]);
}

#[googletest::test]
#[tokio::test]
async fn test_builder_applies_initial_languages() {
    let loader = Arc::new(
        ScriptedLoader::new()
            .with("en", json!({ "ONLY_EN": "english" }))
            .with("fr", json!({ "HELLO": "Bonjour" })),
    );
    let service = TranslateService::builder()
        .loader(loader.clone())
        .fallback_lang("en")
        .lang("fr")
        .build();

    expect_that!(service.get_current_lang(), some(eq("fr")));
    expect_that!(service.get_fallback_lang(), some(eq("en")));

    assert_eq!(text(&service, "HELLO").await, "Bonjour");
    service.set_fallback_lang("en").await.unwrap();
    assert_eq!(text(&service, "ONLY_EN").await, "english");
}

#[googletest::test]
#[tokio::test]
async fn test_builder_takes_settings_from_config_file() {
    let directory = tempfile::TempDir::new().unwrap();
    std::fs::write(
        directory.path().join(".translate.json"),
        r#"{ "lang": "fr", "fallbackLang": "en", "useFallbackLang": false }"#,
    )
    .unwrap();
    let mut manager = ConfigManager::new();
    manager.load_settings(directory.path()).unwrap();
    let loader = Arc::new(
        ScriptedLoader::new()
            .with("en", json!({ "ONLY_EN": "english" }))
            .with("fr", json!({ "HELLO": "Bonjour" })),
    );

    let service = TranslateService::builder().loader(loader.clone()).config(&manager).build();

    expect_that!(service.get_current_lang(), some(eq("fr")));
    assert_eq!(text(&service, "HELLO").await, "Bonjour");
    service.set_fallback_lang("en").await.unwrap();
    assert_eq!(text(&service, "ONLY_EN").await, "ONLY_EN");
}

#[googletest::test]
#[tokio::test]
async fn test_json_file_loader_end_to_end() {
    let directory = tempfile::TempDir::new().unwrap();
    std::fs::write(directory.path().join("en.json"), r#"{ "app": { "title": "Demo" } }"#).unwrap();
    let service = TranslateService::builder()
        .loader(Arc::new(JsonFileLoader::new(directory.path())))
        .build();

    service.use_lang("en").await.unwrap();

    assert_eq!(text(&service, "app.title").await, "Demo");
    let missing = service.use_lang("xx").await;
    expect_that!(matches!(missing, Err(TranslateError::Load { .. })), eq(true));
    expect_that!(service.get_current_lang(), some(eq("en")));
}

#[googletest::test]
fn test_keys_accept_common_forms() {
    expect_that!(Keys::from("a"), eq(&Keys::One("a".to_string())));
    expect_that!(Keys::from(vec!["a", "b"]), eq(&Keys::Many(vec!["a".to_string(), "b".to_string()])));
}
