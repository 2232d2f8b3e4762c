//! translate-core
//!
//! Runtime translation engine: per-language translation trees, dotted key
//! lookup with a fallback language, `{{ }}` interpolation, deduplicated
//! asynchronous loading and change streams.
//!
//! ```
//! use serde_json::json;
//! use translate_core::TranslateService;
//!
//! let service = TranslateService::builder().build();
//! service.set_translation("en", json!({ "greeting": "Hello {{ name }}" }), false);
//! service.store().set_current_lang("en", false);
//!
//! let text = service.instant("greeting", Some(&json!({ "name": "Ann" }))).ok();
//! assert_eq!(text.as_ref().and_then(|r| r.as_text()), Some("Hello Ann"));
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod loader;
pub mod missing;
pub mod parser;
pub mod path;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use compiler::{
    NoopCompiler,
    TemplateCompiler,
    TranslateCompiler,
};
pub use config::{
    ConfigManager,
    TranslateSettings,
};
pub use error::{
    LoaderError,
    TranslateError,
};
pub use loader::{
    FakeLoader,
    JsonFileLoader,
    TranslateLoader,
};
pub use missing::{
    DefaultMissingHandler,
    MissingTranslationHandler,
    MissingTranslationParams,
};
pub use parser::{
    DefaultParser,
    TranslateParser,
};
pub use service::{
    TranslateService,
    TranslateServiceBuilder,
    TranslationStream,
};
pub use store::{
    Subscription,
    TranslationEvent,
    TranslationStore,
};
pub use types::{
    Deferred,
    Keys,
    Params,
    Resolution,
    Translation,
};
