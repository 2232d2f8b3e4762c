//! テスト用ユーティリティ
//!
//! 複数のテストモジュールで使用される共通のローダーとコンパイラを提供します。
#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::sync::{
    Mutex,
    PoisonError,
};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::compiler::{
    NoopCompiler,
    TranslateCompiler,
};
use crate::error::LoaderError;
use crate::loader::TranslateLoader;
use crate::types::Translation;

/// 言語ごとの JSON を返すローダー
///
/// 未登録の言語はエラーになる。呼び出し回数を言語ごとに数える。
#[derive(Debug, Default)]
pub(crate) struct MapLoader {
    /// 言語 → 翻訳 JSON
    translations: HashMap<String, Value>,
    /// 言語 → 呼び出し回数
    calls: Mutex<HashMap<String, usize>>,
}

impl MapLoader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `lang` の翻訳を登録する
    pub(crate) fn with(mut self, lang: &str, translations: Value) -> Self {
        self.translations.insert(lang.to_string(), translations);
        self
    }

    /// `lang` に対する `get_translation` の呼び出し回数
    pub(crate) fn calls(&self, lang: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(lang)
            .copied()
            .unwrap_or_default()
    }
}

impl TranslateLoader for MapLoader {
    fn get_translation(&self, lang: &str) -> BoxFuture<'static, Result<Translation, LoaderError>> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(lang.to_string())
            .or_default() += 1;

        let result = self
            .translations
            .get(lang)
            .map(Translation::from_json)
            .ok_or_else(|| LoaderError::Other(format!("No translations for '{lang}'")));
        futures::future::ready(result).boxed()
    }
}

/// `compile_translations` の呼び出し回数を数えるコンパイラ
#[derive(Debug, Default)]
pub(crate) struct CountingCompiler {
    /// 呼び出し回数
    calls: AtomicUsize,
}

impl CountingCompiler {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
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
