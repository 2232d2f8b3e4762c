//! Compilation hook applied to translations before they are stored.

use std::collections::HashMap;

use crate::parser::interpolate_string;
use crate::types::{
    TemplateFn,
    Translation,
};

/// Transforms raw translations into their stored form.
///
/// A compiler may turn text into [`Translation::Template`] leaves so the
/// interpolation work is prepared once per load.
pub trait TranslateCompiler: Send + Sync {
    /// Compiles a single text value.
    fn compile(&self, value: &str, lang: &str) -> Translation;

    /// Compiles a whole translation tree.
    fn compile_translations(&self, translations: Translation, lang: &str) -> Translation;
}

/// Stores translations unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCompiler;

impl TranslateCompiler for NoopCompiler {
    fn compile(&self, value: &str, _lang: &str) -> Translation {
        Translation::Text(value.to_string())
    }

    fn compile_translations(&self, translations: Translation, _lang: &str) -> Translation {
        translations
    }
}

/// Turns every text containing a `{{` placeholder into a template leaf.
/// Plain text is kept as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateCompiler;

impl TranslateCompiler for TemplateCompiler {
    fn compile(&self, value: &str, _lang: &str) -> Translation {
        if !value.contains("{{") {
            return Translation::Text(value.to_string());
        }
        let template = value.to_string();
        Translation::Template(TemplateFn::new(move |params| interpolate_string(&template, params)))
    }

    fn compile_translations(&self, translations: Translation, lang: &str) -> Translation {
        match translations {
            Translation::Text(text) => self.compile(&text, lang),
            Translation::List(items) => Translation::List(
                items.into_iter().map(|item| self.compile_translations(item, lang)).collect(),
            ),
            Translation::Map(map) => Translation::Map(
                map.into_iter()
                    .map(|(key, value)| (key, self.compile_translations(value, lang)))
                    .collect::<HashMap<_, _>>(),
            ),
            template @ Translation::Template(_) => template,
        }
    }
}
