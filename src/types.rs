//! Core types used throughout the project.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::TranslateError;

/// Interpolation parameters: an arbitrary JSON record addressed by dotted paths.
pub type Params = Value;

/// A compiled template leaf. Called with the interpolation parameters, returns the final text.
#[derive(Clone)]
pub struct TemplateFn(Arc<dyn Fn(Option<&Params>) -> String + Send + Sync>);

impl TemplateFn {
    #[must_use]
    pub fn new(template: impl Fn(Option<&Params>) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(template))
    }

    #[must_use]
    pub fn call(&self, params: Option<&Params>) -> String {
        (self.0)(params)
    }
}

impl fmt::Debug for TemplateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TemplateFn(<fn>)")
    }
}

impl PartialEq for TemplateFn {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

/// A translation value: text, an ordered list, a keyed map, or a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Text(String),
    List(Vec<Translation>),
    Map(HashMap<String, Translation>),
    Template(TemplateFn),
}

impl Translation {
    /// An empty map, the tree of a language with no content.
    #[must_use]
    pub fn empty() -> Self {
        Self::Map(HashMap::new())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&HashMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Lists and maps can be descended into by a key path.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Converts raw JSON into a translation tree.
    ///
    /// Numbers and booleans become their text form. `null` entries are dropped from
    /// maps and lists; a `null` root becomes an empty map.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        Self::from_json_entry(value).unwrap_or_else(Self::empty)
    }

    /// `None` for `null`, which callers drop.
    fn from_json_entry(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Bool(_) | Value::Number(_) => Some(Self::Text(value.to_string())),
            Value::Array(items) => {
                Some(Self::List(items.iter().filter_map(Self::from_json_entry).collect()))
            }
            Value::Object(map) => Some(Self::Map(
                map.iter()
                    .filter_map(|(key, value)| {
                        Self::from_json_entry(value).map(|entry| (key.clone(), entry))
                    })
                    .collect(),
            )),
        }
    }
}

impl From<&str> for Translation {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Translation {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Translation {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

/// A single key or an ordered batch of keys to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keys {
    One(String),
    Many(Vec<String>),
}

impl Keys {
    /// Rejects an empty key or an empty batch.
    pub(crate) fn ensure_present(&self, operation: &'static str) -> Result<(), TranslateError> {
        let empty = match self {
            Self::One(key) => key.is_empty(),
            Self::Many(keys) => keys.is_empty(),
        };
        if empty { Err(TranslateError::EmptyKey { operation }) } else { Ok(()) }
    }
}

impl From<&str> for Keys {
    fn from(key: &str) -> Self {
        Self::One(key.to_string())
    }
}

impl From<String> for Keys {
    fn from(key: String) -> Self {
        Self::One(key)
    }
}

impl From<Vec<String>> for Keys {
    fn from(keys: Vec<String>) -> Self {
        Self::Many(keys)
    }
}

impl From<Vec<&str>> for Keys {
    fn from(keys: Vec<&str>) -> Self {
        Self::Many(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Keys {
    fn from(keys: &[&str]) -> Self {
        Self::Many(keys.iter().map(|key| (*key).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Keys {
    fn from(keys: [&str; N]) -> Self {
        Self::Many(keys.iter().map(|key| (*key).to_string()).collect())
    }
}

/// The outcome of resolving [`Keys`].
///
/// A batch keeps the order in which keys were requested; a key requested twice
/// appears once, at its first position.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    One(Translation),
    Many(Vec<(String, Translation)>),
}

impl Resolution {
    /// Text of a single resolved key.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::One(translation) => translation.as_text(),
            Self::Many(_) => None,
        }
    }

    /// Looks up one entry of a batch.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Translation> {
        match self {
            Self::One(_) => None,
            Self::Many(entries) => {
                entries.iter().find(|(entry_key, _)| entry_key == key).map(|(_, value)| value)
            }
        }
    }

    /// Requested keys of a batch, in request order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::One(_) => Vec::new(),
            Self::Many(entries) => entries.iter().map(|(key, _)| key.as_str()).collect(),
        }
    }

    /// A batch becomes a map keyed by the requested keys.
    #[must_use]
    pub fn into_translation(self) -> Translation {
        match self {
            Self::One(translation) => translation,
            Self::Many(entries) => Translation::Map(entries.into_iter().collect()),
        }
    }
}

/// A value that is either available now or produced later by a future.
pub enum Deferred<T> {
    Ready(T),
    Pending(BoxFuture<'static, T>),
}

impl<T: Send + 'static> Deferred<T> {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The value if it is available without waiting.
    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    #[must_use]
    pub fn map<U: Send + 'static>(self, f: impl FnOnce(T) -> U + Send + 'static) -> Deferred<U> {
        match self {
            Self::Ready(value) => Deferred::Ready(f(value)),
            Self::Pending(future) => Deferred::Pending(future.map(f).boxed()),
        }
    }

    /// Waits uniformly on ready and pending values.
    #[must_use]
    pub fn into_future(self) -> BoxFuture<'static, T> {
        match self {
            Self::Ready(value) => futures::future::ready(value).boxed(),
            Self::Pending(future) => future,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(<future>)"),
        }
    }
}
