//! Dotted key path utilities.
//!
//! Keys such as `home.title` address nested maps and lists. A literal key that
//! itself contains dots (`"home.title": "..."`) is also reachable: segments are
//! accumulated until the accumulated text names an entry.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::Value;

use crate::types::Translation;

/// A node that can be walked by [`get_value`].
pub trait PathNode: Clone {
    /// Looks up one literal key (or list index) directly on this node.
    fn child(&self, key: &str) -> Option<Cow<'_, Self>>;

    /// Whether the walk may continue below this node.
    fn is_container(&self) -> bool;
}

/// Character at `index` of `text`.
///
/// Strings answer index lookups for compatibility with older callers; nothing
/// relies on it beyond a final path segment.
fn char_at(text: &str, key: &str) -> Option<String> {
    let index = key.parse::<usize>().ok()?;
    text.chars().nth(index).map(String::from)
}

impl PathNode for Translation {
    fn child(&self, key: &str) -> Option<Cow<'_, Self>> {
        match self {
            Self::Map(map) => map.get(key).map(Cow::Borrowed),
            Self::List(items) => {
                key.parse::<usize>().ok().and_then(|index| items.get(index)).map(Cow::Borrowed)
            }
            Self::Text(text) => char_at(text, key).map(|c| Cow::Owned(Self::Text(c))),
            Self::Template(_) => None,
        }
    }

    fn is_container(&self) -> bool {
        Self::is_container(self)
    }
}

impl PathNode for Value {
    fn child(&self, key: &str) -> Option<Cow<'_, Self>> {
        match self {
            Self::Object(map) => map.get(key).map(Cow::Borrowed),
            Self::Array(items) => {
                key.parse::<usize>().ok().and_then(|index| items.get(index)).map(Cow::Borrowed)
            }
            Self::String(text) => char_at(text, key).map(|c| Cow::Owned(Self::String(c))),
            Self::Null | Self::Bool(_) | Self::Number(_) => None,
        }
    }

    fn is_container(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_))
    }
}

/// Resolves a dot-separated `path` against `root`.
///
/// At each step the accumulated segments are tried as one literal key. A match
/// is taken when it is a container or when no segments remain; otherwise the
/// next segment is appended (joined by `.`) and the lookup retried.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use translate_core::path::get_value;
///
/// let params = json!({ "user": { "name": "Ann" }, "a.b": { "c": "X" } });
///
/// assert_eq!(get_value(&params, "user.name").as_deref(), Some(&json!("Ann")));
/// assert_eq!(get_value(&params, "a.b.c").as_deref(), Some(&json!("X")));
/// assert!(get_value(&params, "user.age").is_none());
/// ```
#[must_use]
pub fn get_value<'a, T: PathNode>(root: &'a T, path: &str) -> Option<Cow<'a, T>> {
    let mut segments = path.split('.').peekable();
    let mut cursor: Cow<'a, T> = Cow::Borrowed(root);
    let mut key = String::new();

    while let Some(segment) = segments.next() {
        key.push_str(segment);
        let is_last = segments.peek().is_none();

        let found = match &cursor {
            Cow::Borrowed(node) => {
                let node: &'a T = *node;
                node.child(&key)
            }
            Cow::Owned(node) => node.child(&key).map(|value| Cow::Owned(value.into_owned())),
        };

        match found {
            Some(value) if is_last || value.is_container() => {
                cursor = value;
                key.clear();
            }
            _ if is_last => return None,
            _ => key.push('.'),
        }
    }

    Some(cursor)
}

/// Returns a copy of `target` with `value` deep-inserted at `path`.
///
/// `a.b.c` is expanded to `{a: {b: {c: value}}}` and merged with
/// [`merge_deep`], so siblings along the path survive.
#[must_use]
pub fn insert_value(target: &Translation, path: &str, value: Translation) -> Translation {
    let nested = path.rsplit('.').fold(value, |inner, segment| {
        Translation::Map(HashMap::from([(segment.to_string(), inner)]))
    });
    merge_deep(target.clone(), nested)
}

/// Merges `source` into `target`.
///
/// Maps present on both sides are merged key by key; any other value from
/// `source` (including lists) replaces the one in `target`.
#[must_use]
pub fn merge_deep(target: Translation, source: Translation) -> Translation {
    match (target, source) {
        (Translation::Map(mut target), Translation::Map(source)) => {
            for (key, value) in source {
                let merged = match target.remove(&key) {
                    Some(existing) => merge_deep(existing, value),
                    None => value,
                };
                target.insert(key, merged);
            }
            Translation::Map(target)
        }
        (_, source) => source,
    }
}
