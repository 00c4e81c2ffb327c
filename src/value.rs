//! Conversions from frontmatter and URLs into template [`Value`]s.

use crate::frontmatter::{Frontmatter, Value as FrontmatterValue};
use gtmpl_value::Value;
use std::collections::HashMap;
use url::Url;

impl From<&FrontmatterValue> for Value {
    fn from(v: &FrontmatterValue) -> Value {
        match v {
            FrontmatterValue::Null => Value::Nil,
            FrontmatterValue::Bool(b) => Value::Bool(*b),
            FrontmatterValue::Int(i) => Value::from(*i),
            FrontmatterValue::Float(f) => Value::from(*f),
            FrontmatterValue::String(s) => Value::String(s.clone()),
            FrontmatterValue::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            FrontmatterValue::Map(map) => Value::from(map),
        }
    }
}

impl From<&Frontmatter> for Value {
    fn from(fm: &Frontmatter) -> Value {
        Value::Object(object(fm))
    }
}

/// Converts frontmatter into the field map of a [`Value::Object`], so that
/// callers can add their own fields before wrapping it.
pub fn object(fm: &Frontmatter) -> HashMap<String, Value> {
    fm.iter()
        .map(|(k, v)| (k.to_owned(), Value::from(v)))
        .collect()
}

/// Frontmatter keys that templates may read on any page or project. gtmpl
/// fails on a field that is absent from an object, so these are always
/// present, [`Value::Nil`] when unset.
pub const FRONTMATTER_KEYS: &[&str] = &[
    "title",
    "description",
    "tags",
    "source",
    "docs",
    "type",
    "priority",
    "hide",
    "published-date",
    "updated-date",
    "comment-did",
];

/// Like [`object`], with every one of [`FRONTMATTER_KEYS`] present.
pub fn object_with_known_keys(fm: &Frontmatter) -> HashMap<String, Value> {
    let mut m = object(fm);
    for key in FRONTMATTER_KEYS {
        m.entry((*key).to_owned()).or_insert(Value::Nil);
    }
    m
}

/// Converts an optional URL into a string value or [`Value::Nil`].
pub fn url(url: Option<&Url>) -> Value {
    match url {
        Some(url) => Value::String(url.to_string()),
        None => Value::Nil,
    }
}

/// Converts an optional string into a string value or [`Value::Nil`].
pub fn text(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::String(s.to_owned()),
        None => Value::Nil,
    }
}
