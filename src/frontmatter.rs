//! Defines the [`Frontmatter`] and [`Value`] types and the [`parse`] function
//! which splits a source document into its leading YAML metadata block and
//! its body.
//!
//! Parsing never fails. A document without a frontmatter block (or with an
//! unterminated one) yields no frontmatter and the full document as its body.
//! A block whose YAML is malformed is logged and treated as absent, but the
//! block itself is still stripped from the body.

use log::warn;

const FENCE: &str = "---";

/// A loosely-typed frontmatter value. YAML values are converted into this
/// type so that downstream code can apply total, per-field conversions.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Frontmatter),
}

impl Value {
    /// Returns the contained string, if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained bool, if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the contained integer, if this is a [`Value::Int`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the contained items, if this is a [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Renders scalar values as plain text. Lists and maps have no sensible
    /// textual form and yield `None`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(_) | Value::Map(_) => None,
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Value {
        use serde_yaml::Value as Yaml;
        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Yaml::String(s) => Value::String(s),
            Yaml::Sequence(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Yaml::Mapping(mapping) => Value::Map(Frontmatter::from(mapping)),
        }
    }
}

/// An ordered mapping of frontmatter keys to [`Value`]s. Keys keep the order
/// in which they appear in the source document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontmatter(Vec<(String, Value)>);

impl Frontmatter {
    pub fn new() -> Frontmatter {
        Frontmatter::default()
    }

    /// Looks up `key`. `Null` values are reported as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .filter(|v| **v != Value::Null)
    }

    /// Inserts or replaces `key`. Replacing keeps the key's original
    /// position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_yaml::Mapping> for Frontmatter {
    fn from(mapping: serde_yaml::Mapping) -> Frontmatter {
        let mut frontmatter = Frontmatter::new();
        for (key, value) in mapping {
            let key = match key {
                // Lists and maps used as keys keep their YAML rendering.
                serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => {
                    match serde_yaml::to_string(&key) {
                        Ok(text) => text.trim_start_matches("---").trim().to_owned(),
                        Err(e) => {
                            warn!("ignoring unprintable frontmatter key: {}", e);
                            continue;
                        }
                    }
                }
                scalar => match Value::from(scalar).to_text() {
                    Some(key) => key,
                    None => continue,
                },
            };
            frontmatter.insert(key, Value::from(value));
        }
        frontmatter
    }
}

/// Splits `input` into its frontmatter and body. The frontmatter block must
/// start on the very first line with `---` and end with another line that
/// is exactly `---`.
///
/// ```md
/// ---
/// title: Hello, world!
/// published-date: 2024-06-01T12:00:00
/// tags: [greet]
/// ---
/// # Hello
/// ```
pub fn parse(input: &str) -> (Option<Frontmatter>, &str) {
    let (yaml, body) = match split(input) {
        Some(parts) => parts,
        None => return (None, input),
    };

    if yaml.trim().is_empty() {
        return (Some(Frontmatter::new()), body);
    }

    match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
        Ok(serde_yaml::Value::Mapping(mapping)) => (Some(Frontmatter::from(mapping)), body),
        Ok(serde_yaml::Value::Null) => (Some(Frontmatter::new()), body),
        Ok(_) => {
            warn!("ignoring frontmatter that is not a mapping");
            (None, body)
        }
        Err(e) => {
            warn!("ignoring malformed frontmatter: {}", e);
            (None, body)
        }
    }
}

/// Returns the YAML text between the fences and the body after the closing
/// fence, or `None` if the document has no complete frontmatter block.
fn split(input: &str) -> Option<(&str, &str)> {
    let rest = strip_line_ending(input.strip_prefix(FENCE)?)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(|c| c == '\n' || c == '\r') == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn strip_line_ending(s: &str) -> Option<&str> {
    s.strip_prefix("\r\n").or_else(|| s.strip_prefix('\n'))
}
