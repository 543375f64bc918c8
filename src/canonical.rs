//! Canonical form and content address of validation error descriptors.
//!
//! A descriptor is everything the validator reports about one error. The
//! `sources` field says where on the page this instance came from, so it is
//! stripped before hashing: the same error seen on two pages, or seen again
//! on a later run, lands on the same [`CanonicalKey`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Instance-specific field excluded from identity.
pub const SOURCES_FIELD: &str = "sources";

/// Length of a hex-encoded blake3 digest.
const KEY_LEN: usize = 64;

/// One instance-specific source entry (plugin, theme, block, ...).
pub type SourceContext = Value;

/// Raw error as produced by the validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorDescriptor(Map<String, Value>);

impl ErrorDescriptor {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The `sources` field exactly as reported. `None` when absent or null.
    pub fn raw_sources(&self) -> Option<Value> {
        match self.0.get(SOURCES_FIELD) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        }
    }

    /// Source entries of this instance, see [`source_list`].
    pub fn sources(&self) -> Vec<SourceContext> {
        source_list(self.0.get(SOURCES_FIELD))
    }
}

/// List view of a `sources` value. A missing or null field yields none;
/// a non-array value is treated as a single source.
pub fn source_list(sources: Option<&Value>) -> Vec<SourceContext> {
    match sources {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

impl From<Map<String, Value>> for ErrorDescriptor {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Content address of a deduplicated error (blake3 hex of its canonical JSON).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Accepts only a well-formed 64-char lowercase hex digest.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == KEY_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for display.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(self.0.as_str())
    }
}

impl TryFrom<String> for CanonicalKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("malformed canonical key: {:?}", s))
    }
}

impl From<CanonicalKey> for String {
    fn from(key: CanonicalKey) -> Self {
        key.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptor fields minus `sources`, recursively key-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalDescriptor(Map<String, Value>);

impl CanonicalDescriptor {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn code(&self) -> Option<&str> {
        self.0.get("code").and_then(Value::as_str)
    }

    pub fn node_name(&self) -> Option<&str> {
        self.0.get("node_name").and_then(Value::as_str)
    }

    /// Compact JSON with keys in sorted order. This is the hashed form.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// The descriptor as the validator reported it for one instance.
    /// `sources` is put back only if the instance had one.
    pub fn with_sources(&self, sources: Option<&Value>) -> ErrorDescriptor {
        let mut fields = self.0.clone();
        if let Some(sources) = sources {
            fields.insert(SOURCES_FIELD.to_string(), sources.clone());
        }
        ErrorDescriptor(fields)
    }
}

/// Strip `sources`, deep-sort, serialize, hash.
pub fn canonicalize(descriptor: &ErrorDescriptor) -> (CanonicalKey, CanonicalDescriptor) {
    let sorted: BTreeMap<&String, Value> = descriptor
        .0
        .iter()
        .filter(|(name, _)| name.as_str() != SOURCES_FIELD)
        .map(|(name, value)| (name, sort_value(value)))
        .collect();
    let fields: Map<String, Value> = sorted
        .into_iter()
        .map(|(name, value)| (name.clone(), value))
        .collect();

    let canonical = CanonicalDescriptor(fields);
    let key = CanonicalKey(blake3::hash(canonical.to_json().as_bytes()).to_hex().to_string());
    (key, canonical)
}

/// Rebuild objects in key order at every depth. Array order is significant.
fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_value(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: Value) -> ErrorDescriptor {
        ErrorDescriptor::from_value(value).unwrap()
    }

    #[test]
    fn test_sources_and_field_order_do_not_affect_key() {
        let a = descriptor(json!({"code": "X", "b": 1, "a": 2, "sources": [{"type": "plugin", "name": "foo"}]}));
        let b = descriptor(json!({"a": 2, "b": 1, "code": "X", "sources": ["other"]}));
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn test_missing_sources_matches_present_sources() {
        let bare = descriptor(json!({"code": "DISALLOWED_TAG", "node_name": "script"}));
        let with = descriptor(json!({"code": "DISALLOWED_TAG", "node_name": "script", "sources": ["s1"]}));
        assert_eq!(canonicalize(&bare).0, canonicalize(&with).0);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let a = descriptor(json!({"code": "X", "node_attributes": {"src": "a.js", "async": ""}}));
        let b = descriptor(json!({"node_attributes": {"async": "", "src": "a.js"}, "code": "X"}));
        let (key_a, canonical) = canonicalize(&a);
        assert_eq!(key_a, canonicalize(&b).0);
        assert_eq!(
            canonical.to_json(),
            r#"{"code":"X","node_attributes":{"async":"","src":"a.js"}}"#
        );
    }

    #[test]
    fn test_different_content_different_key() {
        let a = descriptor(json!({"code": "X", "node_name": "script"}));
        let b = descriptor(json!({"code": "X", "node_name": "style"}));
        assert_ne!(canonicalize(&a).0, canonicalize(&b).0);

        // array order is content
        let c = descriptor(json!({"code": "X", "list": [1, 2]}));
        let d = descriptor(json!({"code": "X", "list": [2, 1]}));
        assert_ne!(canonicalize(&c).0, canonicalize(&d).0);
    }

    #[test]
    fn test_key_is_stable_across_runs() {
        let (key, canonical) = canonicalize(&descriptor(json!({"node_name": "script", "code": "DISALLOWED_TAG"})));
        assert_eq!(canonical.to_json(), r#"{"code":"DISALLOWED_TAG","node_name":"script"}"#);
        assert_eq!(
            key.as_str(),
            "f7f6ded8c29162a9fb7571b56f29e563a309def8366c22c126dfcce5793bb0ec"
        );
    }

    #[test]
    fn test_key_is_blake3_hex() {
        let (key, _) = canonicalize(&descriptor(json!({"code": "X"})));
        assert_eq!(key.as_str().len(), 64);
        assert_eq!(CanonicalKey::parse(key.as_str()), Some(key.clone()));
        assert_eq!(key.short().len(), 12);
        assert!(CanonicalKey::parse("not-a-key").is_none());
        assert!(CanonicalKey::parse(&key.as_str().to_uppercase()).is_none());
    }

    #[test]
    fn test_sources_shapes() {
        assert!(descriptor(json!({"code": "X"})).sources().is_empty());
        assert!(descriptor(json!({"code": "X", "sources": null})).sources().is_empty());
        assert_eq!(descriptor(json!({"sources": ["a", "b"]})).sources().len(), 2);
        assert_eq!(
            descriptor(json!({"sources": {"type": "theme"}})).sources(),
            vec![json!({"type": "theme"})]
        );
    }

    #[test]
    fn test_key_deserialize_validates() {
        let (key, _) = canonicalize(&descriptor(json!({"code": "X"})));
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(serde_json::from_str::<CanonicalKey>(&json).unwrap(), key);

        assert!(serde_json::from_str::<CanonicalKey>(r#""aéééééééé""#).is_err());
        assert!(serde_json::from_str::<CanonicalKey>(r#""abc""#).is_err());
    }

    #[test]
    fn test_short_never_splits_a_char() {
        let odd = CanonicalKey("a\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}".to_string());
        assert_eq!(odd.short(), odd.as_str());
        assert_eq!(CanonicalKey("abc".to_string()).short(), "abc");
    }

    #[test]
    fn test_with_sources_restores_instance() {
        for raw in [
            json!({"code": "X", "sources": ["s1"]}),
            json!({"code": "X"}),
            json!({"code": "X", "sources": {"type": "theme", "name": "t"}}),
        ] {
            let raw = descriptor(raw);
            let (_, canonical) = canonicalize(&raw);
            assert!(canonical.get(SOURCES_FIELD).is_none());
            assert_eq!(canonical.with_sources(raw.raw_sources().as_ref()), raw);
        }
    }

    #[test]
    fn test_null_sources_is_absent() {
        let raw = descriptor(json!({"code": "X", "sources": null}));
        assert_eq!(raw.raw_sources(), None);
        let (_, canonical) = canonicalize(&raw);
        assert_eq!(canonical.with_sources(None), descriptor(json!({"code": "X"})));
    }
}
