//! Nested form parameter assembly.
//!
//! Decoded bodies and query strings both end up as an ordered list of
//! `(raw key, value)` pairs; this module folds that list into a [`ParamMap`]
//! tree according to the bracketed key grammar:
//!
//! - `foo` assigns a scalar leaf
//! - `foo[bar][baz]` materializes nested maps on demand
//! - `foo[]` appends to the ordered list at `foo`
//! - `foo[bar][]` appends to the list at the nested path
//!
//! The fold runs over the pairs in *reverse* of input order and every write
//! overwrites its slot, so the pair folded last — the one encountered first
//! in the original input — wins for scalar duplicates, while list elements
//! are prepended and come out in encounter order. Changing this to a forward
//! fold silently flips duplicate precedence and reverses lists, so the
//! direction is part of the contract (see the tests below).

use crate::protocol::{FormError, PartHeaders};
use crate::utf8::validate_utf8;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;

/// The decoded parameter tree: string leaves, ordered lists, nested maps,
/// and the records produced by multipart parts.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    /// A field body that is not valid UTF-8, kept byte-for-byte when
    /// validation is disabled
    Binary(Bytes),
    List(Vec<ParamValue>),
    Map(ParamMap),
    Upload(UploadFile),
    Part(CapturedPart),
}

pub type ParamMap = HashMap<String, ParamValue>;

/// A completed file-upload part: where its body landed and what the client
/// said about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub temp_path: PathBuf,
    pub content_type: Option<String>,
}

/// A part captured whole (headers plus body) under `include_unnamed_parts_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPart {
    pub headers: PartHeaders,
    pub body: Bytes,
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ParamValue::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ParamMap> {
        match self {
            ParamValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_upload(&self) -> Option<&UploadFile> {
        match self {
            ParamValue::Upload(upload) => Some(upload),
            _ => None,
        }
    }

    /// Map lookup shorthand for traversing nested trees.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.as_map().and_then(|map| map.get(key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// `[name]`: descend into a nested map
    Key(String),
    /// `[]`: append to the list at this path
    Append,
}

/// Splits a raw key into its head and bracket segments.
///
/// Keys that don't fit the grammar (unbalanced brackets, an empty head, an
/// append segment anywhere but last, trailing garbage) are kept verbatim as
/// plain scalar keys; query strings in the wild contain such keys and
/// dropping them would lose data.
fn parse_key(raw: &str) -> (String, Vec<Segment>) {
    let plain = || (raw.to_string(), Vec::new());

    let Some(open) = raw.find('[') else {
        return plain();
    };
    if open == 0 {
        return plain();
    }

    let head = &raw[..open];
    let mut segments = Vec::new();
    let mut rest = &raw[open..];

    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return plain();
        };
        let Some(close) = inner.find(']') else {
            return plain();
        };
        segments.push(match &inner[..close] {
            "" => Segment::Append,
            key => Segment::Key(key.to_string()),
        });
        rest = &inner[close + 1..];
    }

    // append makes sense only at the end of a path
    if segments.iter().rev().skip(1).any(|s| *s == Segment::Append) {
        return plain();
    }

    (head.to_string(), segments)
}

/// Folds ordered `(raw key, value)` pairs into the parameter tree.
///
/// Processing runs in reverse of input order; see the module docs for why
/// that direction is load-bearing.
pub fn assemble(pairs: Vec<(String, ParamValue)>) -> ParamMap {
    let mut root = ParamMap::new();
    for (raw_key, value) in pairs.into_iter().rev() {
        let (head, segments) = parse_key(&raw_key);
        insert(&mut root, head, &segments, value);
    }
    root
}

fn insert(map: &mut ParamMap, key: String, path: &[Segment], value: ParamValue) {
    match path.split_first() {
        // scalar slot: overwrite, so the last-folded (first-encountered) pair wins
        None => {
            map.insert(key, value);
        }
        Some((Segment::Append, _)) => {
            let slot = map.entry(key).or_insert_with(|| ParamValue::List(Vec::new()));
            if !matches!(slot, ParamValue::List(_)) {
                *slot = ParamValue::List(Vec::new());
            }
            if let ParamValue::List(list) = slot {
                list.insert(0, value);
            }
        }
        Some((Segment::Key(inner_key), rest)) => {
            let slot = map.entry(key).or_insert_with(|| ParamValue::Map(ParamMap::new()));
            if !matches!(slot, ParamValue::Map(_)) {
                *slot = ParamValue::Map(ParamMap::new());
            }
            if let ParamValue::Map(inner) = slot {
                insert(inner, inner_key.clone(), rest, value);
            }
        }
    }
}

/// Decodes a URL-encoded query string into a parameter tree.
///
/// `+` translates to space before percent decoding (HTML form semantics) and
/// both keys and values are percent-decoded. Invalid UTF-8 after decoding is
/// a [`FormError::BadEncoding`] naming the offending field.
pub fn decode_query(query: &str) -> Result<ParamMap, FormError> {
    let mut pairs = Vec::new();

    for segment in query.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = segment.split_once('=').unwrap_or((segment, ""));

        let key = percent_decode(raw_key, "query key")?;
        let value = percent_decode(raw_value, &key)?;
        pairs.push((key, ParamValue::Text(value)));
    }

    Ok(assemble(pairs))
}

fn percent_decode(raw: &str, location: &str) -> Result<String, FormError> {
    let plus_translated = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(plus_translated.as_bytes());
    validate_utf8(&bytes, location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_scalar_occurrence_wins() {
        let params = decode_query("foo=bar&foo=baz").unwrap();
        assert_eq!(params["foo"].as_str(), Some("bar"));
    }

    #[test]
    fn list_preserves_encounter_order() {
        let params = decode_query("foo[]=bar&foo[]=baz").unwrap();
        let list = params["foo"].as_list().unwrap();
        assert_eq!(list, &[ParamValue::Text("bar".to_string()), ParamValue::Text("baz".to_string())]);
    }

    #[test]
    fn nested_map_materializes() {
        let params = decode_query("foo[bar]=baz").unwrap();
        assert_eq!(params["foo"].get("bar").and_then(ParamValue::as_str), Some("baz"));
    }

    #[test]
    fn deep_nesting_with_trailing_list() {
        let params = decode_query("a[b][c][]=1&a[b][c][]=2&a[b][d]=3").unwrap();

        let c = params["a"].get("b").and_then(|b| b.get("c")).unwrap();
        let list = c.as_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].as_str(), Some("1"));
        assert_eq!(list[1].as_str(), Some("2"));

        let d = params["a"].get("b").and_then(|b| b.get("d")).unwrap();
        assert_eq!(d.as_str(), Some("3"));
    }

    #[test]
    fn empty_query_is_empty_tree() {
        assert!(decode_query("").unwrap().is_empty());
    }

    #[test]
    fn decoding_is_deterministic() {
        let query = "a[]=1&a[]=2&b[c]=3&b=dropped&d=4";
        assert_eq!(decode_query(query).unwrap(), decode_query(query).unwrap());
    }

    #[test]
    fn scalar_then_list_keeps_scalar() {
        // first occurrence's shape wins on a raw-key collision
        let params = decode_query("foo=a&foo[]=b").unwrap();
        assert_eq!(params["foo"].as_str(), Some("a"));
    }

    #[test]
    fn list_then_scalar_keeps_list() {
        let params = decode_query("foo[]=b&foo=a").unwrap();
        let list = params["foo"].as_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].as_str(), Some("b"));
    }

    #[test]
    fn malformed_bracket_keys_stay_verbatim() {
        let params = decode_query("foo%5Bbar=1").unwrap();
        assert_eq!(params["foo[bar"].as_str(), Some("1"));

        let params = decode_query("[]=1").unwrap();
        assert_eq!(params["[]"].as_str(), Some("1"));
    }

    #[test]
    fn plus_and_percent_decoding() {
        let params = decode_query("greeting=hello+w%C3%B6rld").unwrap();
        assert_eq!(params["greeting"].as_str(), Some("hello wörld"));
    }

    #[test]
    fn bare_key_decodes_to_empty_value() {
        let params = decode_query("flag&x=1").unwrap();
        assert_eq!(params["flag"].as_str(), Some(""));
    }

    #[test]
    fn invalid_percent_escape_reports_byte() {
        let err = decode_query("field=%8B").unwrap_err();
        match err {
            FormError::BadEncoding { byte, location } => {
                assert_eq!(byte, 0x8B);
                assert_eq!(location, "field");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
