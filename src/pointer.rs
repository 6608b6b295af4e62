//! JSON Pointer paths over an index of schemas.
//!
//! A path such as `#/definitions/widget/properties/id` is split in two: the
//! root key `#/definitions` names a registered schema, and the remaining
//! tokens `/widget/properties/id` are dereferenced inside it.

use serde_json::Value;

/// A path split into the key of a registered schema and a pointer into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerPath<'a> {
    /// Key looked up in the index.
    pub root: String,
    /// RFC 6901 pointer applied to the matched schema, if any tokens remain.
    pub pointer: Option<String>,
    /// The original path.
    pub path: &'a str,
}

impl<'a> PointerPath<'a> {
    /// Split a path on `/`.
    ///
    /// A `#`-prefixed path uses `#/<first token>` as its root key (a bare `#`
    /// keeps `#`); any other path is a key on its own.
    pub fn parse(path: &'a str) -> Self {
        if !path.starts_with('#') {
            return Self {
                root: path.to_string(),
                pointer: None,
                path,
            };
        }

        let chunks: Vec<&str> = path.split('/').collect();
        let root = match chunks.get(1) {
            Some(first) => format!("#/{}", first),
            None => "#".to_string(),
        };
        let rest = chunks.get(2..).unwrap_or_default();
        let pointer = if rest.is_empty() {
            None
        } else {
            Some(rest.iter().map(|chunk| format!("/{}", chunk)).collect())
        };

        Self {
            root,
            pointer,
            path,
        }
    }

    /// Split a fragment reference `<document>#<pointer>` at its `#`.
    ///
    /// Returns `None` when there is no document part or no pointer part.
    pub fn parse_fragment(path: &'a str) -> Option<Self> {
        let (document, fragment) = path.split_once('#')?;
        if document.is_empty() || !fragment.starts_with('/') {
            return None;
        }
        Some(Self {
            root: document.to_string(),
            pointer: Some(fragment.to_string()),
            path,
        })
    }
}

/// Dereference `pointer` inside `base`.
///
/// An empty pointer addresses `base` itself. A missing token yields `None`.
pub fn dereference<'v>(base: &'v Value, pointer: &str) -> Option<&'v Value> {
    base.pointer(pointer)
}

/// Resolve a path against a lookup function.
///
/// `lookup` resolves the root key; the rest of the path is dereferenced
/// inside the result. Never fails: any miss is `None`.
pub fn resolve<'v, F>(path: &str, lookup: F) -> Option<&'v Value>
where
    F: Fn(&str) -> Option<&'v Value>,
{
    let parsed = PointerPath::parse(path);
    let base = lookup(&parsed.root)?;

    match parsed.pointer {
        Some(pointer) => dereference(base, &pointer),
        None => Some(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_bare_hash() {
        let parsed = PointerPath::parse("#");
        assert_eq!(parsed.root, "#");
        assert_eq!(parsed.pointer, None);
    }

    #[test]
    fn parse_root_segment_only() {
        let parsed = PointerPath::parse("#/definitions");
        assert_eq!(parsed.root, "#/definitions");
        assert_eq!(parsed.pointer, None);
    }

    #[test]
    fn parse_nested_segments() {
        let parsed = PointerPath::parse("#/definitions/widget/properties/id");
        assert_eq!(parsed.root, "#/definitions");
        assert_eq!(parsed.pointer.as_deref(), Some("/widget/properties/id"));
    }

    #[test]
    fn parse_plain_key() {
        let parsed = PointerPath::parse("urn:widget");
        assert_eq!(parsed.root, "urn:widget");
        assert_eq!(parsed.pointer, None);
    }

    #[test]
    fn parse_fragment_reference() {
        let parsed = PointerPath::parse_fragment("urn:widget#/properties/id").unwrap();
        assert_eq!(parsed.root, "urn:widget");
        assert_eq!(parsed.pointer.as_deref(), Some("/properties/id"));

        assert!(PointerPath::parse_fragment("urn:widget").is_none());
        assert!(PointerPath::parse_fragment("#/definitions").is_none());
        assert!(PointerPath::parse_fragment("urn:widget#anchor").is_none());
    }

    #[test]
    fn dereference_escaped_tokens() {
        let doc = json!({ "a/b": { "c~d": 1 } });
        assert_eq!(dereference(&doc, "/a~1b/c~0d"), Some(&json!(1)));
        assert_eq!(dereference(&doc, ""), Some(&doc));
        assert_eq!(dereference(&doc, "/missing"), None);
    }

    #[test]
    fn resolve_against_lookup() {
        let a = json!({ "b": { "c": 3 } });
        let lookup = |key: &str| if key == "#/a" { Some(&a) } else { None };

        assert_eq!(resolve("#/a", lookup), Some(&a));
        assert_eq!(resolve("#/a/b/c", lookup), Some(&json!(3)));
        assert_eq!(resolve("#/a/x", lookup), None);
        assert_eq!(resolve("#/z/b", lookup), None);
    }
}
