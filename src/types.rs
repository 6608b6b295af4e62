//! Core types shared across the index, denormalizer and link resolver.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::LinkError;

/// Keyword marking a reference to another (sub-)schema.
pub const REF: &str = "$ref";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Self identifier of a schema: `$id`, or draft-04 `id`.
pub fn schema_id(schema: &Value) -> Option<&str> {
    schema
        .get("$id")
        .or_else(|| schema.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Strips an empty trailing fragment so `http://x/s#` and `http://x/s` compare equal.
pub fn normalize_id(id: &str) -> &str {
    id.strip_suffix('#').unwrap_or(id)
}

/// Whether a lookup result counts as absent: null, `""`, `{}` or `[]`.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// A schema given either by reference or as a document.
///
/// Decided once at the API boundary: a JSON string is a reference,
/// anything else is a document.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    Ref(String),
    Document(Value),
}

impl From<&str> for SchemaSource {
    fn from(reference: &str) -> Self {
        SchemaSource::Ref(reference.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(reference: String) -> Self {
        SchemaSource::Ref(reference)
    }
}

impl From<Value> for SchemaSource {
    fn from(value: Value) -> Self {
        match value {
            Value::String(reference) => SchemaSource::Ref(reference),
            other => SchemaSource::Document(other),
        }
    }
}

/// HTTP verbs a link may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// Whether a [`Transport`](crate::Transport) has an operation for this verb.
    pub fn is_invocable(&self) -> bool {
        !matches!(self, Method::Head | Method::Options)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "patch" => Ok(Method::Patch),
            "delete" => Ok(Method::Delete),
            "head" => Ok(Method::Head),
            "options" => Ok(Method::Options),
            _ => Err(LinkError::UnsupportedAction {
                method: s.to_string(),
            }),
        }
    }
}

/// Options for the validation engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Draft used to compile schemas. Defaults to draft 4, matching the
    /// bundled Hyper-Schema meta-schemas.
    pub draft: jsonschema::Draft,
    /// Collect every error (true) or stop at the first (false).
    pub all_errors: bool,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self {
            draft: jsonschema::Draft::Draft4,
            all_errors: true,
        }
    }

    /// Set the draft used to compile schemas.
    pub fn draft(mut self, draft: jsonschema::Draft) -> Self {
        self.draft = draft;
        self
    }

    /// Set whether all errors are collected.
    pub fn all_errors(mut self, all_errors: bool) -> Self {
        self.all_errors = all_errors;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

type KeyResolver = Box<dyn Fn(&Value) -> Option<String>>;
type SchemaResolver = Box<dyn Fn(&Value) -> Option<Value>>;

/// Mapping functions deriving a key and a schema from each root definition.
pub struct Resolvers {
    pub key: KeyResolver,
    pub schema: SchemaResolver,
}

impl Resolvers {
    /// Replace the key resolver.
    pub fn key(mut self, key: impl Fn(&Value) -> Option<String> + 'static) -> Self {
        self.key = Box::new(key);
        self
    }

    /// Replace the schema resolver.
    pub fn schema(mut self, schema: impl Fn(&Value) -> Option<Value> + 'static) -> Self {
        self.schema = Box::new(schema);
        self
    }
}

impl Default for Resolvers {
    /// Key is the definition's `$ref`, schema is the definition itself.
    fn default() -> Self {
        Self {
            key: Box::new(|def| def.get(REF).and_then(Value::as_str).map(String::from)),
            schema: Box::new(|def| Some(def.clone())),
        }
    }
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvers").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);
    }

    #[test]
    fn method_parse_unknown() {
        let err = "fetch".parse::<Method>().unwrap_err();
        assert!(matches!(err, LinkError::UnsupportedAction { method } if method == "fetch"));
    }

    #[test]
    fn head_and_options_have_no_operation() {
        assert!(Method::Get.is_invocable());
        assert!(Method::Patch.is_invocable());
        assert!(!Method::Head.is_invocable());
        assert!(!Method::Options.is_invocable());
    }

    #[test]
    fn schema_source_from_value() {
        assert_eq!(
            SchemaSource::from(json!("urn:a")),
            SchemaSource::Ref("urn:a".into())
        );
        assert_eq!(
            SchemaSource::from(json!({ "type": "object" })),
            SchemaSource::Document(json!({ "type": "object" }))
        );
    }

    #[test]
    fn schema_id_prefers_dollar_id() {
        assert_eq!(schema_id(&json!({ "$id": "urn:a", "id": "urn:b" })), Some("urn:a"));
        assert_eq!(schema_id(&json!({ "id": "urn:b" })), Some("urn:b"));
        assert_eq!(schema_id(&json!({ "$id": "" })), None);
        assert_eq!(schema_id(&json!({ "type": "object" })), None);
    }

    #[test]
    fn normalize_id_strips_empty_fragment() {
        assert_eq!(
            normalize_id("http://json-schema.org/draft-04/links#"),
            "http://json-schema.org/draft-04/links"
        );
        assert_eq!(normalize_id("urn:a"), "urn:a");
    }

    #[test]
    fn emptiness() {
        assert!(is_empty(&json!(null)));
        assert!(is_empty(&json!({})));
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!("")));
        assert!(!is_empty(&json!({ "type": "string" })));
        assert!(!is_empty(&json!(true)));
    }

    #[test]
    fn default_resolvers() {
        let resolvers = Resolvers::default();
        let def = json!({ "$ref": "#/definitions/widget" });
        assert_eq!((resolvers.key)(&def), Some("#/definitions/widget".into()));
        assert_eq!((resolvers.schema)(&def), Some(def.clone()));
        assert_eq!((resolvers.key)(&json!({ "title": "x" })), None);
    }
}
