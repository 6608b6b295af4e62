//! Validation engine seam and its `jsonschema`-backed implementation.
//!
//! The index never validates anything itself: structural checks of new
//! schemas and instance validation are delegated to a [`ValidationEngine`].

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::error::{EngineError, SchemaError, ValidateError};
use crate::meta::{DRAFT4_SCHEMA_ID, HYPER_SCHEMA_ID};
use crate::types::{normalize_id, schema_id, EngineOptions, REF};

type Check = Box<dyn Fn(&Value) -> Vec<SchemaError> + Send + Sync>;

/// A compiled validator bound to one schema identifier.
pub struct Validator {
    id: String,
    check: Check,
}

impl Validator {
    /// Wrap a check function. The function returns every error it finds;
    /// an empty result means the instance is valid.
    pub fn new(
        id: impl Into<String>,
        check: impl Fn(&Value) -> Vec<SchemaError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            check: Box::new(check),
        }
    }

    /// Identifier of the schema this validator was compiled from.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn errors(&self, instance: &Value) -> Vec<SchemaError> {
        (self.check)(instance)
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.errors(instance).is_empty()
    }

    /// Validate an instance, collecting errors into `ValidateError::Invalid`.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidateError> {
        let errors = self.errors(instance);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidateError::Invalid { errors })
        }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator").field("id", &self.id).finish()
    }
}

/// The external schema validation engine.
pub trait ValidationEngine {
    /// Register a schema so other schemas can reference it and it can be compiled.
    fn add_schema(&mut self, schema: &Value, identifier: &str, is_meta: bool);

    /// Forget a schema. Unknown identifiers are ignored.
    fn remove_schema(&mut self, identifier: &str);

    /// Check a schema document against the meta-schema grammar.
    ///
    /// Returns the structural errors found; empty means the schema is valid.
    fn validate_structure(&self, schema: &Value) -> Result<Vec<SchemaError>, EngineError>;

    /// Compile the registered schema under `identifier`.
    fn compile(&self, identifier: &str) -> Result<Validator, EngineError>;

    /// Compile an unregistered schema document, resolving references
    /// against the registered ones.
    fn compile_document(&self, schema: &Value) -> Result<Validator, EngineError>;
}

/// [`ValidationEngine`] backed by the `jsonschema` crate.
#[derive(Debug, Default)]
pub struct JsonSchemaEngine {
    options: EngineOptions,
    documents: Map<String, Value>,
    metas: HashSet<String>,
}

impl JsonSchemaEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            documents: Map::new(),
            metas: HashSet::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Whether `identifier` was registered as a meta-schema.
    pub fn is_meta(&self, identifier: &str) -> bool {
        self.metas.contains(identifier)
    }

    fn lookup(&self, identifier: &str) -> Option<&Value> {
        self.documents.get(identifier).or_else(|| {
            let wanted = normalize_id(identifier);
            self.documents.iter().find_map(|(key, doc)| {
                let matches = normalize_id(key) == wanted
                    || schema_id(doc).map(normalize_id) == Some(wanted);
                matches.then_some(doc)
            })
        })
    }

    /// URIs a registered document can be referenced by.
    ///
    /// Keys that are not absolute URIs (`#/definitions/widget`) are given a
    /// URI under [`KEY_BASE`].
    fn resource_uris(key: &str, doc: &Value) -> Vec<String> {
        let mut uris = vec![if is_absolute(key) {
            normalize_id(key).to_string()
        } else {
            key_uri(key)
        }];
        if let Some(id) = schema_id(doc).filter(|id| is_absolute(id)) {
            let id = normalize_id(id);
            if !uris.iter().any(|uri| uri == id) {
                uris.push(id.to_string());
            }
        }
        uris
    }

    /// Rewrite `$ref`s naming a registered key, or a pointer below one, to
    /// the key's URI. The longest matching key wins; a bare `#` stays a self
    /// reference.
    fn link_keys(&self, schema: &mut Value) {
        match schema {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get_mut(REF) {
                    if let Some(uri) = self.key_reference(reference) {
                        *reference = uri;
                    }
                }
                for child in map.values_mut() {
                    self.link_keys(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.link_keys(item);
                }
            }
            _ => {}
        }
    }

    fn key_reference(&self, reference: &str) -> Option<String> {
        if reference == "#" || is_absolute(reference) {
            return None;
        }
        if self.documents.contains_key(reference) {
            return Some(key_uri(reference));
        }

        self.documents
            .keys()
            .filter(|key| !is_absolute(key))
            .filter(|key| {
                reference
                    .strip_prefix(key.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|key| key.len())
            .map(|key| format!("{}#{}", key_uri(key), &reference[key.len()..]))
    }

    /// A copy of `doc` whose key references resolve through the engine.
    /// Meta-schemas are taken as they are. A root `$ref` naming the
    /// document's own key is a placeholder and is not linked to itself.
    fn linked(&self, key: &str, doc: &Value) -> Value {
        let mut doc = doc.clone();
        if self.metas.contains(key) {
            return doc;
        }

        let placeholder = doc.get(REF).and_then(Value::as_str) == Some(key);
        let own = if placeholder {
            doc.as_object_mut().and_then(|map| map.shift_remove(REF))
        } else {
            None
        };
        self.link_keys(&mut doc);
        if let (Some(own), Some(map)) = (own, doc.as_object_mut()) {
            map.insert(REF.to_string(), own);
        }
        doc
    }

    fn build(&self, id: &str, schema: &Value) -> Result<Validator, EngineError> {
        let draft = self.options.draft;
        let mut options = jsonschema::options();
        options.with_draft(draft);
        for (key, doc) in &self.documents {
            let linked = self.linked(key, doc);
            for uri in Self::resource_uris(key, doc) {
                options.with_resource(uri, draft.create_resource(linked.clone()));
            }
        }

        let compiled = options
            .build(&self.linked(id, schema))
            .map_err(|e| EngineError::Compile {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        let all_errors = self.options.all_errors;
        Ok(Validator::new(id, move |instance| {
            let errors = compiled.iter_errors(instance).map(|e| SchemaError {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            });
            if all_errors {
                errors.collect()
            } else {
                errors.take(1).collect()
            }
        }))
    }
}

/// Base URI for registered keys that are not absolute URIs.
const KEY_BASE: &str = "urn:hyperschema:key:";

fn is_absolute(identifier: &str) -> bool {
    !identifier.starts_with('#') && identifier.contains(':')
}

fn key_uri(key: &str) -> String {
    format!("{}{}", KEY_BASE, urlencoding::encode(key))
}

impl ValidationEngine for JsonSchemaEngine {
    fn add_schema(&mut self, schema: &Value, identifier: &str, is_meta: bool) {
        if is_meta {
            self.metas.insert(identifier.to_string());
        }
        self.documents.insert(identifier.to_string(), schema.clone());
    }

    fn remove_schema(&mut self, identifier: &str) {
        self.metas.remove(identifier);
        self.documents.shift_remove(identifier);
    }

    fn validate_structure(&self, schema: &Value) -> Result<Vec<SchemaError>, EngineError> {
        // Prefer the registered Hyper-Schema grammar; fall back to plain draft 4.
        let meta = match self.lookup(HYPER_SCHEMA_ID) {
            Some(hyper) => self.build(HYPER_SCHEMA_ID, hyper)?,
            None => self.build(DRAFT4_SCHEMA_ID, &json!({ "$ref": DRAFT4_SCHEMA_ID }))?,
        };
        Ok(meta.errors(schema))
    }

    fn compile(&self, identifier: &str) -> Result<Validator, EngineError> {
        let schema = self
            .lookup(identifier)
            .ok_or_else(|| EngineError::UnknownSchema {
                id: identifier.to_string(),
            })?;
        self.build(identifier, schema)
    }

    fn compile_document(&self, schema: &Value) -> Result<Validator, EngineError> {
        let id = schema_id(schema).unwrap_or("#").to_string();
        self.build(&id, schema)
    }
}
