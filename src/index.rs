//! The schema index: a registry of schema documents keyed by identifier.
//!
//! Documents are registered under one authoritative key (a `$ref`-style key
//! such as `#/definitions/widget`, or their `$id`) and can be looked up by
//! either that key or their `$id`. Registration goes through the
//! [`ValidationEngine`], which also compiles validators on demand.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::denormalize;
use crate::error::{DenormalizeError, EngineError, IndexError, ResolveError};
use crate::loader::is_url;
use crate::meta;
use crate::pointer::{self, PointerPath};
use crate::resource::Resource;
use crate::schema::SchemaFacade;
use crate::transport::Transport;
use crate::types::{is_empty, normalize_id, schema_id, Resolvers, SchemaSource, REF};
use crate::validator::{JsonSchemaEngine, ValidationEngine, Validator};

/// Registry of schema documents with pointer lookup and reference resolution.
///
/// Mutating methods take `&mut self` and views ([`SchemaFacade`],
/// [`Resource`]) borrow the index, so nothing can be registered or removed
/// while a lookup result is still in use.
pub struct SchemaIndex {
    root: Option<SchemaSource>,
    schemas: Map<String, Value>,
    metas: HashSet<String>,
    engine: Box<dyn ValidationEngine>,
    transport: Option<Box<dyn Transport>>,
}

impl SchemaIndex {
    /// Create an empty index using the `jsonschema` engine and, with the
    /// `remote` feature, an HTTP transport for remote schemas.
    pub fn new() -> Self {
        Self {
            root: None,
            schemas: Map::new(),
            metas: HashSet::new(),
            engine: Box::new(JsonSchemaEngine::default()),
            transport: default_transport(),
        }
    }

    /// Use a different validation engine.
    ///
    /// Set the engine before registering schemas: registrations are not
    /// carried over from the previous engine.
    pub fn with_engine(mut self, engine: impl ValidationEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Use a different transport for remote schemas and link actions.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Never touch the network.
    pub fn without_transport(mut self) -> Self {
        self.transport = None;
        self
    }

    /// Set the root document whose `definitions` are registered by [`index`](Self::index).
    pub fn with_root(mut self, root: impl Into<SchemaSource>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn root(&self) -> Option<&SchemaSource> {
        self.root.as_ref()
    }

    pub fn transport(&self) -> Option<&dyn Transport> {
        self.transport.as_deref()
    }

    /// Register the baseline Hyper-Schema meta-schemas plus `extra` ones.
    ///
    /// Meta-schemas skip structural validation and are keyed by their
    /// `$id`/`id`. Meta-schemas already registered are left alone, so
    /// preparing twice is harmless.
    pub fn prepare(&mut self, extra: Vec<Value>) -> Result<&mut Self, IndexError> {
        let mut metas = meta::baseline()?;
        metas.extend(extra);

        for schema in metas {
            let id = schema_id(&schema)
                .ok_or(IndexError::MissingIdentifier)?
                .to_string();
            if self.has_ref(&id) {
                continue;
            }
            self.insert(schema, Some(&id), true)?;
        }

        Ok(self)
    }

    /// Register `schema` under `key`.
    ///
    /// Without a key the schema's `$id` (or `id`) is used, then its `$ref`.
    /// A schema that fails structural validation is skipped with a warning.
    ///
    /// # Errors
    ///
    /// `MissingIdentifier` when no key can be derived, `AlreadyRegistered`
    /// when the key is taken (remove it first to replace it).
    pub fn add(&mut self, schema: Value, key: Option<&str>) -> Result<&mut Self, IndexError> {
        self.insert(schema, key, false)
    }

    /// Register a meta-schema, bypassing structural validation.
    pub fn add_meta(&mut self, schema: Value, key: Option<&str>) -> Result<&mut Self, IndexError> {
        self.insert(schema, key, true)
    }

    fn insert(
        &mut self,
        schema: Value,
        key: Option<&str>,
        is_meta: bool,
    ) -> Result<&mut Self, IndexError> {
        let identifier = identifier_for(&schema, key).ok_or(IndexError::MissingIdentifier)?;

        if self.schemas.contains_key(&identifier) {
            return Err(IndexError::AlreadyRegistered { key: identifier });
        }

        if !is_meta && !self.passes_structure(&identifier, &schema)? {
            return Ok(self);
        }

        self.register(identifier, schema, is_meta);
        Ok(self)
    }

    /// Structural validation; failures are logged, not raised.
    fn passes_structure(&self, identifier: &str, schema: &Value) -> Result<bool, EngineError> {
        let errors = self.engine.validate_structure(schema)?;
        if errors.is_empty() {
            return Ok(true);
        }

        tracing::warn!(
            key = %identifier,
            errors = errors.len(),
            "skipping schema that fails structural validation"
        );
        for error in &errors {
            tracing::debug!(key = %identifier, "{}", error);
        }
        Ok(false)
    }

    fn register(&mut self, identifier: String, schema: Value, is_meta: bool) {
        self.engine.add_schema(&schema, &identifier, is_meta);
        if is_meta {
            self.metas.insert(identifier.clone());
        }
        tracing::debug!(key = %identifier, meta = is_meta, "registered schema");
        self.schemas.insert(identifier, schema);
    }

    /// Unregister the schema at `key`. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        if self.schemas.shift_remove(key).is_some() {
            tracing::debug!(key = %key, "removed schema");
        }
        self.metas.remove(key);
        self.engine.remove_schema(key);
        self
    }

    /// Look a schema up by key, then by `$id`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.by_ref(key).or_else(|| self.by_id(key))
    }

    /// Look a schema up by the key it was registered under.
    pub fn by_ref(&self, reference: &str) -> Option<&Value> {
        self.schemas.get(reference)
    }

    /// First registered schema whose `$id` matches.
    pub fn by_id(&self, id: &str) -> Option<&Value> {
        let wanted = normalize_id(id);
        self.schemas
            .values()
            .find(|schema| schema_id(schema).map(normalize_id) == Some(wanted))
    }

    pub fn has(&self, key: &str) -> bool {
        self.has_ref(key) || self.has_id(key)
    }

    pub fn has_ref(&self, reference: &str) -> bool {
        self.by_ref(reference).is_some_and(|schema| !is_empty(schema))
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.by_id(id).is_some_and(|schema| !is_empty(schema))
    }

    /// Key a schema is registered under, given its key or `$id`.
    pub fn key_of(&self, key: &str) -> Option<&str> {
        if let Some((registered, _)) = self.schemas.get_key_value(key) {
            return Some(registered);
        }
        let wanted = normalize_id(key);
        self.schemas
            .iter()
            .find(|(_, schema)| schema_id(schema).map(normalize_id) == Some(wanted))
            .map(|(registered, _)| registered.as_str())
    }

    /// Resolve a JSON Pointer path against the index.
    ///
    /// `#/definitions/widget/properties/id` looks up `#/definitions` and
    /// dereferences `/widget/properties/id` inside it. A reference with a
    /// fragment (`urn:widget#/properties/id`) that is not itself a key is
    /// split at the `#`. Misses are `None`, never errors.
    pub fn find(&self, path: &str) -> Option<&Value> {
        if let Some(found) = pointer::resolve(path, |key| self.get(key)) {
            return Some(found);
        }

        let fragment = PointerPath::parse_fragment(path)?;
        let base = self.get(&fragment.root)?;
        pointer::dereference(base, fragment.pointer.as_deref().unwrap_or_default())
    }

    /// A schema by key, `$id` or pointer path.
    pub fn lookup(&self, reference: &str) -> Option<&Value> {
        self.get(reference).or_else(|| self.find(reference))
    }

    /// Compile a validator for the schema registered under `id` (key or `$id`).
    ///
    /// Returns `Ok(None)` when no such schema is registered.
    pub fn validator_for(&self, id: &str) -> Result<Option<Validator>, EngineError> {
        match self.key_of(id) {
            Some(key) => self.engine.compile(key).map(Some),
            None => Ok(None),
        }
    }

    /// Compile a validator for the sub-schema found at a pointer path.
    pub fn matching(&self, path: &str) -> Result<Option<Validator>, EngineError> {
        match self.find(path) {
            Some(schema) => self.engine.compile_document(schema).map(Some),
            None => Ok(None),
        }
    }

    /// Compile a validator for a schema document that is not registered.
    pub fn compile(&self, schema: &Value) -> Result<Validator, EngineError> {
        self.engine.compile_document(schema)
    }

    /// Resolve a schema source to a document.
    ///
    /// References are looked up locally first. Only a URL that is not
    /// indexed is fetched through the transport: a `$id` is an identifier,
    /// not a locator. A `#/pointer` fragment on a fetched URL is applied to
    /// the fetched document.
    pub fn resolve(&self, source: impl Into<SchemaSource>) -> Result<Value, ResolveError> {
        let reference = match source.into() {
            SchemaSource::Document(document) => return Ok(document),
            SchemaSource::Ref(reference) => reference,
        };

        if let Some(local) = self.lookup(&reference) {
            return Ok(local.clone());
        }

        match &self.transport {
            Some(transport) if is_url(&reference) => {
                let fragment = PointerPath::parse_fragment(&reference);
                let url = fragment.as_ref().map_or(reference.as_str(), |f| f.root.as_str());
                tracing::debug!(url = %url, "fetching remote schema");
                let document = transport.fetch(url)?;

                match fragment.and_then(|f| f.pointer) {
                    Some(pointer) => pointer::dereference(&document, &pointer)
                        .cloned()
                        .ok_or(ResolveError::NotFound { reference }),
                    None => Ok(document),
                }
            }
            _ => Err(ResolveError::NotFound { reference }),
        }
    }

    /// Register every entry of the root document's `definitions`.
    ///
    /// Prepares the meta-schemas, resolves the root, then derives a key and a
    /// schema for each definition with `resolvers`. Every definition is
    /// resolved and structurally checked before anything is added: if one
    /// yields no key or no schema, its key is already taken, or the engine
    /// fails, the call fails and no definition is registered. Schemas failing
    /// structural validation are skipped with a warning as in [`add`](Self::add).
    ///
    /// A root given by reference must be indexed or be a URL. A root whose
    /// `definitions` is an array is not a valid Hyper-Schema document, so
    /// register it with [`add_meta`](Self::add_meta) rather than `add`.
    pub fn index(&mut self, resolvers: &Resolvers) -> Result<&mut Self, IndexError> {
        self.prepare(Vec::new())?;

        let source = self.root.clone().ok_or(IndexError::MissingDefinitions)?;
        let root = self.resolve(source)?;

        let definitions: Vec<&Value> = match root.get("definitions") {
            Some(Value::Array(entries)) => entries.iter().collect(),
            Some(Value::Object(entries)) => entries.values().collect(),
            _ => return Err(IndexError::MissingDefinitions),
        };

        let mut resolved: Vec<(String, Value)> = Vec::with_capacity(definitions.len());
        for (position, definition) in definitions.into_iter().enumerate() {
            let key = (resolvers.key)(definition).filter(|key| !key.is_empty());
            let schema = (resolvers.schema)(definition).filter(|schema| !schema.is_null());

            match (key, schema) {
                (Some(key), Some(schema)) => {
                    if self.schemas.contains_key(&key) || resolved.iter().any(|(k, _)| *k == key) {
                        return Err(IndexError::AlreadyRegistered { key });
                    }
                    resolved.push((key, schema));
                }
                _ => {
                    return Err(IndexError::UnresolvedDefinition {
                        position,
                        definition: definition.clone(),
                    })
                }
            }
        }

        let mut accepted = Vec::with_capacity(resolved.len());
        for (key, schema) in resolved {
            if self.passes_structure(&key, &schema)? {
                accepted.push((key, schema));
            }
        }
        for (key, schema) in accepted {
            self.register(key, schema, false);
        }

        Ok(self)
    }

    /// Expand `$ref` properties into the schemas they reference.
    ///
    /// See [`denormalize::denormalize`].
    pub fn denormalize(&self, source: impl Into<SchemaSource>) -> Result<Value, DenormalizeError> {
        denormalize::denormalize(self, source)
    }

    /// Registered keys and documents, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schemas.iter().map(|(key, schema)| (key.as_str(), schema))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Number of registered schemas, meta-schemas included.
    pub fn count(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_meta(&self, key: &str) -> bool {
        self.metas.contains(key)
    }

    /// A view over the schema registered under `key` (or with that `$id`).
    pub fn schema(&self, key: &str) -> Option<SchemaFacade<'_>> {
        let registered = self.key_of(key)?;
        let schema = self.schemas.get(registered)?;
        Some(SchemaFacade::registered(self, registered, schema))
    }

    /// Views over every registered schema except meta-schemas.
    pub fn schemas(&self) -> Vec<SchemaFacade<'_>> {
        self.schemas
            .iter()
            .filter(|(key, _)| !self.is_meta(key))
            .map(|(key, schema)| SchemaFacade::registered(self, key, schema))
            .collect()
    }

    /// First schema view matching `predicate`.
    pub fn find_schema<F>(&self, predicate: F) -> Option<SchemaFacade<'_>>
    where
        F: Fn(&SchemaFacade<'_>) -> bool,
    {
        self.schemas().into_iter().find(|schema| predicate(schema))
    }

    /// HTTP resources for every non-meta schema.
    pub fn resources(&self) -> Vec<Resource<'_>> {
        self.schemas().into_iter().map(Resource::new).collect()
    }

    /// First resource whose schema matches `predicate`.
    pub fn resource<F>(&self, predicate: F) -> Option<Resource<'_>>
    where
        F: Fn(&SchemaFacade<'_>) -> bool,
    {
        self.find_schema(predicate).map(Resource::new)
    }
}

impl Default for SchemaIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaIndex")
            .field("root", &self.root)
            .field("keys", &self.schemas.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Key precedence: explicit key, then `$id`/`id`, then `$ref`. Never empty.
fn identifier_for(schema: &Value, key: Option<&str>) -> Option<String> {
    key.filter(|key| !key.is_empty())
        .or_else(|| schema_id(schema))
        .or_else(|| schema.get(REF).and_then(Value::as_str))
        .filter(|key| !key.is_empty())
        .map(String::from)
}

#[cfg(feature = "remote")]
fn default_transport() -> Option<Box<dyn Transport>> {
    Some(Box::new(crate::transport::HttpTransport::new()))
}

#[cfg(not(feature = "remote"))]
fn default_transport() -> Option<Box<dyn Transport>> {
    None
}
