//! Per-schema view over a [`SchemaIndex`].

use serde_json::Value;

use crate::entity::EntityBinding;
use crate::error::{DenormalizeError, EngineError, LinkError, ValidateError};
use crate::index::SchemaIndex;
use crate::link::{matches, Link};
use crate::resource::Resource;
use crate::types::schema_id;
use crate::validator::Validator;

/// A schema document seen through the index that holds it.
///
/// Borrows both the index and the document; it is created on demand and
/// caches nothing.
#[derive(Debug, Clone, Copy)]
pub struct SchemaFacade<'a> {
    index: &'a SchemaIndex,
    key: Option<&'a str>,
    schema: &'a Value,
}

impl<'a> SchemaFacade<'a> {
    /// View over a schema document that need not be registered, such as a
    /// link's `targetSchema`.
    pub fn new(index: &'a SchemaIndex, schema: &'a Value) -> Self {
        Self {
            index,
            key: None,
            schema,
        }
    }

    pub(crate) fn registered(index: &'a SchemaIndex, key: &'a str, schema: &'a Value) -> Self {
        Self {
            index,
            key: Some(key),
            schema,
        }
    }

    pub fn index(&self) -> &'a SchemaIndex {
        self.index
    }

    pub fn schema(&self) -> &'a Value {
        self.schema
    }

    /// Key the schema is registered under, if it is registered.
    pub fn key(&self) -> Option<&'a str> {
        self.key
    }

    /// The schema's `$id`, falling back to its registration key.
    pub fn id(&self) -> Option<&'a str> {
        schema_id(self.schema).or(self.key)
    }

    /// Declared links, in declaration order.
    pub fn links(&self) -> Result<Vec<Link>, LinkError> {
        self.raw_links().map(Link::from_value).collect()
    }

    /// First link structurally matching `matcher`, e.g. `{"rel": "self"}`.
    pub fn link_by(&self, matcher: &Value) -> Result<Option<Link>, LinkError> {
        self.raw_links()
            .find(|link| matches(link, matcher))
            .map(Link::from_value)
            .transpose()
    }

    /// Every link structurally matching `matcher`.
    pub fn links_by(&self, matcher: &Value) -> Result<Vec<Link>, LinkError> {
        self.raw_links()
            .filter(|link| matches(link, matcher))
            .map(Link::from_value)
            .collect()
    }

    fn raw_links(&self) -> impl Iterator<Item = &'a Value> {
        self.schema
            .get("links")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }

    /// Compiled validator: the registered one when the schema is indexed,
    /// otherwise one compiled from the document itself.
    pub fn validator(&self) -> Result<Validator, EngineError> {
        if let Some(key) = self.key {
            if let Some(validator) = self.index.validator_for(key)? {
                return Ok(validator);
            }
        }
        self.index.compile(self.schema)
    }

    /// Validate an entity instance against this schema.
    pub fn validate(&self, entity: &Value) -> Result<(), ValidateError> {
        self.validator()?.validate(entity)
    }

    pub fn is_valid(&self, entity: &Value) -> Result<bool, EngineError> {
        Ok(self.validator()?.is_valid(entity))
    }

    /// Bind an entity instance to this schema.
    pub fn create(&self, entity: Value) -> EntityBinding<'a> {
        EntityBinding::new(entity, *self)
    }

    /// REST operations over this schema's links.
    pub fn resource(&self) -> Resource<'a> {
        Resource::new(*self)
    }

    /// A denormalized copy of this schema.
    pub fn denormalized(&self) -> Result<Value, DenormalizeError> {
        self.index.denormalize(self.schema.clone())
    }
}
