//! Entity instances bound to the schema that describes them.

use serde_json::Value;

use crate::error::{LinkError, ValidateError};
use crate::link::{Action, ActionOptions, Link};
use crate::schema::SchemaFacade;

/// An entity instance paired with a schema.
#[derive(Debug, Clone)]
pub struct EntityBinding<'a> {
    instance: Value,
    schema: SchemaFacade<'a>,
}

impl<'a> EntityBinding<'a> {
    pub fn new(instance: Value, schema: SchemaFacade<'a>) -> Self {
        Self { instance, schema }
    }

    pub fn instance(&self) -> &Value {
        &self.instance
    }

    pub fn schema(&self) -> SchemaFacade<'a> {
        self.schema
    }

    /// Rebind the instance to a different schema. The previous schema is
    /// only borrowed and is left as it was.
    pub fn use_schema(self, schema: SchemaFacade<'a>) -> Self {
        Self {
            instance: self.instance,
            schema,
        }
    }

    /// Replace the instance, keeping the schema.
    pub fn use_instance(self, instance: Value) -> Self {
        Self {
            instance,
            schema: self.schema,
        }
    }

    pub fn into_instance(self) -> Value {
        self.instance
    }

    pub fn validate(&self) -> Result<(), ValidateError> {
        self.schema.validate(&self.instance)
    }

    pub fn links(&self) -> Result<Vec<Link>, LinkError> {
        self.schema.links()
    }

    pub fn links_by(&self, matcher: &Value) -> Result<Vec<Link>, LinkError> {
        self.schema.links_by(matcher)
    }

    /// URL of the link with relation `rel`, filled from this instance.
    pub fn url(&self, rel: &str) -> Result<String, LinkError> {
        self.link(rel)?.url(&self.instance)
    }

    /// Action for the link with relation `rel`, parameterized by this instance.
    pub fn action(&self, rel: &str, method: Option<&str>) -> Result<Action, LinkError> {
        let mut options = ActionOptions::new(self.instance.clone());
        if let Some(method) = method {
            options = options.method(method);
        }
        self.link(rel)?.action(options)
    }

    fn link(&self, rel: &str) -> Result<Link, LinkError> {
        self.schema
            .link_by(&serde_json::json!({ "rel": rel }))?
            .ok_or_else(|| LinkError::LinkNotFound {
                rel: rel.to_string(),
            })
    }
}
