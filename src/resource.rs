//! REST operations over a schema's links.
//!
//! A [`Resource`] picks a link by relation, resolves it against an instance
//! and performs it through the index's transport.

use serde_json::Value;

use crate::error::{LinkError, TransportError};
use crate::link::{ActionOptions, Link};
use crate::schema::SchemaFacade;
use crate::transport::Response;

/// HTTP operations for one schema.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    schema: SchemaFacade<'a>,
}

impl<'a> Resource<'a> {
    pub fn new(schema: SchemaFacade<'a>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> SchemaFacade<'a> {
        self.schema
    }

    /// The link with relation `rel`.
    pub fn link(&self, rel: &str) -> Result<Link, LinkError> {
        self.schema
            .link_by(&serde_json::json!({ "rel": rel }))?
            .ok_or_else(|| LinkError::LinkNotFound {
                rel: rel.to_string(),
            })
    }

    /// Resolve the link `rel` and perform it with an optional body.
    ///
    /// Without a method in `options`, the link's declared method is used.
    pub fn action(
        &self,
        rel: &str,
        options: ActionOptions,
        body: Option<Value>,
    ) -> Result<Response, LinkError> {
        let action = self.link(rel)?.action(options)?;
        let transport = self
            .schema
            .index()
            .transport()
            .ok_or_else(|| TransportError::Unavailable {
                url: action.url().to_string(),
            })?;
        action.call(transport, body)
    }

    /// GET the target of link `rel`.
    pub fn get(&self, rel: &str, instance: &Value) -> Result<Response, LinkError> {
        self.action(rel, ActionOptions::new(instance.clone()).method("get"), None)
    }

    /// GET the instance itself (`self`).
    pub fn item(&self, instance: &Value) -> Result<Response, LinkError> {
        self.get("self", instance)
    }

    /// GET the full representation of the instance (`full`).
    pub fn full(&self, instance: &Value) -> Result<Response, LinkError> {
        self.get("full", instance)
    }

    /// GET the schema describing the instance (`describedBy`).
    pub fn described_by(&self, instance: &Value) -> Result<Response, LinkError> {
        self.get("describedBy", instance)
    }

    /// GET the root of the representation (`root`).
    pub fn root(&self, instance: &Value) -> Result<Response, LinkError> {
        self.get("root", instance)
    }

    /// GET the collection of instances (`instances`).
    pub fn all(&self, instance: &Value) -> Result<Response, LinkError> {
        self.get("instances", instance)
    }

    /// POST `data` through the `create` link.
    pub fn create(&self, data: Value, instance: &Value) -> Result<Response, LinkError> {
        self.action(
            "create",
            ActionOptions::new(instance.clone()).method("post"),
            Some(data),
        )
    }

    /// PUT `data` through the `update` link.
    pub fn update(&self, data: Value, instance: &Value) -> Result<Response, LinkError> {
        self.action(
            "update",
            ActionOptions::new(instance.clone()).method("put"),
            Some(data),
        )
    }

    /// DELETE through the `delete` link.
    pub fn delete(&self, instance: &Value) -> Result<Response, LinkError> {
        self.action(
            "delete",
            ActionOptions::new(instance.clone()).method("delete"),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SchemaIndex;
    use crate::transport::{Request, Transport};
    use crate::types::Method;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records requests and answers 200 with the request URL as body.
    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<Request>>>,
    }

    impl Recorder {
        fn respond(&self, request: &Request) -> Result<Response, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(Response {
                url: request.url.clone(),
                status: 200,
                headers: vec![],
                body: json!({ "url": request.url }).to_string(),
            })
        }
    }

    impl Transport for Recorder {
        fn get(&self, request: &Request) -> Result<Response, TransportError> {
            self.respond(request)
        }
        fn post(&self, request: &Request) -> Result<Response, TransportError> {
            self.respond(request)
        }
        fn put(&self, request: &Request) -> Result<Response, TransportError> {
            self.respond(request)
        }
        fn patch(&self, request: &Request) -> Result<Response, TransportError> {
            self.respond(request)
        }
        fn delete(&self, request: &Request) -> Result<Response, TransportError> {
            self.respond(request)
        }
    }

    fn widget() -> Value {
        json!({
            "$id": "urn:widget",
            "type": "object",
            "links": [
                { "rel": "self", "href": "/widgets/{id}" },
                { "rel": "instances", "href": "/widgets" },
                { "rel": "create", "href": "/widgets", "method": "POST" },
                { "rel": "update", "href": "/widgets/{id}", "method": "PUT" },
                { "rel": "delete", "href": "/widgets/{id}", "method": "DELETE" }
            ]
        })
    }

    #[test]
    fn rest_operations_use_link_urls_and_verbs() {
        let recorder = Recorder::default();
        let mut index = SchemaIndex::new().with_transport(recorder.clone());
        index.add(widget(), None).unwrap();
        let resource = index.schema("urn:widget").unwrap().resource();
        let entity = json!({ "id": 7 });

        resource.item(&entity).unwrap();
        resource.all(&entity).unwrap();
        resource.create(json!({ "name": "new" }), &entity).unwrap();
        resource.update(json!({ "name": "renamed" }), &entity).unwrap();
        resource.delete(&entity).unwrap();

        let seen = recorder.seen.lock().unwrap();
        let calls: Vec<(Method, &str)> = seen.iter().map(|r| (r.method, r.url.as_str())).collect();
        assert_eq!(
            calls,
            vec![
                (Method::Get, "/widgets/7"),
                (Method::Get, "/widgets"),
                (Method::Post, "/widgets"),
                (Method::Put, "/widgets/7"),
                (Method::Delete, "/widgets/7"),
            ]
        );
        assert_eq!(seen[2].body, Some(json!({ "name": "new" })));
        assert_eq!(seen[0].body, None);
    }

    #[test]
    fn response_body_is_returned() {
        let mut index = SchemaIndex::new().with_transport(Recorder::default());
        index.add(widget(), None).unwrap();
        let resource = index.schema("urn:widget").unwrap().resource();

        let response = resource.item(&json!({ "id": 3 })).unwrap();
        assert_eq!(response.json().unwrap(), json!({ "url": "/widgets/3" }));
    }

    #[test]
    fn missing_link() {
        let mut index = SchemaIndex::new().with_transport(Recorder::default());
        index.add(widget(), None).unwrap();
        let resource = index.schema("urn:widget").unwrap().resource();

        let err = resource.full(&json!({ "id": 3 })).unwrap_err();
        assert!(matches!(err, LinkError::LinkNotFound { rel } if rel == "full"));
    }

    #[test]
    fn missing_transport() {
        let mut index = SchemaIndex::new().without_transport();
        index.add(widget(), None).unwrap();
        let resource = index.schema("urn:widget").unwrap().resource();

        let err = resource.item(&json!({ "id": 3 })).unwrap_err();
        assert!(matches!(
            err,
            LinkError::Transport(TransportError::Unavailable { url }) if url == "/widgets/3"
        ));
    }

    #[test]
    fn index_resources() {
        let mut index = SchemaIndex::new().without_transport();
        index.add(widget(), None).unwrap();
        assert_eq!(index.resources().len(), 1);
        let resource = index
            .resource(|schema| schema.id() == Some("urn:widget"))
            .unwrap();
        assert_eq!(resource.link("create").unwrap().href(), "/widgets");
    }
}
