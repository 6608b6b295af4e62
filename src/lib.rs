//! JSON Hyper-Schema index
//!
//! Client-side engine for JSON Hyper-Schema documents: registers schemas by
//! key or `$id`, resolves JSON Pointer paths across them, denormalizes
//! `$ref` properties, and turns Link Description Objects into HTTP actions
//! parameterized by entity instances.
//!
//! # Example
//!
//! ```
//! use hyperschema::SchemaIndex;
//! use serde_json::json;
//!
//! let mut index = SchemaIndex::new().without_transport();
//! index.prepare(Vec::new()).unwrap();
//! index
//!     .add(
//!         json!({
//!             "$id": "urn:widget",
//!             "type": "object",
//!             "properties": { "id": { "type": "integer" } },
//!             "links": [{ "rel": "self", "href": "/widgets/{id}" }]
//!         }),
//!         Some("#/definitions/widget"),
//!     )
//!     .unwrap();
//!
//! // Either lookup strategy finds the same document
//! assert_eq!(index.get("urn:widget"), index.get("#/definitions/widget"));
//!
//! let widget = index.schema("urn:widget").unwrap();
//! let entity = widget.create(json!({ "id": 42 }));
//! assert!(entity.validate().is_ok());
//! assert_eq!(entity.url("self").unwrap(), "/widgets/42");
//! ```
//!
//! # Pointer paths
//!
//! | Path | Root key | Pointer |
//! |------|----------|---------|
//! | `#` | `#` | (none) |
//! | `#/definitions` | `#/definitions` | (none) |
//! | `#/definitions/widget/properties/id` | `#/definitions` | `/widget/properties/id` |
//! | `urn:widget` | `urn:widget` | (none) |
//! | `urn:widget#/properties/id` | `urn:widget` | `/properties/id` |

mod denormalize;
mod entity;
mod error;
mod index;
mod link;
mod loader;
mod meta;
mod pointer;
mod resource;
mod schema;
mod transport;
mod types;
mod validator;

pub use denormalize::{denormalize, denormalize_in_place};
pub use entity::EntityBinding;
pub use error::{
    DenormalizeError, EngineError, IndexError, LinkError, ResolveError, SchemaError,
    TransportError, ValidateError,
};
pub use index::SchemaIndex;
pub use link::{matches, Action, ActionOptions, Link, LinkDescriptor, REL_COLLECTION, REL_SELF};
pub use loader::{is_url, load_document, load_document_auto, load_document_str};
pub use meta::{DRAFT4_SCHEMA_ID, HYPER_SCHEMA_ID, LINKS_ID};
pub use pointer::{dereference, PointerPath};
pub use resource::Resource;
pub use schema::SchemaFacade;
pub use transport::{Request, Response, Transport};
pub use types::{
    is_empty, json_type_name, normalize_id, schema_id, EngineOptions, Method, Resolvers,
    SchemaSource,
};
pub use validator::{JsonSchemaEngine, ValidationEngine, Validator};

#[cfg(feature = "remote")]
pub use transport::HttpTransport;
