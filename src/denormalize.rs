//! Denormalization: replacing `$ref` properties with the schemas they name.
//!
//! Only the immediate `properties` of a schema are inspected. A property
//! whose definition carries `$ref` is replaced wholesale by the referenced
//! schema, itself denormalized first. References that do not resolve are
//! left as they are.
//!
//! References currently being expanded are tracked along the expansion path;
//! meeting one again (a cycle such as A -> B -> A) leaves that `$ref` intact
//! instead of expanding it. A document passed by value counts as the
//! schema it was derived from when it equals that schema, registered or
//! denormalized, so denormalizing a result again changes nothing.

use serde_json::Value;

use crate::error::DenormalizeError;
use crate::index::SchemaIndex;
use crate::types::{json_type_name, normalize_id, schema_id, SchemaSource, REF};

/// Denormalize a schema given by reference or as a document.
///
/// A reference is looked up in the index and a copy of the registered
/// document is expanded; registered documents are never modified. A
/// document is expanded in place and returned.
///
/// # Errors
///
/// `UnresolvedReference` when a reference names nothing in the index,
/// `Malformed` when the schema is not an object.
pub fn denormalize(
    index: &SchemaIndex,
    source: impl Into<SchemaSource>,
) -> Result<Value, DenormalizeError> {
    match source.into() {
        SchemaSource::Ref(reference) => {
            let target = index
                .lookup(&reference)
                .ok_or_else(|| DenormalizeError::UnresolvedReference {
                    reference: reference.clone(),
                })?;
            let mut schema = target.clone();
            let mut visiting = vec![reference];
            expand_checked(index, &mut schema, &mut visiting)?;
            Ok(schema)
        }
        SchemaSource::Document(mut schema) => {
            let mut visiting = self_references(index, &schema);
            expand_checked(index, &mut schema, &mut visiting)?;
            Ok(schema)
        }
    }
}

/// Denormalize a schema document in place.
pub fn denormalize_in_place(index: &SchemaIndex, schema: &mut Value) -> Result<(), DenormalizeError> {
    let mut visiting = self_references(index, schema);
    expand_checked(index, schema, &mut visiting)
}

/// Top-level property references naming `schema` itself: the registered
/// document, or what denormalizing that reference produces.
fn self_references(index: &SchemaIndex, schema: &Value) -> Vec<String> {
    let Some(Value::Object(properties)) = schema.get("properties") else {
        return Vec::new();
    };

    properties
        .values()
        .filter_map(|property| property.get(REF).and_then(Value::as_str))
        .filter(|reference| {
            index.lookup(reference) == Some(schema)
                || denormalize(index, *reference).is_ok_and(|expanded| &expanded == schema)
        })
        .map(String::from)
        .collect()
}

fn expand_checked(
    index: &SchemaIndex,
    schema: &mut Value,
    visiting: &mut Vec<String>,
) -> Result<(), DenormalizeError> {
    if !schema.is_object() {
        return Err(DenormalizeError::Malformed {
            actual: json_type_name(schema).to_string(),
        });
    }
    if let Some(id) = schema_id(schema) {
        visiting.push(id.to_string());
    }
    expand(index, schema, visiting);
    Ok(())
}

fn is_visiting(visiting: &[String], reference: &str) -> bool {
    let reference = normalize_id(reference);
    visiting.iter().any(|seen| normalize_id(seen) == reference)
}

fn expand(index: &SchemaIndex, schema: &mut Value, visiting: &mut Vec<String>) {
    let Some(Value::Object(properties)) = schema.get_mut("properties") else {
        return;
    };

    for (name, property) in properties.iter_mut() {
        let Some(reference) = property.get(REF).and_then(Value::as_str) else {
            continue;
        };

        if is_visiting(visiting, reference) {
            tracing::debug!(property = %name, reference = %reference, "leaving cyclic $ref unexpanded");
            continue;
        }

        let Some(target) = index.lookup(reference).filter(|target| target.is_object()) else {
            continue;
        };

        let mut expanded = target.clone();
        let depth = visiting.len();
        visiting.push(reference.to_string());
        if let Some(id) = schema_id(&expanded) {
            visiting.push(id.to_string());
        }
        expand(index, &mut expanded, visiting);
        visiting.truncate(depth);

        *property = expanded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index_with(schemas: Vec<(Value, &str)>) -> SchemaIndex {
        let mut index = SchemaIndex::new().without_transport();
        for (schema, key) in schemas {
            index.add(schema, Some(key)).unwrap();
        }
        index
    }

    #[test]
    fn document_without_properties_is_unchanged() {
        let index = index_with(vec![]);
        let schema = json!({ "type": "string", "$ref": "urn:elsewhere" });
        assert_eq!(denormalize(&index, schema.clone()).unwrap(), schema);
    }

    #[test]
    fn replaces_ref_properties() {
        let a = json!({ "$id": "urn:a", "type": "object", "properties": { "x": { "type": "integer" } } });
        let index = index_with(vec![(a.clone(), "urn:a")]);

        let b = json!({
            "$id": "urn:b",
            "type": "object",
            "properties": {
                "a": { "$ref": "urn:a" },
                "name": { "type": "string" }
            }
        });

        let result = denormalize(&index, b).unwrap();
        assert_eq!(result["properties"]["a"], a);
        assert_eq!(result["properties"]["name"], json!({ "type": "string" }));
    }

    #[test]
    fn expands_references_recursively() {
        let index = index_with(vec![
            (json!({ "type": "string", "format": "email" }), "#/definitions/email"),
            (
                json!({
                    "type": "object",
                    "properties": { "email": { "$ref": "#/definitions/email" } }
                }),
                "#/definitions/owner",
            ),
        ]);

        let widget = json!({
            "type": "object",
            "properties": { "owner": { "$ref": "#/definitions/owner" } }
        });

        let result = denormalize(&index, widget).unwrap();
        assert_eq!(
            result["properties"]["owner"]["properties"]["email"],
            json!({ "type": "string", "format": "email" })
        );
    }

    #[test]
    fn unresolved_ref_is_kept() {
        let index = index_with(vec![]);
        let schema = json!({ "properties": { "x": { "$ref": "urn:nowhere" } } });
        let result = denormalize(&index, schema.clone()).unwrap();
        assert_eq!(result, schema);
    }

    #[test]
    fn by_reference_leaves_index_untouched() {
        let index = index_with(vec![
            (json!({ "type": "integer" }), "urn:count"),
            (
                json!({ "type": "object", "properties": { "n": { "$ref": "urn:count" } } }),
                "urn:counter",
            ),
        ]);

        let result = denormalize(&index, "urn:counter").unwrap();
        assert_eq!(result["properties"]["n"], json!({ "type": "integer" }));
        assert_eq!(
            index.get("urn:counter").unwrap()["properties"]["n"],
            json!({ "$ref": "urn:count" })
        );
    }

    #[test]
    fn unknown_reference_fails() {
        let index = index_with(vec![]);
        let result = denormalize(&index, "urn:missing");
        assert!(matches!(
            result,
            Err(DenormalizeError::UnresolvedReference { reference }) if reference == "urn:missing"
        ));
    }

    #[test]
    fn non_object_fails() {
        let index = index_with(vec![]);
        let result = denormalize(&index, json!(42));
        assert!(matches!(result, Err(DenormalizeError::Malformed { actual }) if actual == "number"));

        let result = denormalize(&index, json!([1, 2]));
        assert!(matches!(result, Err(DenormalizeError::Malformed { .. })));
    }

    #[test]
    fn cyclic_pair_terminates() {
        let index = index_with(vec![
            (
                json!({ "$id": "urn:a", "properties": { "b": { "$ref": "urn:b" } } }),
                "urn:a",
            ),
            (
                json!({ "$id": "urn:b", "properties": { "a": { "$ref": "urn:a" } } }),
                "urn:b",
            ),
        ]);

        let result = denormalize(&index, "urn:a").unwrap();
        assert_eq!(result["properties"]["b"]["$id"], "urn:b");
        assert_eq!(
            result["properties"]["b"]["properties"]["a"],
            json!({ "$ref": "urn:a" })
        );
    }

    #[test]
    fn self_reference_terminates() {
        let index = index_with(vec![(
            json!({ "$id": "urn:node", "properties": { "next": { "$ref": "urn:node" } } }),
            "urn:node",
        )]);

        let result = denormalize(&index, "urn:node").unwrap();
        assert_eq!(result["properties"]["next"], json!({ "$ref": "urn:node" }));
    }

    #[test]
    fn idempotent() {
        let index = index_with(vec![
            (json!({ "type": "integer" }), "urn:count"),
            (
                json!({ "$id": "urn:a", "properties": { "b": { "$ref": "urn:b" }, "n": { "$ref": "urn:count" } } }),
                "urn:a",
            ),
            (
                json!({ "$id": "urn:b", "properties": { "a": { "$ref": "urn:a" } } }),
                "urn:b",
            ),
        ]);

        let once = denormalize(&index, "urn:a").unwrap();
        let twice = denormalize(&index, once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keyed_self_reference_is_idempotent() {
        let index = index_with(vec![(
            json!({ "type": "object", "properties": { "next": { "$ref": "#/definitions/node" } } }),
            "#/definitions/node",
        )]);

        let once = denormalize(&index, "#/definitions/node").unwrap();
        assert_eq!(once["properties"]["next"], json!({ "$ref": "#/definitions/node" }));
        let twice = denormalize(&index, once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keyed_cycle_with_expanded_siblings_is_idempotent() {
        let index = index_with(vec![
            (json!({ "type": "integer" }), "#/definitions/count"),
            (
                json!({
                    "type": "object",
                    "properties": {
                        "next": { "$ref": "#/definitions/node" },
                        "n": { "$ref": "#/definitions/count" }
                    }
                }),
                "#/definitions/node",
            ),
        ]);

        let once = denormalize(&index, "#/definitions/node").unwrap();
        assert_eq!(once["properties"]["n"], json!({ "type": "integer" }));
        let twice = denormalize(&index, once.clone()).unwrap();
        assert_eq!(once, twice);

        let mut in_place = once.clone();
        denormalize_in_place(&index, &mut in_place).unwrap();
        assert_eq!(in_place, once);
    }

    #[test]
    fn unregistered_document_still_expands_cycles_once() {
        let index = index_with(vec![(
            json!({ "type": "object", "properties": { "next": { "$ref": "#/definitions/node" } } }),
            "#/definitions/node",
        )]);

        let list = json!({ "properties": { "head": { "$ref": "#/definitions/node" } } });
        let once = denormalize(&index, list).unwrap();
        assert_eq!(
            once["properties"]["head"]["properties"]["next"],
            json!({ "$ref": "#/definitions/node" })
        );
        assert_eq!(denormalize(&index, once.clone()).unwrap(), once);
    }

    #[test]
    fn in_place() {
        let index = index_with(vec![(json!({ "type": "boolean" }), "urn:flag")]);
        let mut schema = json!({ "properties": { "on": { "$ref": "urn:flag" } } });
        denormalize_in_place(&index, &mut schema).unwrap();
        assert_eq!(schema["properties"]["on"], json!({ "type": "boolean" }));
    }
}
