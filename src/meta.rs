//! Bundled draft-04 Hyper-Schema meta-schemas.

use serde_json::Value;

use crate::error::ResolveError;

/// Identifier of the Hyper-Schema meta-schema.
pub const HYPER_SCHEMA_ID: &str = "http://json-schema.org/draft-04/hyper-schema#";

/// Identifier of the Links vocabulary meta-schema.
pub const LINKS_ID: &str = "http://json-schema.org/draft-04/links#";

/// Identifier of the core draft-04 meta-schema, known to the validation engine.
pub const DRAFT4_SCHEMA_ID: &str = "http://json-schema.org/draft-04/schema#";

const HYPER_SCHEMA: &str = include_str!("../meta/hyper-schema.json");
const LINKS: &str = include_str!("../meta/links.json");

/// The baseline meta-schemas every index registers before consumer schemas.
pub fn baseline() -> Result<Vec<Value>, ResolveError> {
    [HYPER_SCHEMA, LINKS]
        .iter()
        .map(|raw| serde_json::from_str(raw).map_err(|source| ResolveError::InvalidJson { source }))
        .collect()
}
