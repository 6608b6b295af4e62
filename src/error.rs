//! Error types for schema indexing, resolution, denormalization and links.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Errors raised while registering schemas or indexing a root document.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("a schema is already registered under \"{key}\"")]
    AlreadyRegistered { key: String },

    #[error("schema has no key, $id or $ref to index it under")]
    MissingIdentifier,

    #[error("failed to index definition #{position}: schema or key could not be resolved from {definition}")]
    UnresolvedDefinition { position: usize, definition: Value },

    #[error("root document has no definitions to index")]
    MissingDefinitions,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IndexError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            IndexError::Resolve(e) => e.exit_code(),
            _ => 2,
        }
    }
}

/// Errors while turning a reference or location into a schema document.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no schema found for \"{reference}\"")]
    NotFound { reference: String },

    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            ResolveError::Transport(_) => 3,
            _ => 2,
        }
    }
}

/// Errors during denormalization.
#[derive(Debug, Error)]
pub enum DenormalizeError {
    #[error("failed to denormalize malformed JSON Schema: expected object, got {actual}")]
    Malformed { actual: String },

    #[error("cannot denormalize \"{reference}\": no schema is indexed under it")]
    UnresolvedReference { reference: String },
}

/// Errors resolving or invoking a Link Description Object.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("template variable \"{variable}\" in {href} has no value on the entity")]
    MissingTemplateVariable { variable: String, href: String },

    #[error("template variable \"{variable}\" must be a string, number or boolean, got {actual}")]
    InvalidTemplateValue { variable: String, actual: String },

    #[error("unsupported HTTP action: {method}")]
    UnsupportedAction { method: String },

    #[error("no link with rel \"{rel}\"")]
    LinkNotFound { rel: String },

    #[error("invalid link description: {source}")]
    InvalidDescriptor {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl LinkError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LinkError::Transport(_) => 3,
            _ => 2,
        }
    }
}

/// Errors reported by an HTTP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid response body from {url}: {source}")]
    InvalidBody {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no transport configured for {url}")]
    Unavailable { url: String },
}

/// Errors reported by the validation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no schema registered under \"{id}\"")]
    UnknownSchema { id: String },

    #[error("failed to compile schema \"{id}\": {message}")]
    Compile { id: String, message: String },
}

/// Errors during instance validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Engine(_) => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_error_exit_codes() {
        let err = ResolveError::FileNotFound {
            path: PathBuf::from("root.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ResolveError::NotFound {
            reference: "urn:missing".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ResolveError::Transport(TransportError::Status {
            url: "https://api.example.com/schema".into(),
            status: 404,
        });
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn index_error_inherits_resolve_exit_code() {
        let err = IndexError::Resolve(ResolveError::FileNotFound {
            path: PathBuf::from("root.json"),
        });
        assert_eq!(err.exit_code(), 3);
        assert_eq!(IndexError::MissingIdentifier.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![SchemaError {
                path: "/id".into(),
                message: "missing required field".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);

        let err = ValidateError::Engine(EngineError::UnknownSchema { id: "urn:x".into() });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unresolved_definition_names_the_entry() {
        let err = IndexError::UnresolvedDefinition {
            position: 1,
            definition: json!({ "title": "orphan" }),
        };
        let message = err.to_string();
        assert!(message.contains("#1"));
        assert!(message.contains("orphan"));
    }

    #[test]
    fn schema_error_display() {
        let err = SchemaError {
            path: "/owner/email".into(),
            message: "expected string, got number".into(),
        };
        assert_eq!(err.to_string(), "/owner/email: expected string, got number");
    }
}
