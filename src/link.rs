//! Link Description Objects (LDOs) and their resolution into HTTP actions.
//!
//! An LDO's `href` is a URI template whose `{variable}` tokens are filled
//! from an entity instance. Resolving the template and the method yields an
//! [`Action`]: a request bound to one verb of a [`Transport`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LinkError;
use crate::transport::{Request, Response, Transport};
use crate::types::{json_type_name, Method};

/// Relation of a link to the entity itself.
pub const REL_SELF: &str = "self";

/// Relation of a link to the collection the entity belongs to.
pub const REL_COLLECTION: &str = "collection";

const DEFAULT_ENC_TYPE: &str = "application/json";

fn template_variable() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("template pattern is valid"))
}

/// A Link Description Object as declared in a schema's `links`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDescriptor {
    pub rel: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_schema: Option<Value>,
    /// Schema of the data submitted with the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// Partial structural match: every key of `matcher` must be present in
/// `value` with a matching value. Arrays in the matcher match when each of
/// their items matches some item of the value's array.
pub fn matches(value: &Value, matcher: &Value) -> bool {
    match (value, matcher) {
        (Value::Object(value), Value::Object(matcher)) => matcher
            .iter()
            .all(|(key, expected)| value.get(key).is_some_and(|actual| matches(actual, expected))),
        (Value::Array(value), Value::Array(matcher)) => matcher
            .iter()
            .all(|expected| value.iter().any(|actual| matches(actual, expected))),
        _ => value == matcher,
    }
}

/// Options for resolving a link into an [`Action`].
#[derive(Debug, Clone, Default)]
pub struct ActionOptions {
    /// Overrides the link's declared method.
    pub method: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Instance whose properties fill the URI template.
    pub entity: Value,
}

impl ActionOptions {
    pub fn new(entity: Value) -> Self {
        Self {
            entity,
            ..Self::default()
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A resolved, invocable link.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    request: Request,
}

impl Action {
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    /// Perform the request through the transport operation for its verb.
    pub fn call(&self, transport: &dyn Transport, body: Option<Value>) -> Result<Response, LinkError> {
        let request = self.request.clone().body(body);
        tracing::debug!(method = %request.method, url = %request.url, "invoking link action");

        let response = match request.method {
            Method::Get => transport.get(&request),
            Method::Post => transport.post(&request),
            Method::Put => transport.put(&request),
            Method::Patch => transport.patch(&request),
            Method::Delete => transport.delete(&request),
            Method::Head | Method::Options => {
                return Err(LinkError::UnsupportedAction {
                    method: request.method.to_string(),
                })
            }
        }?;

        Ok(response)
    }
}

/// A Link Description Object ready to be resolved against entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    descriptor: LinkDescriptor,
}

impl Link {
    pub fn new(descriptor: LinkDescriptor) -> Self {
        Self { descriptor }
    }

    /// Parse a link from its JSON form.
    pub fn from_value(value: &Value) -> Result<Self, LinkError> {
        let descriptor = serde_json::from_value(value.clone())
            .map_err(|source| LinkError::InvalidDescriptor { source })?;
        Ok(Self::new(descriptor))
    }

    pub fn descriptor(&self) -> &LinkDescriptor {
        &self.descriptor
    }

    pub fn rel(&self) -> &str {
        &self.descriptor.rel
    }

    pub fn href(&self) -> &str {
        &self.descriptor.href
    }

    pub fn target_schema(&self) -> Option<&Value> {
        self.descriptor.target_schema.as_ref()
    }

    /// Declared method, GET when absent.
    pub fn method(&self) -> Result<Method, LinkError> {
        match &self.descriptor.method {
            Some(method) => method.parse(),
            None => Ok(Method::Get),
        }
    }

    pub fn is_item(&self) -> bool {
        self.descriptor.rel == REL_SELF
    }

    pub fn is_collection(&self) -> bool {
        self.descriptor.rel == REL_COLLECTION
    }

    /// Fill the `href` template from `entity`.
    ///
    /// `{name}` reads the entity's `name` property; `{/a/b}` reads a JSON
    /// Pointer. Substituted values are percent-encoded.
    ///
    /// # Errors
    ///
    /// `MissingTemplateVariable` when the entity has no (or a null) value,
    /// `InvalidTemplateValue` for objects and arrays.
    pub fn url(&self, entity: &Value) -> Result<String, LinkError> {
        let href = &self.descriptor.href;
        let mut url = String::with_capacity(href.len());
        let mut last = 0;

        for captures in template_variable().captures_iter(href) {
            let (Some(token), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let variable: String = inner
                .as_str()
                .chars()
                .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
                .collect();

            url.push_str(&href[last..token.start()]);
            url.push_str(&substitute(entity, &variable, href)?);
            last = token.end();
        }
        url.push_str(&href[last..]);

        Ok(url)
    }

    /// Resolve the link into an invocable action.
    ///
    /// The method comes from `options.method`, else the link's declared
    /// method. `encType` becomes the `Content-Type` header unless one is
    /// already given.
    ///
    /// # Errors
    ///
    /// `UnsupportedAction` when the verb has no transport operation, plus
    /// any error from [`url`](Self::url).
    pub fn action(&self, options: ActionOptions) -> Result<Action, LinkError> {
        let method = match &options.method {
            Some(method) => method.parse()?,
            None => self.method()?,
        };
        if !method.is_invocable() {
            return Err(LinkError::UnsupportedAction {
                method: method.to_string(),
            });
        }

        let url = self.url(&options.entity)?;
        let mut request = Request::new(method, url);
        request.headers = options.headers;

        if request.header_value("content-type").is_none() {
            if let Some(enc_type) = &self.descriptor.enc_type {
                request = request.header("Content-Type", enc_type.as_str());
            } else if matches!(method, Method::Post | Method::Put | Method::Patch) {
                request = request.header("Content-Type", DEFAULT_ENC_TYPE);
            }
        }

        Ok(Action { request })
    }
}

fn substitute(entity: &Value, variable: &str, href: &str) -> Result<String, LinkError> {
    let value = if variable.starts_with('/') {
        entity.pointer(variable)
    } else {
        entity.get(variable)
    };

    match value {
        None | Some(Value::Null) => Err(LinkError::MissingTemplateVariable {
            variable: variable.to_string(),
            href: href.to_string(),
        }),
        Some(Value::String(s)) => Ok(urlencoding::encode(s).into_owned()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(LinkError::InvalidTemplateValue {
            variable: variable.to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}
