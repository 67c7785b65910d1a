//! API description loading
//!
//! Information Hiding:
//! - File vs URL fetching hidden behind `SpecLocation`
//! - JSON/YAML detection hidden
//! - `$ref` inlining happens before typed parsing; only bare
//!   `#/components/schemas/{name}` references survive, for `SchemaScope`
//!   to resolve lazily
//! - OpenAPI 3.1 schema keywords are rewritten into their 3.0 form

use crate::error::ImportError;
use crate::tools::http::{HttpRequest, HttpTransport};
use openapiv3::OpenAPI;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Where an API description lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecLocation {
    File(PathBuf),
    Url(String),
}

impl SpecLocation {
    /// `http://` and `https://` locations are URLs, everything else is a file path
    pub fn parse(location: &str) -> Self {
        match url::Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                SpecLocation::Url(location.to_string())
            }
            _ => SpecLocation::File(PathBuf::from(location)),
        }
    }
}

impl fmt::Display for SpecLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecLocation::File(path) => write!(f, "{}", path.display()),
            SpecLocation::Url(url) => f.write_str(url),
        }
    }
}

impl From<&str> for SpecLocation {
    fn from(location: &str) -> Self {
        SpecLocation::parse(location)
    }
}

/// A parsed OpenAPI 3.x description with every non-schema `$ref` inlined
#[derive(Debug, Clone)]
pub struct ApiDocument {
    source: String,
    spec: OpenAPI,
}

impl ApiDocument {
    /// Read and resolve a document from a file or URL
    ///
    /// URLs are fetched through `transport`; this is the only network call
    /// an import makes.
    pub async fn load(
        location: &SpecLocation,
        transport: &dyn HttpTransport,
    ) -> Result<Self, ImportError> {
        let source = location.to_string();
        tracing::info!("Loading API description from {}", source);

        let content = match location {
            SpecLocation::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ImportError::parse(&source, format!("failed to read file: {}", e)))?,
            SpecLocation::Url(url) => {
                let response = transport
                    .send(HttpRequest::get(url.as_str()))
                    .await
                    .map_err(|e| ImportError::parse(&source, format!("failed to fetch: {}", e)))?;
                if !response.is_success() {
                    return Err(ImportError::parse(
                        &source,
                        format!("server returned status {}", response.status),
                    ));
                }
                response.body
            }
        };

        Self::parse(&content, source)
    }

    /// Parse and resolve a document held in memory (JSON or YAML)
    pub fn parse(content: &str, source: impl Into<String>) -> Result<Self, ImportError> {
        let source = source.into();

        let raw: Value = if content.trim_start().starts_with('{') {
            serde_json::from_str(content)
                .map_err(|e| ImportError::parse(&source, format!("invalid JSON: {}", e)))?
        } else {
            let yaml: serde_yaml::Value = serde_yaml::from_str(content)
                .map_err(|e| ImportError::parse(&source, format!("invalid YAML: {}", e)))?;
            yaml_to_json(yaml)
        };

        Self::from_value(raw, source)
    }

    /// Resolve and type-check an already decoded document
    pub fn from_value(mut raw: Value, source: impl Into<String>) -> Result<Self, ImportError> {
        let source = source.into();

        let version = raw
            .get("openapi")
            .and_then(Value::as_str)
            .ok_or_else(|| ImportError::parse(&source, "missing 'openapi' version field"))?
            .to_string();
        if !version.starts_with("3.") {
            return Err(ImportError::parse(
                &source,
                format!("unsupported OpenAPI version '{}', only 3.x is supported", version),
            ));
        }
        if version.starts_with("3.1") {
            downgrade_schemas(&mut raw, false);
            if let Value::Object(root) = &mut raw {
                root.entry("paths").or_insert_with(|| Value::Object(Map::new()));
            }
        }

        let mut stack = Vec::new();
        let resolved = resolve_refs(&raw, &raw, &mut stack).map_err(|e| ImportError::parse(&source, e))?;

        let spec: OpenAPI = serde_json::from_value(resolved)
            .map_err(|e| ImportError::parse(&source, format!("invalid OpenAPI document: {}", e)))?;

        if spec.paths.paths.is_empty() {
            tracing::warn!("API description {} declares no paths", source);
        }

        Ok(Self { source, spec })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn spec(&self) -> &OpenAPI {
        &self.spec
    }

    /// First server URL declared by the document, if any
    pub fn default_server_url(&self) -> Option<&str> {
        self.spec.servers.first().map(|server| server.url.as_str())
    }
}

const SCHEMA_PREFIX: &str = "#/components/schemas/";

/// `#/components/schemas/{name}` with nothing below the name
fn is_component_schema(reference: &str) -> bool {
    reference
        .strip_prefix(SCHEMA_PREFIX)
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// Inline every local `$ref` except bare component schema references
///
/// Component schemas may reference each other freely, so expanding them
/// here would grow with every path through the reference graph. They are
/// kept as references and expanded on demand with a depth bound.
///
/// `stack` holds the references currently being expanded; meeting one of
/// them again means a cycle, which is cut with an untyped schema.
fn resolve_refs(node: &Value, root: &Value, stack: &mut Vec<String>) -> Result<Value, String> {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                return resolve_reference(reference, map, root, stack);
            }
            let mut resolved = Map::with_capacity(map.len());
            for (key, value) in map {
                resolved.insert(key.clone(), resolve_refs(value, root, stack)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_refs(item, root, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn resolve_reference(
    reference: &str,
    siblings: &Map<String, Value>,
    root: &Value,
    stack: &mut Vec<String>,
) -> Result<Value, String> {
    let pointer = reference
        .strip_prefix('#')
        .ok_or_else(|| format!("external reference '{}' is not supported", reference))?;

    let has_overlay = siblings.keys().any(|key| key != "$ref");
    if is_component_schema(reference) && !has_overlay {
        return Ok(Value::Object(siblings.clone()));
    }

    if stack.iter().any(|seen| seen == reference) {
        tracing::debug!("Cyclic reference {} left untyped", reference);
        return Ok(Value::Object(Map::new()));
    }

    let target = root
        .pointer(pointer)
        .ok_or_else(|| format!("unresolvable reference '{}'", reference))?;

    stack.push(reference.to_string());
    let resolved = resolve_refs(target, root, stack);
    stack.pop();
    let mut resolved = resolved?;

    if let Value::Object(target_map) = &mut resolved {
        for (key, value) in siblings.iter().filter(|(key, _)| key.as_str() != "$ref") {
            target_map.insert(key.clone(), resolve_refs(value, root, stack)?);
        }
    }

    Ok(resolved)
}

/// Rewrite OpenAPI 3.1 schema keywords into their 3.0 equivalent
///
/// `type: [T, "null"]` becomes `type: T, nullable: true`; a type list with
/// several non-null members loses its `type` and is treated as untyped.
/// Numeric `exclusiveMinimum`/`exclusiveMaximum` become the boolean form.
fn downgrade_schemas(node: &mut Value, in_properties: bool) {
    match node {
        Value::Object(map) => {
            let type_list = match map.get("type") {
                Some(Value::Array(types)) => Some(types.clone()),
                _ => None,
            };
            if let Some(types) = type_list {
                let nullable = types.iter().any(|t| t.as_str() == Some("null"));
                let concrete: Vec<&Value> = types
                    .iter()
                    .filter(|t| t.as_str().is_some_and(|t| t != "null"))
                    .collect();
                match concrete.as_slice() {
                    [single] => {
                        map.insert("type".to_string(), (*single).clone());
                        if nullable {
                            map.insert("nullable".to_string(), Value::Bool(true));
                        }
                    }
                    _ => {
                        map.remove("type");
                    }
                }
            }

            for (exclusive, inclusive) in [
                ("exclusiveMinimum", "minimum"),
                ("exclusiveMaximum", "maximum"),
            ] {
                if let Some(bound) = map.get(exclusive).filter(|bound| bound.is_number()).cloned() {
                    map.insert(inclusive.to_string(), bound);
                    map.insert(exclusive.to_string(), Value::Bool(true));
                }
            }

            for (key, value) in map.iter_mut() {
                // literal payloads are not schemas, unless it is a property of that name
                let literal = matches!(key.as_str(), "example" | "examples" | "default" | "enum" | "const");
                if in_properties || !literal {
                    downgrade_schemas(value, !in_properties && key == "properties");
                }
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| downgrade_schemas(item, false)),
        _ => {}
    }
}

/// Convert YAML to JSON, stringifying non-string mapping keys (e.g. `200:`)
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => yaml_to_json(other).to_string(),
    }
}
