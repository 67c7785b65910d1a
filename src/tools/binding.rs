//! Operation Binding - executable counterpart of a tool descriptor

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP verbs an imported operation may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

/// A declared path or query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
}

/// Everything needed to turn an argument map into a concrete HTTP request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationBinding {
    pub operation_id: String,
    pub method: HttpMethod,
    /// Base URL without a trailing slash
    pub server_url: String,
    /// Path template with `{param}` placeholders
    pub path: String,
    /// Declaration order is kept; it fixes the query string order
    pub parameters: Vec<BoundParameter>,
    pub expects_body: bool,
    pub body_required: bool,
}

impl OperationBinding {
    pub fn path_parameters(&self) -> impl Iterator<Item = &BoundParameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }

    pub fn query_parameters(&self) -> impl Iterator<Item = &BoundParameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Query)
    }
}
