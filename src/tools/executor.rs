//! Request Executor
//!
//! Information Hiding:
//! - Argument-name matching (case-insensitive) hidden from callers
//! - Path/query encoding rules hidden
//! - Transport failures and non-2xx answers folded into `ToolError::HttpCall`
//!
//! This is the only place where the untyped argument map meets an
//! `OperationBinding`. Nothing here retries.

use super::binding::OperationBinding;
use super::http::{HttpRequest, HttpTransport};
use super::{ArgumentMap, REQUEST_BODY_ARGUMENT};
use crate::error::ToolError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}/]+\}").expect("placeholder pattern is valid"));

/// Shapes and dispatches requests for bound operations
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    headers: Arc<Vec<(String, String)>>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("headers", &self.headers)
            .finish()
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, headers: Vec<(String, String)>) -> Self {
        Self {
            transport,
            headers: Arc::new(headers),
        }
    }

    /// Execute the operation and return the raw response body
    pub async fn execute(
        &self,
        binding: &OperationBinding,
        mut args: ArgumentMap,
    ) -> Result<String, ToolError> {
        let request = self.build_request(binding, &mut args)?;

        tracing::debug!("Executing {} {}", request.method, request.url);
        if let Some(body) = &request.body {
            tracing::debug!("Body: {}", body);
        }

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ToolError::HttpCall {
                status: Some(response.status),
                message: response.body,
            });
        }

        Ok(response.body)
    }

    /// Build the request without sending it
    ///
    /// The body argument is removed from `args` before path and query
    /// construction, so it is never encoded twice.
    pub fn build_request(
        &self,
        binding: &OperationBinding,
        args: &mut ArgumentMap,
    ) -> Result<HttpRequest, ToolError> {
        let body = take_body(binding, args)?;
        let path = build_path(binding, args)?;
        let query = build_query(binding, args)?;

        let url = if query.is_empty() {
            format!("{}{}", binding.server_url, path)
        } else {
            format!("{}{}?{}", binding.server_url, path, query)
        };

        let mut headers = self.headers.as_ref().clone();
        if body.is_some() {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method: binding.method,
            url,
            headers,
            body,
        })
    }
}

/// Substitute every declared path parameter into the path template
pub fn build_path(binding: &OperationBinding, args: &ArgumentMap) -> Result<String, ToolError> {
    let mut path = binding.path.clone();

    for parameter in binding.path_parameters() {
        let value = find_argument(args, &parameter.name).ok_or_else(|| {
            ToolError::MissingArgument {
                name: parameter.name.clone(),
            }
        })?;
        let rendered = percent_encode(&render_value(value));
        path = path.replace(&format!("{{{}}}", parameter.name), &rendered);
    }

    let leftover = PLACEHOLDER.find(&path).map(|m| m.as_str().to_string());
    if let Some(placeholder) = leftover {
        return Err(ToolError::UnresolvedPlaceholder { path, placeholder });
    }

    Ok(path)
}

/// Build `name=value` pairs for the declared query parameters, in declaration order
pub fn build_query(binding: &OperationBinding, args: &ArgumentMap) -> Result<String, ToolError> {
    let mut pairs = Vec::new();

    for parameter in binding.query_parameters() {
        let Some(value) = find_argument(args, &parameter.name) else {
            if parameter.required {
                return Err(ToolError::MissingArgument {
                    name: parameter.name.clone(),
                });
            }
            continue;
        };

        let name = form_encode(&parameter.name);
        match value {
            // form style, exploded: tag=a&tag=b
            Value::Array(items) => {
                for item in items.iter().filter(|item| !item.is_null()) {
                    pairs.push(format!("{}={}", name, form_encode(&render_value(item))));
                }
            }
            other => pairs.push(format!("{}={}", name, form_encode(&render_value(other)))),
        }
    }

    Ok(pairs.join("&"))
}

/// Remove the body argument and serialize it as JSON
pub fn take_body(
    binding: &OperationBinding,
    args: &mut ArgumentMap,
) -> Result<Option<String>, ToolError> {
    let key = args
        .keys()
        .find(|key| key.eq_ignore_ascii_case(REQUEST_BODY_ARGUMENT))
        .cloned();
    let value = key.and_then(|key| args.remove(&key));

    if !binding.expects_body {
        if value.as_ref().is_some_and(|value| !value.is_null()) {
            tracing::debug!(
                "Operation {} takes no JSON body, dropping {} argument",
                binding.operation_id,
                REQUEST_BODY_ARGUMENT
            );
        }
        return Ok(None);
    }

    match value {
        Some(value) if !value.is_null() => Ok(Some(serde_json::to_string(&value)?)),
        _ if binding.body_required => Err(ToolError::MissingArgument {
            name: REQUEST_BODY_ARGUMENT.to_string(),
        }),
        _ => Ok(None),
    }
}

/// Case-insensitive argument lookup; an exact match wins, null counts as absent
fn find_argument<'a>(args: &'a ArgumentMap, name: &str) -> Option<&'a Value> {
    args.get(name)
        .or_else(|| {
            args.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .filter(|value| !value.is_null())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => {
                let _ = write!(encoded, "%{:02X}", byte);
            }
        }
    }
    encoded
}

fn form_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::tools::binding::{BoundParameter, HttpMethod, ParameterLocation};
    use crate::tools::http::HttpResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingTransport {
        status: u16,
        body: String,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl HttpTransport for FailingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connect("connection refused".to_string()))
        }
    }

    fn param(name: &str, location: ParameterLocation, required: bool) -> BoundParameter {
        BoundParameter {
            name: name.to_string(),
            location,
            required,
        }
    }

    fn binding(method: HttpMethod, path: &str, parameters: Vec<BoundParameter>) -> OperationBinding {
        OperationBinding {
            operation_id: "op".to_string(),
            method,
            server_url: "http://example.com".to_string(),
            path: path.to_string(),
            parameters,
            expects_body: false,
            body_required: false,
        }
    }

    fn args(value: Value) -> ArgumentMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_build_query_string() {
        let binding = binding(
            HttpMethod::Get,
            "/path",
            vec![
                param("param1", ParameterLocation::Query, false),
                param("param2", ParameterLocation::Query, false),
            ],
        );

        let query = build_query(&binding, &args(json!({"param1": "value1", "param2": "value2"})))
            .unwrap();

        assert!(query.contains("param1=value1"));
        assert!(query.contains("param2=value2"));
        assert_eq!(query, "param1=value1&param2=value2");
    }

    #[test]
    fn test_build_path() {
        let binding = binding(
            HttpMethod::Get,
            "/path/{param1}/{param2}",
            vec![
                param("param1", ParameterLocation::Path, true),
                param("param2", ParameterLocation::Path, true),
            ],
        );

        let path = build_path(&binding, &args(json!({"param1": "value1", "param2": "value2"})))
            .unwrap();
        assert_eq!(path, "/path/value1/value2");
    }

    #[test]
    fn test_build_path_encodes_reserved_characters() {
        let binding = binding(
            HttpMethod::Get,
            "/files/{name}",
            vec![param("name", ParameterLocation::Path, true)],
        );

        let path = build_path(&binding, &args(json!({"name": "a b/c?d#e%"}))).unwrap();
        assert_eq!(path, "/files/a%20b%2Fc%3Fd%23e%25");
    }

    #[test]
    fn test_argument_names_match_case_insensitively() {
        let binding = binding(
            HttpMethod::Get,
            "/accounts/{accountId}",
            vec![
                param("accountId", ParameterLocation::Path, true),
                param("recipientName", ParameterLocation::Query, false),
            ],
        );
        let arguments = args(json!({"ACCOUNTID": 42, "recipientname": "Ann Lee"}));

        assert_eq!(build_path(&binding, &arguments).unwrap(), "/accounts/42");
        assert_eq!(
            build_query(&binding, &arguments).unwrap(),
            "recipientName=Ann+Lee"
        );
    }

    #[test]
    fn test_missing_path_argument() {
        let binding = binding(
            HttpMethod::Get,
            "/users/{userId}",
            vec![param("userId", ParameterLocation::Path, true)],
        );

        let error = build_path(&binding, &args(json!({"userId": null}))).unwrap_err();
        assert!(matches!(error, ToolError::MissingArgument { ref name } if name == "userId"));

        let error = build_path(&binding, &ArgumentMap::new()).unwrap_err();
        assert!(matches!(error, ToolError::MissingArgument { ref name } if name == "userId"));
    }

    #[test]
    fn test_undeclared_placeholder_fails() {
        let binding = binding(HttpMethod::Get, "/users/{userId}", vec![]);

        let error = build_path(&binding, &args(json!({"userId": "1"}))).unwrap_err();
        assert!(matches!(
            error,
            ToolError::UnresolvedPlaceholder { ref placeholder, .. } if placeholder == "{userId}"
        ));
    }

    #[test]
    fn test_query_optional_omitted_required_enforced() {
        let binding = binding(
            HttpMethod::Get,
            "/search",
            vec![
                param("q", ParameterLocation::Query, true),
                param("page", ParameterLocation::Query, false),
            ],
        );

        assert_eq!(build_query(&binding, &args(json!({"q": "rust"}))).unwrap(), "q=rust");

        let error = build_query(&binding, &args(json!({"page": 2}))).unwrap_err();
        assert!(matches!(error, ToolError::MissingArgument { ref name } if name == "q"));
    }

    #[test]
    fn test_query_array_values_are_exploded() {
        let binding = binding(
            HttpMethod::Get,
            "/pets",
            vec![param("tag", ParameterLocation::Query, false)],
        );

        let query = build_query(&binding, &args(json!({"tag": ["cat", "dog", null]}))).unwrap();
        assert_eq!(query, "tag=cat&tag=dog");
    }

    #[test]
    fn test_take_body_removes_argument() {
        let mut binding = binding(HttpMethod::Post, "/path", vec![]);
        binding.expects_body = true;

        let mut arguments = args(json!({
            "requestbody": {"key1": "value1", "key2": "value2"},
            "other": 1
        }));
        let body = take_body(&binding, &mut arguments).unwrap().unwrap();

        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, json!({"key1": "value1", "key2": "value2"}));
        assert!(!arguments.contains_key("requestbody"));
        assert!(arguments.contains_key("other"));
    }

    #[test]
    fn test_body_dropped_when_operation_takes_none() {
        let binding = binding(HttpMethod::Get, "/users", vec![]);

        let mut arguments = args(json!({"requestBody": {"name": "Bob"}, "limit": 5}));
        assert_eq!(take_body(&binding, &mut arguments).unwrap(), None);
        assert!(!arguments.contains_key("requestBody"));
        assert!(arguments.contains_key("limit"));
    }

    #[test]
    fn test_required_body_missing() {
        let mut binding = binding(HttpMethod::Post, "/payments", vec![]);
        binding.expects_body = true;
        binding.body_required = true;

        let error = take_body(&binding, &mut ArgumentMap::new()).unwrap_err();
        assert!(matches!(error, ToolError::MissingArgument { ref name } if name == "requestBody"));
    }

    #[tokio::test]
    async fn test_execute_composes_request() {
        let transport = RecordingTransport::new(200, "Success");
        let executor = RequestExecutor::new(
            transport.clone(),
            vec![("X-Api-Key".to_string(), "secret".to_string())],
        );

        let mut binding = binding(
            HttpMethod::Post,
            "/path/{pathParam1}/{pathParam2}",
            vec![
                param("pathParam1", ParameterLocation::Path, true),
                param("pathParam2", ParameterLocation::Path, true),
                param("param1", ParameterLocation::Query, false),
            ],
        );
        binding.expects_body = true;

        let result = executor
            .execute(
                &binding,
                args(json!({
                    "pathParam1": "pathValue1",
                    "pathParam2": "pathValue2",
                    "param1": "value1",
                    "requestBody": {"key1": "value1"}
                })),
            )
            .await
            .unwrap();

        assert_eq!(result, "Success");
        let request = transport.last();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.url,
            "http://example.com/path/pathValue1/pathValue2?param1=value1"
        );
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("x-api-key"), Some("secret"));
        assert_eq!(request.body.as_deref(), Some(r#"{"key1":"value1"}"#));
    }

    #[tokio::test]
    async fn test_execute_without_body_sends_no_content_type() {
        let transport = RecordingTransport::new(200, "[]");
        let executor = RequestExecutor::new(transport.clone(), Vec::new());
        let binding = binding(HttpMethod::Get, "/users", vec![]);

        executor.execute(&binding, ArgumentMap::new()).await.unwrap();

        let request = transport.last();
        assert_eq!(request.url, "http://example.com/users");
        assert!(request.body.is_none());
        assert!(request.header("content-type").is_none());
    }

    #[tokio::test]
    async fn test_execute_non_success_status() {
        let transport = RecordingTransport::new(404, "user not found");
        let executor = RequestExecutor::new(transport, Vec::new());
        let binding = binding(HttpMethod::Delete, "/users", vec![]);

        let error = executor.execute(&binding, ArgumentMap::new()).await.unwrap_err();
        assert_eq!(error.status(), Some(404));
        assert!(error.to_string().contains("user not found"));
    }

    #[tokio::test]
    async fn test_execute_transport_failure() {
        let executor = RequestExecutor::new(Arc::new(FailingTransport), Vec::new());
        let binding = binding(HttpMethod::Get, "/users", vec![]);

        let error = executor.execute(&binding, ArgumentMap::new()).await.unwrap_err();
        assert!(matches!(error, ToolError::HttpCall { status: None, .. }));
        assert!(error.to_string().contains("connection refused"));
    }
}
