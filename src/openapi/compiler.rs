//! Operation Compiler
//!
//! Information Hiding:
//! - Tool naming convention (`{namespace}-{operationId}`) hidden
//! - Parameter merging and location filtering hidden
//! - Request body flattening rules hidden

use super::example::example_description;
use super::schema::{translate, SchemaScope};
use crate::error::ImportError;
use crate::tools::binding::{BoundParameter, HttpMethod, OperationBinding, ParameterLocation};
use crate::tools::{ArgumentSchema, ArgumentType, ToolDescriptor, REQUEST_BODY_ARGUMENT};
use indexmap::IndexMap;
use openapiv3::{
    Components, Operation, Parameter, ParameterData, ParameterSchemaOrContent, ReferenceOr, Schema,
};

/// Compiles operations of one document into descriptor/binding pairs
#[derive(Debug, Clone)]
pub struct OperationCompiler<'a> {
    source: String,
    namespace: String,
    server_url: String,
    body_examples: bool,
    scope: SchemaScope<'a>,
}

impl<'a> OperationCompiler<'a> {
    pub fn new(
        source: impl Into<String>,
        namespace: impl Into<String>,
        server_url: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            namespace: namespace.into(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            body_examples: false,
            scope: SchemaScope::default(),
        }
    }

    /// Resolve `#/components/schemas/...` references against these components
    pub fn with_components(mut self, components: Option<&'a Components>) -> Self {
        self.scope = SchemaScope::new(components);
        self
    }

    /// Describe JSON bodies with a rendered example instead of their own description
    pub fn with_body_examples(mut self, enabled: bool) -> Self {
        self.body_examples = enabled;
        self
    }

    /// Compile one operation
    ///
    /// `path_parameters` are the parameters declared on the path item; an
    /// operation parameter with the same name and location replaces one.
    pub fn compile(
        &self,
        method: &str,
        path: &str,
        path_parameters: &[ReferenceOr<Parameter>],
        operation: &Operation,
    ) -> Result<(ToolDescriptor, OperationBinding), ImportError> {
        let http_method = parse_method(method, path)?;
        let operation_id = operation
            .operation_id
            .clone()
            .ok_or_else(|| ImportError::MissingOperationId {
                method: http_method.to_string(),
                path: path.to_string(),
            })?;

        let mut arguments = ArgumentSchema::default();
        let mut bound = Vec::new();

        for (parameter_data, location) in self.merge_parameters(path_parameters, &operation.parameters)? {
            let required = parameter_data.required || location == ParameterLocation::Path;
            bound.push(BoundParameter {
                name: parameter_data.name.clone(),
                location,
                required,
            });

            let Some(schema) = self.parameter_schema(parameter_data)? else {
                continue;
            };
            let translated = translate(schema, parameter_data.description.as_deref(), &self.scope)
                .map_err(|e| ImportError::parse(&self.source, e))?;
            if let Some(arg) = translated {
                arguments.properties.insert(parameter_data.name.clone(), arg);
                if required {
                    arguments.require(parameter_data.name.clone());
                }
            }
        }

        let (expects_body, body_required) = self.compile_body(operation, &mut arguments)?;

        let descriptor = ToolDescriptor {
            name: format!("{}-{}", self.namespace, operation_id),
            description: describe(operation, http_method, path),
            parameters: arguments,
        };
        let binding = OperationBinding {
            operation_id,
            method: http_method,
            server_url: self.server_url.clone(),
            path: path.to_string(),
            parameters: bound,
            expects_body,
            body_required,
        };

        Ok((descriptor, binding))
    }

    /// Path and query parameters in declaration order; header and cookie ones are skipped
    fn merge_parameters<'p>(
        &self,
        path_parameters: &'p [ReferenceOr<Parameter>],
        operation_parameters: &'p [ReferenceOr<Parameter>],
    ) -> Result<Vec<(&'p ParameterData, ParameterLocation)>, ImportError> {
        let mut merged: IndexMap<(String, ParameterLocation), &'p ParameterData> = IndexMap::new();

        for parameter in path_parameters.iter().chain(operation_parameters) {
            let parameter = match parameter {
                ReferenceOr::Item(parameter) => parameter,
                ReferenceOr::Reference { reference } => {
                    return Err(ImportError::parse(
                        &self.source,
                        format!("unresolved parameter reference {}", reference),
                    ))
                }
            };

            let (data, location) = match parameter {
                Parameter::Path { parameter_data, .. } => (parameter_data, ParameterLocation::Path),
                Parameter::Query { parameter_data, .. } => (parameter_data, ParameterLocation::Query),
                Parameter::Header { parameter_data, .. } | Parameter::Cookie { parameter_data, .. } => {
                    tracing::debug!("Skipping header/cookie parameter '{}'", parameter_data.name);
                    continue;
                }
            };
            merged.insert((data.name.clone(), location), data);
        }

        Ok(merged
            .into_iter()
            .map(|((_, location), data)| (data, location))
            .collect())
    }

    fn parameter_schema<'s>(&self, data: &'s ParameterData) -> Result<Option<&'s Schema>, ImportError>
    where
        'a: 's,
    {
        let schema = match &data.format {
            ParameterSchemaOrContent::Schema(schema) => Some(schema),
            ParameterSchemaOrContent::Content(content) => {
                content.values().find_map(|media| media.schema.as_ref())
            }
        };

        schema
            .map(|schema| self.scope.resolve(schema))
            .transpose()
            .map_err(|e| {
                ImportError::parse(&self.source, format!("parameter '{}': {}", data.name, e))
            })
    }

    /// Adds the `requestBody` argument for JSON bodies; returns (expects_body, body_required)
    fn compile_body(
        &self,
        operation: &Operation,
        arguments: &mut ArgumentSchema,
    ) -> Result<(bool, bool), ImportError> {
        let body = match &operation.request_body {
            None => return Ok((false, false)),
            Some(ReferenceOr::Item(body)) => body,
            Some(ReferenceOr::Reference { reference }) => {
                return Err(ImportError::parse(
                    &self.source,
                    format!("unresolved request body reference {}", reference),
                ))
            }
        };

        let Some(media) = body
            .content
            .iter()
            .find(|(media_type, _)| is_json(media_type))
            .map(|(_, media)| media)
        else {
            tracing::debug!("Request body has no application/json content, not exposed as argument");
            return Ok((false, false));
        };

        let schema = media
            .schema
            .as_ref()
            .map(|schema| self.scope.resolve(schema))
            .transpose()
            .map_err(|e| ImportError::parse(&self.source, format!("request body: {}", e)))?;

        let description = match schema {
            Some(schema) if self.body_examples => Some(example_description(schema, &self.scope)),
            Some(schema) => body
                .description
                .clone()
                .or_else(|| schema.schema_data.description.clone()),
            None => body.description.clone(),
        };

        let translated = match schema {
            Some(schema) => translate(schema, description.as_deref(), &self.scope)
                .map_err(|e| ImportError::parse(&self.source, e))?,
            None => None,
        };
        let argument = translated.unwrap_or_else(|| ArgumentType::Object {
            description: None,
            properties: IndexMap::new(),
            required: Vec::new(),
        });
        let argument = match argument {
            arg @ ArgumentType::Object { .. } if arg.description().is_none() => {
                arg.with_description(description)
            }
            arg => arg,
        };

        // the body's required fields are advertised at the top level
        if let ArgumentType::Object { required, .. } = &argument {
            for name in required {
                arguments.require(name.clone());
            }
        }
        arguments
            .properties
            .insert(REQUEST_BODY_ARGUMENT.to_string(), argument);

        Ok((true, body.required))
    }
}

fn parse_method(method: &str, path: &str) -> Result<HttpMethod, ImportError> {
    match method.to_ascii_lowercase().as_str() {
        "get" => Ok(HttpMethod::Get),
        "post" => Ok(HttpMethod::Post),
        "delete" => Ok(HttpMethod::Delete),
        other => Err(ImportError::UnsupportedOperation {
            method: other.to_ascii_uppercase(),
            path: path.to_string(),
        }),
    }
}

fn is_json(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn describe(operation: &Operation, method: HttpMethod, path: &str) -> String {
    [&operation.description, &operation.summary]
        .into_iter()
        .flatten()
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", method, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operation(value: serde_json::Value) -> Operation {
        serde_json::from_value(value).unwrap()
    }

    fn compiler<'a>() -> OperationCompiler<'a> {
        OperationCompiler::new("test.yaml", "testTool", "http://localhost:8080/")
    }

    #[test]
    fn test_get_with_path_parameter() {
        let op = operation(json!({
            "operationId": "getUserById",
            "description": "Returns a single user.",
            "parameters": [{
                "name": "userId",
                "in": "path",
                "required": true,
                "description": "User identification number",
                "schema": {"type": "string"}
            }],
            "responses": {"200": {"description": "OK"}}
        }));

        let (descriptor, binding) = compiler().compile("get", "/users/{userId}", &[], &op).unwrap();

        assert_eq!(descriptor.name, "testTool-getUserById");
        assert_eq!(descriptor.description, "Returns a single user.");
        assert_eq!(
            descriptor.parameters.properties["userId"],
            ArgumentType::String {
                description: Some("User identification number".to_string())
            }
        );
        assert_eq!(descriptor.parameters.required, vec!["userId".to_string()]);

        assert_eq!(binding.method, HttpMethod::Get);
        assert_eq!(binding.server_url, "http://localhost:8080");
        assert_eq!(binding.path_parameters().count(), 1);
        assert!(!binding.expects_body);
    }

    #[test]
    fn test_request_body_required_fields_are_flattened() {
        let op = operation(json!({
            "operationId": "submitPayment",
            "summary": "Submit a payment request",
            "requestBody": {
                "required": true,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "required": ["recipientName", "amount"],
                            "properties": {
                                "recipientName": {"type": "string", "description": "Name of the recipient"},
                                "accountId": {"type": "integer", "description": "ID of the account"},
                                "amount": {"type": "number", "description": "Amount of the payment"}
                            }
                        }
                    }
                }
            },
            "responses": {"200": {"description": "OK"}}
        }));

        let (descriptor, binding) = compiler().compile("post", "/payments", &[], &op).unwrap();

        assert_eq!(descriptor.description, "Submit a payment request");
        assert_eq!(
            descriptor.parameters.required,
            vec!["recipientName".to_string(), "amount".to_string()]
        );
        assert!(!descriptor.parameters.is_required(REQUEST_BODY_ARGUMENT));

        let ArgumentType::Object { properties, required, .. } =
            &descriptor.parameters.properties[REQUEST_BODY_ARGUMENT]
        else {
            panic!("requestBody should be an object");
        };
        assert_eq!(properties["accountId"].type_name(), "integer");
        assert_eq!(required.len(), 2);

        assert!(binding.expects_body);
        assert!(binding.body_required);
    }

    #[test]
    fn test_non_json_body_is_ignored() {
        let op = operation(json!({
            "operationId": "upload",
            "requestBody": {
                "content": {"multipart/form-data": {"schema": {"type": "object"}}}
            },
            "responses": {"200": {"description": "OK"}}
        }));

        let (descriptor, binding) = compiler().compile("post", "/upload", &[], &op).unwrap();
        assert!(descriptor.parameters.properties.is_empty());
        assert!(!binding.expects_body);
        assert_eq!(descriptor.description, "POST /upload");
    }

    #[test]
    fn test_body_examples_replace_description() {
        let op = operation(json!({
            "operationId": "createNote",
            "requestBody": {
                "description": "The note",
                "content": {
                    "application/json; charset=utf-8": {
                        "schema": {"type": "object", "properties": {"text": {"type": "string"}}}
                    }
                }
            },
            "responses": {"200": {"description": "OK"}}
        }));

        let (plain, _) = compiler().compile("post", "/notes", &[], &op).unwrap();
        assert_eq!(
            plain.parameters.properties[REQUEST_BODY_ARGUMENT].description(),
            Some("The note")
        );

        let (with_example, _) = compiler()
            .with_body_examples(true)
            .compile("post", "/notes", &[], &op)
            .unwrap();
        let description = with_example.parameters.properties[REQUEST_BODY_ARGUMENT]
            .description()
            .unwrap();
        assert!(description.starts_with("Example request body:"));
        assert!(description.contains("\"text\": \"string\""));
    }

    #[test]
    fn test_header_parameters_are_skipped_and_path_level_merged() {
        let path_level: Vec<ReferenceOr<Parameter>> = serde_json::from_value(json!([
            {"name": "accountId", "in": "path", "required": true, "schema": {"type": "string"}},
            {"name": "limit", "in": "query", "schema": {"type": "integer"}, "description": "path level"}
        ]))
        .unwrap();
        let op = operation(json!({
            "operationId": "listTransactions",
            "parameters": [
                {"name": "X-Request-Id", "in": "header", "schema": {"type": "string"}},
                {"name": "limit", "in": "query", "schema": {"type": "integer"}, "description": "operation level"},
                {"name": "filter", "in": "query", "schema": {"type": "null"}}
            ],
            "responses": {"200": {"description": "OK"}}
        }));

        let (descriptor, binding) = compiler()
            .compile("get", "/accounts/{accountId}/transactions", &path_level, &op)
            .unwrap();

        let names: Vec<&String> = descriptor.parameters.properties.keys().collect();
        assert_eq!(names, vec!["accountId", "limit"]);
        assert_eq!(
            descriptor.parameters.properties["limit"].description(),
            Some("operation level")
        );
        assert!(descriptor.parameters.is_required("accountId"));
        assert!(!descriptor.parameters.is_required("limit"));

        // untyped parameters are still bound so they can be sent
        let bound: Vec<&str> = binding.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(bound, vec!["accountId", "limit", "filter"]);
    }

    #[test]
    fn test_referenced_schemas_resolve_through_components() {
        let components: Components = serde_json::from_value(json!({
            "schemas": {
                "Payment": {
                    "type": "object",
                    "description": "A payment",
                    "required": ["amount"],
                    "properties": {
                        "amount": {"type": "number"},
                        "payer": {"$ref": "#/components/schemas/Account"}
                    }
                },
                "Account": {
                    "type": "object",
                    "properties": {"id": {"type": "integer"}}
                },
                "Currency": {"type": "string", "enum": ["EUR", "USD"]}
            }
        }))
        .unwrap();
        let op = operation(json!({
            "operationId": "submitPayment",
            "parameters": [
                {"name": "currency", "in": "query", "schema": {"$ref": "#/components/schemas/Currency"}}
            ],
            "requestBody": {
                "content": {
                    "application/json": {"schema": {"$ref": "#/components/schemas/Payment"}}
                }
            },
            "responses": {"200": {"description": "OK"}}
        }));

        let (descriptor, _) = compiler()
            .with_components(Some(&components))
            .compile("post", "/payments", &[], &op)
            .unwrap();

        assert_eq!(descriptor.parameters.properties["currency"].type_name(), "string");
        assert_eq!(descriptor.parameters.required, vec!["amount".to_string()]);
        let ArgumentType::Object { properties, description, .. } =
            &descriptor.parameters.properties[REQUEST_BODY_ARGUMENT]
        else {
            panic!("requestBody should be an object");
        };
        assert_eq!(description.as_deref(), Some("A payment"));
        assert_eq!(properties["payer"].type_name(), "object");

        let error = compiler().compile("post", "/payments", &[], &op).unwrap_err();
        assert!(matches!(error, ImportError::SpecParse { .. }));
    }

    #[test]
    fn test_missing_operation_id() {
        let op = operation(json!({"responses": {"200": {"description": "OK"}}}));

        let error = compiler().compile("get", "/users", &[], &op).unwrap_err();
        assert!(matches!(error, ImportError::MissingOperationId { .. }));
        assert!(error.to_string().contains("/users"));
    }

    #[test]
    fn test_put_and_patch_are_unsupported() {
        let op = operation(json!({
            "operationId": "updateUser",
            "responses": {"200": {"description": "OK"}}
        }));

        for method in ["put", "patch"] {
            let error = compiler().compile(method, "/users", &[], &op).unwrap_err();
            assert!(matches!(error, ImportError::UnsupportedOperation { .. }));
        }
    }
}
