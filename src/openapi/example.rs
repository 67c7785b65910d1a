//! Example payload rendering for request body schemas

use super::schema::{SchemaScope, MAX_REFERENCE_DEPTH};
use openapiv3::{ReferenceOr, Schema, SchemaKind, Type};
use serde_json::{json, Map, Value};

/// Build an example JSON value for a schema
///
/// Declared `example`s win. Otherwise strings use their first enum value or
/// `"string"`, integers `1`, numbers `1.0`, booleans `true`, arrays hold one
/// example item and objects recurse into their properties. Untyped nodes,
/// and references nested more than [`MAX_REFERENCE_DEPTH`] deep, render as
/// `null`.
pub fn render_example(schema: &Schema, scope: &SchemaScope<'_>) -> Value {
    render(schema, scope, 0)
}

fn render(schema: &Schema, scope: &SchemaScope<'_>, depth: usize) -> Value {
    if let Some(example) = &schema.schema_data.example {
        return example.clone();
    }

    match &schema.schema_kind {
        SchemaKind::Type(Type::String(string)) => string
            .enumeration
            .iter()
            .flatten()
            .next()
            .map(|first| json!(first))
            .unwrap_or_else(|| json!("string")),
        SchemaKind::Type(Type::Integer(_)) => json!(1),
        SchemaKind::Type(Type::Number(_)) => json!(1.0),
        SchemaKind::Type(Type::Boolean(_)) => json!(true),
        SchemaKind::Type(Type::Array(array)) => match &array.items {
            Some(items) => json!([render_node(items, scope, depth)]),
            None => json!([]),
        },
        SchemaKind::Type(Type::Object(object)) => Value::Object(
            object
                .properties
                .iter()
                .map(|(name, property)| (name.clone(), render_node(property, scope, depth)))
                .collect::<Map<_, _>>(),
        ),
        _ => Value::Null,
    }
}

fn render_node(node: &ReferenceOr<Box<Schema>>, scope: &SchemaScope<'_>, depth: usize) -> Value {
    match node {
        ReferenceOr::Item(schema) => render(schema, scope, depth),
        ReferenceOr::Reference { .. } if depth >= MAX_REFERENCE_DEPTH => Value::Null,
        ReferenceOr::Reference { reference } => match scope.lookup(reference) {
            Ok(schema) => render(schema, scope, depth + 1),
            Err(_) => Value::Null,
        },
    }
}

/// Description text advertising an example body to the reasoning loop
pub fn example_description(schema: &Schema, scope: &SchemaScope<'_>) -> String {
    let example = render_example(schema, scope);
    let rendered = serde_json::to_string_pretty(&example).unwrap_or_else(|_| example.to_string());
    format!("Example request body:\n{}", rendered)
}
