//! Schema Translator - OpenAPI schema node to tool argument type

use crate::tools::ArgumentType;
use indexmap::IndexMap;
use openapiv3::{Components, ReferenceOr, Schema, SchemaKind, Type};

/// Schema references followed below one parameter or request body
pub const MAX_REFERENCE_DEPTH: usize = 3;

const SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Resolves `#/components/schemas/{name}` references of one document
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaScope<'a> {
    components: Option<&'a Components>,
}

impl<'a> SchemaScope<'a> {
    pub fn new(components: Option<&'a Components>) -> Self {
        Self { components }
    }

    /// Look up a component schema, following aliases (`A: {$ref: B}`)
    pub fn lookup(&self, reference: &str) -> Result<&'a Schema, String> {
        let mut current = reference;
        let mut seen: Vec<&str> = Vec::new();

        loop {
            if seen.contains(&current) {
                return Err(format!("schema reference '{}' aliases itself", reference));
            }
            seen.push(current);

            let name = current
                .strip_prefix(SCHEMA_PREFIX)
                .map(|name| name.replace("~1", "/").replace("~0", "~"))
                .ok_or_else(|| format!("unsupported schema reference '{}'", current))?;
            let target = self
                .components
                .and_then(|components| components.schemas.get(&name))
                .ok_or_else(|| format!("unresolvable reference '{}'", current))?;

            match target {
                ReferenceOr::Item(schema) => return Ok(schema),
                ReferenceOr::Reference { reference } => current = reference,
            }
        }
    }

    /// The schema behind a node, looking references up
    pub fn resolve<'s>(&self, node: &'s ReferenceOr<Schema>) -> Result<&'s Schema, String>
    where
        'a: 's,
    {
        match node {
            ReferenceOr::Item(schema) => Ok(schema),
            ReferenceOr::Reference { reference } => self.lookup(reference),
        }
    }
}

/// Translate one schema node, attaching `description` verbatim
///
/// Returns `Ok(None)` for `null`-typed, untyped and composed (`oneOf`,
/// `allOf`, ...) nodes: the caller drops the property instead of emitting a
/// placeholder. Array item schemas are never inspected. Object properties
/// are translated recursively, each with its own description. A property
/// whose reference is already being expanded, or lies more than
/// [`MAX_REFERENCE_DEPTH`] references deep, is dropped the same way.
///
/// Fails only on a structurally malformed node, i.e. a reference that
/// cannot be resolved.
pub fn translate(
    schema: &Schema,
    description: Option<&str>,
    scope: &SchemaScope<'_>,
) -> Result<Option<ArgumentType>, String> {
    Translation {
        scope,
        expanding: Vec::new(),
    }
    .translate(schema, description)
}

struct Translation<'s, 'a> {
    scope: &'s SchemaScope<'a>,
    expanding: Vec<String>,
}

impl Translation<'_, '_> {
    fn translate(
        &mut self,
        schema: &Schema,
        description: Option<&str>,
    ) -> Result<Option<ArgumentType>, String> {
        let description = description.map(str::to_string);

        let translated = match &schema.schema_kind {
            SchemaKind::Type(Type::String(_)) => Some(ArgumentType::String { description }),
            SchemaKind::Type(Type::Integer(_)) => Some(ArgumentType::Integer { description }),
            SchemaKind::Type(Type::Number(_)) => Some(ArgumentType::Number { description }),
            SchemaKind::Type(Type::Boolean(_)) => Some(ArgumentType::Boolean { description }),
            SchemaKind::Type(Type::Array(_)) => Some(ArgumentType::Array { description }),
            SchemaKind::Type(Type::Object(object)) => Some(ArgumentType::Object {
                description,
                properties: self.properties(&object.properties)?,
                required: object.required.clone(),
            }),
            // A `type` keyword next to keywords of another type lands here
            SchemaKind::Any(any) => match any.typ.as_deref() {
                Some("string") => Some(ArgumentType::String { description }),
                Some("integer") => Some(ArgumentType::Integer { description }),
                Some("number") => Some(ArgumentType::Number { description }),
                Some("boolean") => Some(ArgumentType::Boolean { description }),
                Some("array") => Some(ArgumentType::Array { description }),
                Some("object") => Some(ArgumentType::Object {
                    description,
                    properties: self.properties(&any.properties)?,
                    required: any.required.clone(),
                }),
                _ => None,
            },
            SchemaKind::OneOf { .. }
            | SchemaKind::AllOf { .. }
            | SchemaKind::AnyOf { .. }
            | SchemaKind::Not { .. } => None,
        };

        Ok(translated)
    }

    fn properties(
        &mut self,
        properties: &IndexMap<String, ReferenceOr<Box<Schema>>>,
    ) -> Result<IndexMap<String, ArgumentType>, String> {
        let mut translated = IndexMap::new();
        for (name, property) in properties {
            let arg = match property {
                ReferenceOr::Item(schema) => {
                    self.translate(schema, schema.schema_data.description.as_deref())?
                }
                ReferenceOr::Reference { reference } => self.follow(reference)?,
            };
            if let Some(arg) = arg {
                translated.insert(name.clone(), arg);
            }
        }
        Ok(translated)
    }

    fn follow(&mut self, reference: &str) -> Result<Option<ArgumentType>, String> {
        if self.expanding.iter().any(|seen| seen == reference) {
            tracing::debug!("Cyclic reference {} dropped", reference);
            return Ok(None);
        }
        if self.expanding.len() >= MAX_REFERENCE_DEPTH {
            tracing::debug!("Reference {} nested too deep, dropped", reference);
            return Ok(None);
        }

        let schema = self.scope.lookup(reference)?;
        self.expanding.push(reference.to_string());
        let translated = self.translate(schema, schema.schema_data.description.as_deref());
        self.expanding.pop();
        translated
    }
}
