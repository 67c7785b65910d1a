//! Spec Importer
//!
//! Information Hiding:
//! - Document loading, server selection and per-operation compilation hidden
//! - HTTP client construction hidden behind `ImportOptions`
//! - Produces an immutable `ToolRegistry`; nothing is registered after import

use super::compiler::OperationCompiler;
use super::document::{ApiDocument, SpecLocation};
use crate::error::ImportError;
use crate::tools::executor::RequestExecutor;
use crate::tools::http::{
    HttpTransport, ReqwestTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
};
use crate::tools::registry::{DuplicatePolicy, OperationTool, ToolRegistry};
use openapiv3::{Operation, PathItem, ReferenceOr};
use std::sync::Arc;
use std::time::Duration;

/// Knobs for one import
///
/// Defaults: 15 s connect timeout, 60 s read timeout, no extra headers,
/// fail on duplicate names, no body examples, reqwest transport.
#[derive(Clone)]
pub struct ImportOptions {
    /// Headers attached to every request of the imported tools
    pub headers: Vec<(String, String)>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub duplicate_policy: DuplicatePolicy,
    /// Describe JSON request bodies with a rendered example payload
    pub body_examples: bool,
    /// Use this transport instead of building a reqwest client
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            duplicate_policy: DuplicatePolicy::default(),
            body_examples: false,
            transport: None,
        }
    }
}

impl std::fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportOptions")
            .field("headers", &self.headers)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("duplicate_policy", &self.duplicate_policy)
            .field("body_examples", &self.body_examples)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl ImportOptions {
    fn resolve_transport(&self) -> Result<Arc<dyn HttpTransport>, ImportError> {
        match &self.transport {
            Some(transport) => Ok(Arc::clone(transport)),
            None => Ok(Arc::new(ReqwestTransport::new(
                self.connect_timeout,
                self.read_timeout,
            )?)),
        }
    }
}

/// An API description to import under a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSource {
    pub namespace: String,
    pub location: SpecLocation,
    /// Overrides the document's first server URL
    pub server_url: Option<String>,
}

impl ApiSource {
    pub fn new(namespace: impl Into<String>, location: impl Into<SpecLocation>) -> Self {
        Self {
            namespace: namespace.into(),
            location: location.into(),
            server_url: None,
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = Some(server_url.into());
        self
    }

    pub async fn import(&self, options: &ImportOptions) -> Result<ToolRegistry, ImportError> {
        import_spec(
            &self.namespace,
            &self.location,
            self.server_url.as_deref(),
            options,
        )
        .await
    }
}

/// Load an API description and compile every operation into a registry
///
/// The import is all-or-nothing: any failure aborts it and no registry is
/// returned.
pub async fn import_spec(
    namespace: &str,
    location: &SpecLocation,
    server_url: Option<&str>,
    options: &ImportOptions,
) -> Result<ToolRegistry, ImportError> {
    let transport = options.resolve_transport()?;
    let document = ApiDocument::load(location, transport.as_ref()).await?;
    compile_registry(namespace, &document, server_url, transport, options)
}

/// Compile an already loaded document into a registry
///
/// Performs no I/O. When `options.transport` is `None` a reqwest client is
/// still constructed here for the tools to call through, which can fail
/// with `ImportError::HttpClient`; inject a transport for a build that
/// touches nothing outside the document.
pub fn build_registry(
    namespace: &str,
    document: &ApiDocument,
    server_url: Option<&str>,
    options: &ImportOptions,
) -> Result<ToolRegistry, ImportError> {
    let transport = options.resolve_transport()?;
    compile_registry(namespace, document, server_url, transport, options)
}

fn compile_registry(
    namespace: &str,
    document: &ApiDocument,
    server_url: Option<&str>,
    transport: Arc<dyn HttpTransport>,
    options: &ImportOptions,
) -> Result<ToolRegistry, ImportError> {
    let server_url = server_url
        .or_else(|| document.default_server_url())
        .ok_or(ImportError::MissingServerUrl)?;

    let compiler = OperationCompiler::new(document.source(), namespace, server_url)
        .with_body_examples(options.body_examples)
        .with_components(document.spec().components.as_ref());
    let executor = RequestExecutor::new(transport, options.headers.clone());
    let mut registry = ToolRegistry::new(namespace, server_url.trim_end_matches('/'));

    for (path, item) in &document.spec().paths.paths {
        let item = match item {
            ReferenceOr::Item(item) => item,
            ReferenceOr::Reference { reference } => {
                return Err(ImportError::parse(
                    document.source(),
                    format!("unresolved path item reference {}", reference),
                ))
            }
        };

        for (method, operation) in operations(item) {
            if matches!(method, "head" | "options" | "trace") {
                tracing::warn!(
                    "Skipping {} {}: method not exposed as a tool",
                    method.to_ascii_uppercase(),
                    path
                );
                continue;
            }

            let (descriptor, binding) =
                compiler.compile(method, path, &item.parameters, operation)?;
            registry.insert(
                OperationTool::new(descriptor, binding, executor.clone()),
                options.duplicate_policy,
            )?;
        }
    }

    tracing::info!(
        "Imported {} tools from {} into namespace '{}'",
        registry.len(),
        document.source(),
        namespace
    );
    Ok(registry)
}

/// Operations of a path item in document method order
fn operations(item: &PathItem) -> impl Iterator<Item = (&'static str, &Operation)> {
    [
        ("get", &item.get),
        ("put", &item.put),
        ("post", &item.post),
        ("delete", &item.delete),
        ("options", &item.options),
        ("head", &item.head),
        ("patch", &item.patch),
        ("trace", &item.trace),
    ]
    .into_iter()
    .filter_map(|(method, operation)| operation.as_ref().map(|op| (method, op)))
}
