use crate::agent::AgentMetadata;
use crate::openapi::{ApiSource, ImportOptions};
use crate::tools::registry::DuplicatePolicy;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub http: HttpConfig,
    pub import: ImportConfig,
    pub logging: LoggingConfig,
    pub agent: AgentMetadata,
    #[serde(default)]
    pub apis: Vec<ApiConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Sent with every tool call
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub duplicate_policy: DuplicatePolicy,
    pub body_examples: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// One API description to import at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub namespace: String,
    /// File path or http(s) URL
    pub spec: String,
    pub server_url: Option<String>,
}

impl Settings {
    /// Load `config/{CONFIG_ENV}` (optional) and `APP__*` environment overrides
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        Self::builder()?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Load an explicit configuration file, still honouring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("http.connect_timeout_secs", 15)?
            .set_default("http.read_timeout_secs", 60)?
            .set_default("import.duplicate_policy", "fail")?
            .set_default("import.body_examples", false)?
            .set_default("logging.level", "info")?
            .set_default("agent.name", "apibridge")?
            .set_default("agent.description", "")?
            .set_default("agent.intents", Vec::<String>::new())
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            headers: self
                .http
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.http.read_timeout_secs),
            duplicate_policy: self.import.duplicate_policy,
            body_examples: self.import.body_examples,
            transport: None,
        }
    }

    pub fn sources(&self) -> Vec<ApiSource> {
        self.apis
            .iter()
            .map(|api| ApiSource {
                namespace: api.namespace.clone(),
                location: api.spec.as_str().into(),
                server_url: api.server_url.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::SpecLocation;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_settings_from_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[http]
read_timeout_secs = 5

[http.headers]
Authorization = "Bearer token"

[import]
duplicate_policy = "overwrite"

[agent]
name = "payment_agent"
intents = ["pay an invoice"]

[[apis]]
namespace = "payments"
spec = "specs/payments.yaml"
server_url = "http://localhost:8080"

[[apis]]
namespace = "users"
spec = "https://example.com/users.json"
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();

        let options = settings.import_options();
        assert_eq!(options.connect_timeout, Duration::from_secs(15));
        assert_eq!(options.read_timeout, Duration::from_secs(5));
        assert_eq!(options.duplicate_policy, DuplicatePolicy::Overwrite);
        assert!(!options.body_examples);
        assert_eq!(options.headers.len(), 1);
        assert!(options.headers[0].0.eq_ignore_ascii_case("authorization"));
        assert_eq!(options.headers[0].1, "Bearer token");

        assert_eq!(settings.agent.name, "payment_agent");
        assert_eq!(settings.logging.level, "info");

        let sources = settings.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].server_url.as_deref(), Some("http://localhost:8080"));
        assert!(matches!(sources[0].location, SpecLocation::File(_)));
        assert!(matches!(sources[1].location, SpecLocation::Url(_)));
    }
}
