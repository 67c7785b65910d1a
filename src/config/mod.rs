mod settings;

pub use settings::{ApiConfig, HttpConfig, ImportConfig, LoggingConfig, Settings};
