//! Relay configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [publisher]
//! interval_secs = 10
//! topic = "employee-events"
//! failure_policy = "continue"
//! batch_size = 100
//!
//! [storage]
//! database_path = "outbox.db"
//!
//! [http]
//! bind = "127.0.0.1:8080"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bus::MessageBus;
use crate::publisher::{FailurePolicy, OutboxPublisher, DEFAULT_TOPIC};

/// Environment variable the host binary reads the config path from.
pub const CONFIG_PATH_ENV: &str = "OUTBOX_RELAY_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    pub publisher: PublisherSettings,
    pub storage: StorageSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    /// Delay between the end of one cycle and the start of the next.
    pub interval_secs: u64,
    pub topic: String,
    pub failure_policy: FailurePolicy,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database file. Absent means the in-memory store.
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub bind: String,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            topic: DEFAULT_TOPIC.to_string(),
            failure_policy: FailurePolicy::default(),
            batch_size: None,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl OutboxConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: OutboxConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from the file named by `OUTBOX_RELAY_CONFIG`, or fall back to
    /// defaults when the variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publisher.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "publisher.interval_secs must be greater than 0".into(),
            ));
        }
        if self.publisher.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("publisher.topic must not be empty".into()));
        }
        if self.publisher.batch_size == Some(0) {
            return Err(ConfigError::Invalid(
                "publisher.batch_size must be greater than 0".into(),
            ));
        }
        if self.http.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("http.bind must not be empty".into()));
        }
        Ok(())
    }
}

impl PublisherSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Build a publisher with these settings applied.
    pub fn publisher<S, B: MessageBus>(&self, store: S, bus: B) -> OutboxPublisher<S, B> {
        let publisher = OutboxPublisher::new(store, bus)
            .with_topic(self.topic.clone())
            .with_failure_policy(self.failure_policy);
        match self.batch_size {
            Some(size) => publisher.with_batch_size(size),
            None => publisher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;
    use crate::repository::InMemoryStore;

    #[test]
    fn empty_document_uses_defaults() {
        let config = OutboxConfig::from_toml_str("").unwrap();
        assert_eq!(config, OutboxConfig::default());
        assert_eq!(config.publisher.interval(), Duration::from_secs(10));
        assert_eq!(config.publisher.topic, "employee-events");
        assert_eq!(config.publisher.failure_policy, FailurePolicy::Continue);
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.http.bind, "127.0.0.1:8080");
    }

    #[test]
    fn full_document() {
        let config = OutboxConfig::from_toml_str(
            r#"
            [publisher]
            interval_secs = 2
            topic = "hr"
            failure_policy = "halt_cycle"
            batch_size = 50

            [storage]
            database_path = "/var/lib/relay/outbox.db"

            [http]
            bind = "0.0.0.0:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.publisher.interval_secs, 2);
        assert_eq!(config.publisher.failure_policy, FailurePolicy::HaltCycle);
        assert_eq!(config.publisher.batch_size, Some(50));
        assert_eq!(
            config.storage.database_path.as_deref(),
            Some(Path::new("/var/lib/relay/outbox.db"))
        );
        assert_eq!(config.http.bind, "0.0.0.0:9000");

        let publisher = config
            .publisher
            .publisher(InMemoryStore::new(), InMemoryBus::new());
        assert_eq!(publisher.topic(), "hr");
    }

    #[test]
    fn rejects_invalid_values() {
        for doc in [
            "[publisher]\ninterval_secs = 0",
            "[publisher]\ntopic = \"  \"",
            "[publisher]\nbatch_size = 0",
        ] {
            let err = OutboxConfig::from_toml_str(doc).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{doc}: {err}");
        }
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = OutboxConfig::from_toml_str("[publisher]\nfailure_policy = \"retry\"")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = OutboxConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
