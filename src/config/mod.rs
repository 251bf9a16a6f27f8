//! Configuration loading and management

use crate::core::client::TableSpec;
use crate::core::error::ConfigError;
use crate::core::item::KeySchema;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Environment variable holding the application namespace
pub const NAMESPACE_VAR: &str = "NOTEGATE_NAMESPACE";

/// Environment variable holding the deployment environment
pub const ENVIRONMENT_VAR: &str = "NOTEGATE_ENV";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "test")]
    Testing,
    #[serde(alias = "stage")]
    Staging,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Testing => "testing",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testing" | "test" => Ok(Environment::Testing),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: other.to_string(),
                message: "expected testing, staging or production".to_string(),
            }),
        }
    }
}

/// Store configuration shared by every resource store of an application
///
/// Built once and passed to each `ResourceStore` at construction; nothing
/// reads it from ambient state afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Application namespace (e.g. "myapp")
    pub namespace: String,

    /// Deployment environment
    pub environment: Environment,
}

fn namespace_regex() -> &'static Regex {
    static NAMESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
    NAMESPACE_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,62}$").unwrap())
}

fn table_regex() -> &'static Regex {
    static TABLE_REGEX: OnceLock<Regex> = OnceLock::new();
    TABLE_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{3,255}$").unwrap())
}

impl StoreConfig {
    /// Create a validated configuration
    pub fn new(namespace: impl Into<String>, environment: Environment) -> Result<Self, ConfigError> {
        let config = Self {
            namespace: namespace.into(),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `NOTEGATE_NAMESPACE` and `NOTEGATE_ENV`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let namespace = lookup(NAMESPACE_VAR).ok_or_else(|| ConfigError::MissingVariable {
            name: NAMESPACE_VAR.to_string(),
        })?;
        let environment = match lookup(ENVIRONMENT_VAR) {
            Some(value) => value.parse()?,
            None => Environment::Testing,
        };
        Self::new(namespace, environment)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !namespace_regex().is_match(&self.namespace) {
            return Err(ConfigError::InvalidValue {
                field: "namespace".to_string(),
                value: self.namespace.clone(),
                message: "lowercase letters, digits and '-', 2 to 63 characters".to_string(),
            });
        }
        Ok(())
    }

    /// Physical name of a logical table in this environment
    ///
    /// `{namespace}-{environment}-{table}`, so the same logical table never
    /// resolves to the same physical table in two environments.
    pub fn physical_table_name(&self, logical: &str) -> Result<String, ConfigError> {
        let physical = format!("{}-{}-{}", self.namespace, self.environment, logical);
        if logical.is_empty() || !table_regex().is_match(&physical) {
            return Err(ConfigError::InvalidValue {
                field: "table".to_string(),
                value: logical.to_string(),
                message: "table names use letters, digits, '_', '.' and '-'".to_string(),
            });
        }
        Ok(physical)
    }

    /// Resolve a logical table into its physical `TableSpec`
    pub fn resolve_table(&self, logical: &str, schema: KeySchema) -> Result<TableSpec, ConfigError> {
        Ok(TableSpec {
            logical_name: logical.to_string(),
            physical_name: self.physical_table_name(logical)?,
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_physical_names_differ_per_environment() {
        let staging = StoreConfig::new("myapp", Environment::Staging).unwrap();
        let production = StoreConfig::new("myapp", Environment::Production).unwrap();

        assert_eq!(
            staging.physical_table_name("notes").unwrap(),
            "myapp-staging-notes"
        );
        assert_eq!(
            production.physical_table_name("notes").unwrap(),
            "myapp-production-notes"
        );
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let config = StoreConfig::new("myapp", Environment::Testing).unwrap();
        assert!(config.physical_table_name("").is_err());
        assert!(config.physical_table_name("no tes").is_err());
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        assert!(StoreConfig::new("My App", Environment::Testing).is_err());
        assert!(StoreConfig::new("-app", Environment::Testing).is_err());
        assert!(StoreConfig::new("a", Environment::Testing).is_err());
    }

    #[test]
    fn test_environment_aliases() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Stage".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Testing);
        assert!("dev".parse::<Environment>().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = StoreConfig::new("myapp", Environment::Staging).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("environment: staging"));

        let parsed = StoreConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_yaml_validation_applies() {
        let err = StoreConfig::from_yaml_str("namespace: BAD\nenvironment: testing\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(NAMESPACE_VAR, "myapp"), (ENVIRONMENT_VAR, "production")]);
        let config = StoreConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.environment, Environment::Production);

        let missing = StoreConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(missing, ConfigError::MissingVariable { .. }));
    }

    #[test]
    fn test_from_lookup_defaults_to_testing() {
        let config = StoreConfig::from_lookup(|k| {
            (k == NAMESPACE_VAR).then(|| "myapp".to_string())
        })
        .unwrap();
        assert_eq!(config.environment, Environment::Testing);
    }
}
