//! Configuration loader with environment variable expansion

use super::{Config, ConfigError};
use lazy_static::lazy_static;
use regex_lite::Regex;
use std::path::Path;

lazy_static! {
    // ${VAR} or ${VAR:-default}
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap();
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR}` and `${VAR:-default}`.
    ///
    /// A variable that is unset and has no default keeps its placeholder.
    fn expand_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |cap: &regex_lite::Captures<'_>| {
                match (std::env::var(&cap[1]), cap.get(2)) {
                    (Ok(value), _) => value,
                    (Err(_), Some(default)) => default.as_str().to_string(),
                    (Err(_), None) => cap[0].to_string(),
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_expand_env_vars() {
        std::env::set_var("BLOCKBLOB_TEST_VAR", "test_value");
        let content = "key: ${BLOCKBLOB_TEST_VAR}";
        let expanded = ConfigLoader::expand_env_vars(content);
        assert_eq!(expanded, "key: test_value");
        std::env::remove_var("BLOCKBLOB_TEST_VAR");
    }

    #[test]
    #[serial_test::serial]
    fn test_expand_default_and_missing() {
        std::env::remove_var("BLOCKBLOB_UNSET_VAR");
        assert_eq!(
            ConfigLoader::expand_env_vars("a: ${BLOCKBLOB_UNSET_VAR:-7}"),
            "a: 7"
        );
        assert_eq!(
            ConfigLoader::expand_env_vars("a: ${BLOCKBLOB_UNSET_VAR}"),
            "a: ${BLOCKBLOB_UNSET_VAR}"
        );
    }

    #[test]
    fn test_from_yaml_validates() {
        let yaml = "upload:\n  block_size: 0\n";
        assert!(matches!(
            ConfigLoader::from_yaml(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
