//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::PortalConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PortalConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: PortalConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DEFAULT_INTERNAL_PREFIX;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: PortalConfig = toml::from_str("").unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:3333");
        assert_eq!(config.contest.starts_at_hour, Some(10));
        assert_eq!(config.contest.ends_at_hour, Some(18));
        assert_eq!(config.internal.path_prefix, DEFAULT_INTERNAL_PREFIX);
    }

    #[test]
    fn teams_and_bounds_parse() {
        let config: PortalConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "0.0.0.0:8080"

            [contest]
            starts_at_hour = 9

            [[teams]]
            id = 1
            name = "alpacas"
            password = "grass"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.contest.starts_at_hour, Some(9));
        // Absent keys in an explicit [contest] table still default.
        assert_eq!(config.contest.ends_at_hour, Some(18));
        assert_eq!(config.teams.len(), 1);
        assert_eq!(config.teams[0].name, "alpacas");
        assert_eq!(config.teams[0].instance_addr, "");
    }
}
