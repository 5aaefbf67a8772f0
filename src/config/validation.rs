//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window hours within a day)
//! - Check the internal prefix forms a single path segment
//! - Detect duplicate team ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: PortalConfig → Result<(), Vec<ValidationError>>
//! - Misconfiguration the portal tolerates but does not reinterpret (a
//!   window crossing midnight) is reported separately as warnings

use std::collections::HashSet;

use crate::config::schema::PortalConfig;
use crate::contest::ContestWindow;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("contest.{field} must be within 0..=23, got {value}")]
    HourOutOfRange { field: &'static str, value: u32 },

    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("internal.path_prefix must not be empty")]
    EmptyInternalPrefix,

    #[error("internal.path_prefix must be a single path segment (no '/')")]
    InternalPrefixNotASegment,

    #[error("duplicate team id {0}")]
    DuplicateTeamId(u64),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &PortalConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(hour) = config.contest.starts_at_hour {
        if hour > 23 {
            errors.push(ValidationError::HourOutOfRange {
                field: "starts_at_hour",
                value: hour,
            });
        }
    }
    if let Some(hour) = config.contest.ends_at_hour {
        if hour > 23 {
            errors.push(ValidationError::HourOutOfRange {
                field: "ends_at_hour",
                value: hour,
            });
        }
    }

    if config.listener.bind_address.is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }

    if config.internal.path_prefix.is_empty() {
        errors.push(ValidationError::EmptyInternalPrefix);
    } else if config.internal.path_prefix.contains('/') {
        errors.push(ValidationError::InternalPrefixNotASegment);
    }

    let mut seen = HashSet::new();
    for team in &config.teams {
        if !seen.insert(team.id) {
            errors.push(ValidationError::DuplicateTeamId(team.id));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Conditions the portal runs with but the operator should know about.
pub fn misconfiguration_warnings(config: &PortalConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let window = ContestWindow::new(config.contest.starts_at_hour, config.contest.ends_at_hour);
    if window.spans_midnight() {
        warnings.push(
            "contest window has starts_at_hour > ends_at_hour; bounds are evaluated \
             against the current calendar day and are NOT treated as spanning midnight"
                .to_string(),
        );
    }

    warnings
}
