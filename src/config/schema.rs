//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the optional
//! TOML config file; every section has defaults.

use serde::{Deserialize, Serialize};

/// The internal-operations path prefix shipped with the event tooling.
/// Operators override it per deployment via config.
pub const DEFAULT_INTERNAL_PREFIX: &str = "mBGWHqBVEjUSKpBF";

/// Root configuration for the portal.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PortalConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Contest window bounds.
    pub contest: ContestConfig,

    /// Internal-operations routing.
    pub internal: InternalConfig,

    /// Static asset serving.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Pre-provisioned teams.
    pub teams: Vec<TeamConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address used when no listener is inherited from a supervisor.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3333".to_string(),
        }
    }
}

/// Contest window bounds, in whole hours of the event timezone.
///
/// A missing bound disables that side of the gate.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ContestConfig {
    /// Hour the contest starts at (0..=23).
    pub starts_at_hour: Option<u32>,

    /// Hour the contest ends at (0..=23).
    pub ends_at_hour: Option<u32>,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            starts_at_hour: Some(10),
            ends_at_hour: Some(18),
        }
    }
}

/// Internal-operations routing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InternalConfig {
    /// Secret path segment granting bypass of the contest gate.
    /// Must be a single segment (no '/').
    pub path_prefix: String,
}

impl Default for InternalConfig {
    fn default() -> Self {
        Self {
            path_prefix: DEFAULT_INTERNAL_PREFIX.to_string(),
        }
    }
}

/// Static asset serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory served under `/static/`.
    pub dir: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            dir: "static".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level for the portal's own targets (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// A pre-provisioned team.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TeamConfig {
    /// Unique team identifier.
    pub id: u64,

    /// Display name.
    pub name: String,

    /// Login password (plain; real credential handling is out of scope).
    pub password: String,

    /// Address of the team's contest instance.
    #[serde(default)]
    pub instance_addr: String,
}
