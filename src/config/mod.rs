//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags (--listen, --starts-at, --ends-at)
//!     ↘
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PortalConfig (validated, immutable)
//!     → shared via Arc<PortalState> to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reload
//! - All fields have defaults so a bare `contest-portal` invocation works
//! - CLI flags override file values, mirroring the original flag surface
//! - Validation separates syntactic (serde) from semantic checks and
//!   returns every error, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ContestConfig, ListenerConfig, PortalConfig, TeamConfig};
pub use validation::{misconfiguration_warnings, validate_config, ValidationError};
