//! Observability subsystem.
//!
//! Structured logging via `tracing`; dispatch counters live with the
//! portal state and are exposed at the internal debug vars endpoint.

pub mod logging;
