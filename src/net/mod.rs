//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor hand-off (SERVER_STARTER_PORT)  ──┐
//!                                              ├─→ listener.rs → one tokio TcpListener
//! Configured bind address (fallback)         ──┘
//!     → handed to http::PortalServer::run
//! ```

pub mod listener;

pub use listener::{acquire, ListenerError};
