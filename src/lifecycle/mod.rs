//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM / Ctrl-C → Shutdown::trigger (first one wins)
//!
//! Shutdown (shutdown.rs):
//!     broadcast → server stops accepting → in-flight requests drain → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
