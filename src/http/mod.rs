//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (acquired by net::listener)
//!     → server.rs (route table, middleware, graceful serve)
//!     → dispatch.rs (gate check, panic isolation, commit, access log)
//!     → portal handlers (build a ResponseBuffer)
//!     → response.rs (single-commit buffer → wire response)
//! ```

pub mod dispatch;
pub mod error;
pub mod response;
pub mod server;

pub use dispatch::{dispatch, VERSION_HEADER};
pub use error::PortalError;
pub use response::ResponseBuffer;
pub use server::PortalServer;

/// What every portal handler returns: the completed buffer, or an error
/// the dispatcher translates to a wire response.
pub type HandlerResult = Result<ResponseBuffer, PortalError>;
