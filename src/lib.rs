//! Contest portal: the request-serving core of an event-time-gated
//! administrative portal.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                 CONTEST PORTAL                    │
//!                     │                                                   │
//!   supervisor fd /   │  ┌─────────┐    ┌─────────┐    ┌──────────────┐  │
//!   bind address ─────┼─▶│   net   │───▶│  http   │───▶│   dispatch   │  │
//!                     │  │listener │    │ server  │    │   wrapper    │  │
//!                     │  └─────────┘    └─────────┘    └──────┬───────┘  │
//!                     │                                       │          │
//!                     │                     gate (contest) ◀──┤          │
//!                     │                                       ▼          │
//!                     │                               ┌──────────────┐   │
//!                     │                               │    portal    │   │
//!                     │                               │   handlers   │   │
//!                     │                               └──────┬───────┘   │
//!                     │                                      │           │
//!   one committed     │  ┌────────────────┐                  │           │
//!   response ◀────────┼──│ ResponseBuffer │◀─────────────────┘           │
//!                     │  └────────────────┘                              │
//!                     │                                                  │
//!                     │  ┌────────────────────────────────────────────┐  │
//!                     │  │            Cross-Cutting Concerns          │  │
//!                     │  │  ┌────────┐ ┌───────────┐ ┌─────────────┐  │  │
//!                     │  │  │ config │ │ lifecycle │ │observability│  │  │
//!                     │  │  └────────┘ └───────────┘ └─────────────┘  │  │
//!                     │  └────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────┘
//! ```
//!
//! Every request runs inside the dispatch wrapper: the contest gate is
//! consulted first, the handler writes into an in-memory buffer, and the
//! buffer is committed to the wire only after the handler returns without
//! faulting. A SIGTERM stops the accept loop and drains in-flight requests
//! before the process exits; on restart, the listener can be inherited
//! from a supervisor so there is no listen gap.

// Core subsystems
pub mod config;
pub mod contest;
pub mod http;
pub mod net;
pub mod portal;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::PortalConfig;
pub use contest::{Clock, ContestPhase, ContestWindow};
pub use http::{PortalServer, ResponseBuffer};
pub use lifecycle::Shutdown;
pub use portal::{PortalState, SharedState};
