//! Portal business layer: state and page handlers.
//!
//! These are the collaborators the dispatch core treats as opaque:
//! ordinary request handlers over an in-memory state, with no systems
//! weight of their own. They exist so the route table is real.

pub mod handlers;
pub mod internal;
pub mod state;

pub use state::{PortalState, SharedState};
