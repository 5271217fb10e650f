//! Network transport for trellis shells.
//!
//! [`SessionServer`] serves each TCP client its own line-editor session over a
//! shared command tree.

pub mod listener;

/// TCP server running one session per client.
pub use listener::{SessionServer, run_session};
