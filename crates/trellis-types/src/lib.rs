//! Foundation types for trellis.
//!
//! Shared by every trellis crate: the error type, shell configuration, and
//! the byte-level key decoding tables used by the line editor.

pub mod config;
pub mod error;
pub mod input;
