//! Line editor and command tree for tree-structured administrative shells.
//!
//! A [`LineEditor`] consumes raw bytes from a [`ByteStream`], edits a single
//! input line, and on Enter runs the line as a pipeline: the first stage
//! resolves against a shared [`CommandTree`], later stages against the filter
//! section from [`filter_tree`]. Output is gathered in a [`Sink`] and written
//! back to the stream in the order it was produced.

mod builtins;
pub mod editor;
mod filter;
pub mod history;
pub mod lexer;
pub mod session;
pub mod sink;
pub mod stream;
pub mod tree;

#[cfg(test)]
mod test_utils;

/// Register help, history, exit and traceback on a tree's root.
pub use builtins::register_builtins;
/// Byte-at-a-time line editor driving one session.
pub use editor::{LineEditor, Mode};
/// The shared filter section used for pipeline stages after the first.
pub use filter::filter_tree;
/// Accepted-line history and its persistence hook.
pub use history::{History, HistoryStore};
/// Dual-channel output buffer for one accepted line.
pub use sink::Sink;
/// Duplex byte channel a session runs over.
pub use stream::ByteStream;
/// Command tree types.
pub use tree::{Arity, Command, CommandTree, Environment, Outcome, SectionId};
