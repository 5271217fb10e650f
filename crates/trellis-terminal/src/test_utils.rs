//! Shared test utilities for trellis-terminal tests.
//!
//! Provides a [`ScriptedStream`] that replays queued input bytes and records
//! everything written, plus a small command tree used across modules.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;

use trellis_types::error::{Result, TrellisError};

use crate::builtins::register_builtins;
use crate::sink::Sink;
use crate::tree::{Arity, Command, CommandTree, Environment};

/// An in-memory duplex stream with scripted input.
pub struct ScriptedStream {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Queue more input bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Number of input bytes not yet read.
    pub fn pending(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far, lossily decoded.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Forget captured output.
    pub fn clear_output(&mut self) {
        self.output.clear();
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                },
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes three lines to stdout.
pub struct ShowCmd;
impl Command for ShowCmd {
    fn name(&self) -> &str {
        "show"
    }
    fn doc(&self) -> &str {
        "syntax: show\nPrint three lines."
    }
    fn execute(&self, sink: &mut Sink, _: &[&str], _: &mut Environment<'_>) -> Result<()> {
        sink.write("a\r\nb\r\nc\r\n");
        Ok(())
    }
}

/// Requires exactly two arguments and echoes them.
pub struct PairCmd;
impl Command for PairCmd {
    fn name(&self) -> &str {
        "pair"
    }
    fn arity(&self) -> Arity {
        Arity::new(&["left", "right"], &[])
    }
    fn doc(&self) -> &str {
        "Join two words."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _: &mut Environment<'_>) -> Result<()> {
        sink.write(format!("{}+{}\n", args[0], args[1]));
        Ok(())
    }
}

/// Fails with a handler error.
pub struct FailCmd;
impl Command for FailCmd {
    fn name(&self) -> &str {
        "fail"
    }
    fn execute(&self, sink: &mut Sink, _: &[&str], _: &mut Environment<'_>) -> Result<()> {
        sink.write("partial\n");
        Err(TrellisError::Command("disk on fire".to_string()))
    }
}

/// Panics inside the handler.
pub struct PanicCmd;
impl Command for PanicCmd {
    fn name(&self) -> &str {
        "boom"
    }
    fn execute(&self, _: &mut Sink, _: &[&str], _: &mut Environment<'_>) -> Result<()> {
        panic!("kaboom");
    }
}

/// Writes to both channels, interleaved.
pub struct MixedCmd;
impl Command for MixedCmd {
    fn name(&self) -> &str {
        "mixed"
    }
    fn execute(&self, sink: &mut Sink, _: &[&str], _: &mut Environment<'_>) -> Result<()> {
        sink.write("a");
        sink.error("x");
        sink.write("b");
        Ok(())
    }
}

/// Tree used by tests:
///
/// ```text
/// (root)  help history exit quit traceback show mixed
/// ├── net       pair fail boom
/// │   └── iface show
/// └── system
/// ```
pub fn sample_tree() -> Arc<CommandTree> {
    let mut tree = CommandTree::new();
    register_builtins(&mut tree);
    let root = tree.root();
    tree.register(root, Box::new(ShowCmd));
    tree.register(root, Box::new(MixedCmd));
    let net = tree.add_section(root, "net", "Network diagnostics");
    tree.register(net, Box::new(PairCmd));
    tree.register(net, Box::new(FailCmd));
    tree.register(net, Box::new(PanicCmd));
    let iface = tree.add_section(net, "iface", "Interface state");
    tree.register(iface, Box::new(ShowCmd));
    tree.add_section(root, "system", "System settings");
    Arc::new(tree)
}
