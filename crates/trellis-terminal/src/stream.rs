//! The duplex byte channel a session runs over.

use std::io::{self, Read, Write};

/// A blocking, byte-at-a-time duplex channel (terminal, socket).
///
/// The engine never performs timed or non-blocking reads; a server that
/// multiplexes sessions must wait for readability before handing control to
/// the line editor.
pub trait ByteStream {
    /// Write all of `data`.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Block until exactly one byte is available and return it.
    ///
    /// End of stream is reported as [`io::ErrorKind::UnexpectedEof`].
    fn recv(&mut self) -> io::Result<u8>;

    /// Push buffered output to the peer.
    fn flush(&mut self) -> io::Result<()>;
}

impl<T: Read + Write> ByteStream for T {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)
    }

    fn recv(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self)
    }
}

/// Convert every line terminator to CRLF.
///
/// Both lone `\n` and existing `\r\n` come out as `\r\n`; a lone `\r` is
/// left alone so cursor returns still work.
pub fn normalize_newlines(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + 8);
    let mut prev = '\0';
    for ch in data.chars() {
        if ch == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(ch);
        prev = ch;
    }
    out
}
