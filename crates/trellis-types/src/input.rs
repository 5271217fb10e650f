//! Terminal input decoding.
//!
//! Raw bytes arrive one at a time from the transport. Single control bytes
//! are classified by [`Control::from_byte`]; multi-byte escape sequences are
//! accumulated while [`is_escape_prefix`] holds and then mapped to a logical
//! [`Key`] by [`decode_escape`]. Complete sequences missing from the table
//! decode to `None`.

/// ASCII escape.
pub const ESC: u8 = 0x1b;

/// Audible bell.
pub const BEL: u8 = 0x07;

/// A logical key produced by an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// Function key F1..=F12.
    F(u8),
    Escape,
}

/// Known escape sequences.
const ESCAPE_SEQUENCES: &[(&[u8], Key)] = &[
    (b"\x1b[A", Key::Up),
    (b"\x1b[B", Key::Down),
    (b"\x1b[C", Key::Right),
    (b"\x1b[D", Key::Left),
    (b"\x1b[H", Key::Home),
    (b"\x1b[F", Key::End),
    (b"\x1bOH", Key::Home),
    (b"\x1bOF", Key::End),
    (b"\x1b[1~", Key::Home),
    (b"\x1b[4~", Key::End),
    (b"\x1b[2~", Key::Insert),
    (b"\x1b[3~", Key::Delete),
    (b"\x1b[5~", Key::PageUp),
    (b"\x1b[6~", Key::PageDown),
    (b"\x1bOP", Key::F(1)),
    (b"\x1bOQ", Key::F(2)),
    (b"\x1bOR", Key::F(3)),
    (b"\x1bOS", Key::F(4)),
    (b"\x1b[15~", Key::F(5)),
    (b"\x1b[17~", Key::F(6)),
    (b"\x1b[18~", Key::F(7)),
    (b"\x1b[19~", Key::F(8)),
    (b"\x1b[20~", Key::F(9)),
    (b"\x1b[21~", Key::F(10)),
    (b"\x1b[23~", Key::F(11)),
    (b"\x1b[24~", Key::F(12)),
    (b"\x1b\x1b", Key::Escape),
];

/// Longest escape sequence accumulated before it is given up as garbage.
pub const MAX_ESCAPE_LEN: usize = 16;

/// Whether more bytes are needed to complete an escape sequence.
///
/// After `ESC [` (CSI) or `ESC O` (SS3) bytes are read until a final byte in
/// `0x40..=0x7e`, which includes `~`. Parameters such as `;5` in modified
/// keys are swallowed along the way. Any other byte after `ESC` ends the
/// sequence at two bytes.
pub fn is_escape_prefix(seq: &[u8]) -> bool {
    match seq {
        [ESC] => true,
        [ESC, b'[' | b'O'] => true,
        [ESC, b'[' | b'O', .., last] => {
            seq.len() < MAX_ESCAPE_LEN && !(0x40..=0x7e).contains(last)
        },
        _ => false,
    }
}

/// Map a complete escape sequence to its logical key.
pub fn decode_escape(seq: &[u8]) -> Option<Key> {
    ESCAPE_SEQUENCES
        .iter()
        .find(|(known, _)| *known == seq)
        .map(|(_, key)| *key)
}

/// Classification of a single input byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// ^C or ^D.
    Interrupt,
    /// ^Z.
    Suspend,
    /// ^H or DEL.
    Backspace,
    /// ^I.
    Tab,
    /// Start of an escape sequence.
    Escape,
    /// ^R.
    ReverseSearch,
    /// ^S.
    ForwardSearch,
    /// ^W.
    EraseWord,
    /// ^L.
    ClearScreen,
    /// CR or LF.
    Enter,
    /// Printable ASCII in `0x20..0x7f`.
    Printable(char),
    /// Anything else.
    Other(u8),
}

impl Control {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x03 | 0x04 => Control::Interrupt,
            0x1a => Control::Suspend,
            0x08 | 0x7f => Control::Backspace,
            0x09 => Control::Tab,
            ESC => Control::Escape,
            0x12 => Control::ReverseSearch,
            0x13 => Control::ForwardSearch,
            0x17 => Control::EraseWord,
            0x0c => Control::ClearScreen,
            b'\r' | b'\n' => Control::Enter,
            b if (0x20..0x7f).contains(&b) => Control::Printable(b as char),
            other => Control::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_decode() {
        assert_eq!(decode_escape(b"\x1b[A"), Some(Key::Up));
        assert_eq!(decode_escape(b"\x1b[B"), Some(Key::Down));
        assert_eq!(decode_escape(b"\x1b[C"), Some(Key::Right));
        assert_eq!(decode_escape(b"\x1b[D"), Some(Key::Left));
    }

    #[test]
    fn function_keys_decode() {
        assert_eq!(decode_escape(b"\x1bOP"), Some(Key::F(1)));
        assert_eq!(decode_escape(b"\x1b[15~"), Some(Key::F(5)));
        assert_eq!(decode_escape(b"\x1b[24~"), Some(Key::F(12)));
    }

    #[test]
    fn unknown_sequence() {
        assert_eq!(decode_escape(b"\x1b[Z"), None);
        assert_eq!(decode_escape(b"\x1b"), None);
    }

    #[test]
    fn prefix_accumulation() {
        assert!(is_escape_prefix(b"\x1b"));
        assert!(is_escape_prefix(b"\x1b["));
        assert!(is_escape_prefix(b"\x1bO"));
        assert!(is_escape_prefix(b"\x1b[1"));
        assert!(is_escape_prefix(b"\x1b[15"));
        assert!(is_escape_prefix(b"\x1b[9"));
        assert!(!is_escape_prefix(b"\x1b[A"));
        assert!(!is_escape_prefix(b"\x1b[15~"));
        assert!(!is_escape_prefix(b"\x1b\x1b"));
        assert!(!is_escape_prefix(b"\x1bx"));
    }

    #[test]
    fn tilde_always_terminates() {
        assert!(!is_escape_prefix(b"\x1b[9~"));
    }

    #[test]
    fn modified_keys_read_to_final_byte() {
        assert!(is_escape_prefix(b"\x1b[1;"));
        assert!(is_escape_prefix(b"\x1b[1;5"));
        assert!(!is_escape_prefix(b"\x1b[1;5C"));
        assert_eq!(decode_escape(b"\x1b[1;5C"), None);
    }

    #[test]
    fn runaway_sequence_is_cut_off() {
        let mut seq = b"\x1b[".to_vec();
        while is_escape_prefix(&seq) {
            seq.push(b'1');
        }
        assert_eq!(seq.len(), MAX_ESCAPE_LEN);
    }

    #[test]
    fn control_classification() {
        assert_eq!(Control::from_byte(0x03), Control::Interrupt);
        assert_eq!(Control::from_byte(0x04), Control::Interrupt);
        assert_eq!(Control::from_byte(0x1a), Control::Suspend);
        assert_eq!(Control::from_byte(0x08), Control::Backspace);
        assert_eq!(Control::from_byte(0x7f), Control::Backspace);
        assert_eq!(Control::from_byte(b'\t'), Control::Tab);
        assert_eq!(Control::from_byte(b'\r'), Control::Enter);
        assert_eq!(Control::from_byte(b'\n'), Control::Enter);
        assert_eq!(Control::from_byte(0x12), Control::ReverseSearch);
        assert_eq!(Control::from_byte(0x13), Control::ForwardSearch);
        assert_eq!(Control::from_byte(0x17), Control::EraseWord);
        assert_eq!(Control::from_byte(0x0c), Control::ClearScreen);
        assert_eq!(Control::from_byte(b' '), Control::Printable(' '));
        assert_eq!(Control::from_byte(b'~'), Control::Printable('~'));
        assert_eq!(Control::from_byte(0x01), Control::Other(0x01));
        assert_eq!(Control::from_byte(0xff), Control::Other(0xff));
    }
}
