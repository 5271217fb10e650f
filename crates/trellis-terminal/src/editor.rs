//! Byte-at-a-time line editor and pipeline driver.
//!
//! [`LineEditor`] owns one session: the edit buffer, the cursor into the
//! shared command tree, the history log and the fault log. Each call to
//! [`LineEditor::consume_byte`] blocks for one byte, applies it, and repaints
//! the input line. Accepting a line tokenizes it, runs the first pipeline
//! stage against the command tree and every later stage against the filter
//! section, then writes the merged output back to the stream.

use std::sync::Arc;

use trellis_types::config::ShellConfig;
use trellis_types::error::Result;
use trellis_types::input::{self, BEL, Control, ESC, Key};

use crate::history::{History, HistoryStore};
use crate::lexer::{split_stages, tokenize};
use crate::session::SessionState;
use crate::sink::Sink;
use crate::stream::{ByteStream, normalize_newlines};
use crate::tree::{CommandTree, SectionId};

const REVERSE_SEARCH_PROMPT: &str = "(reverse-search): ";
const FORWARD_SEARCH_PROMPT: &str = "(forward-search): ";
const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

/// Editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    ReverseSearch,
    ForwardSearch,
}

/// Interactive line editor bound to one byte stream.
pub struct LineEditor<S: ByteStream> {
    stream: S,
    tree: Arc<CommandTree>,
    filter: Arc<CommandTree>,
    name: String,
    prompt_template: String,
    alt_prompt: Option<&'static str>,
    /// Edit buffer; holds the search filter while searching.
    buffer: Vec<char>,
    cursor: usize,
    mode: Mode,
    search_match: Option<String>,
    /// Width of prompt plus text at the last repaint.
    shown: usize,
    section: SectionId,
    session: SessionState,
    /// Output of the line being run; reset once its pipeline completes.
    sink: Sink,
    /// Whether up-arrow recall has started since the last reset.
    browsing: bool,
    last_byte: u8,
    store: Option<Box<dyn HistoryStore>>,
}

impl<S: ByteStream> LineEditor<S> {
    /// Start a session on `stream` and show the first prompt.
    pub fn new(
        stream: S,
        tree: Arc<CommandTree>,
        filter: Arc<CommandTree>,
        config: &ShellConfig,
    ) -> Result<Self> {
        let section = tree.root();
        let mut editor = Self {
            stream,
            tree,
            filter,
            name: config.name.clone(),
            prompt_template: config.prompt.clone(),
            alt_prompt: None,
            buffer: Vec::new(),
            cursor: 0,
            mode: Mode::Normal,
            search_match: None,
            shown: 0,
            section,
            session: SessionState::new(config.traceback_depth),
            sink: Sink::new(),
            browsing: false,
            last_byte: 0,
            store: None,
        };
        editor.fresh_redraw()?;
        Ok(editor)
    }

    /// Attach persistent history, loading previously stored lines.
    pub fn with_history_store(mut self, mut store: Box<dyn HistoryStore>) -> Self {
        match store.load() {
            Ok(lines) => {
                log::debug!("loaded {} history entries", lines.len());
                for line in lines {
                    self.session.history.append(line);
                }
            },
            Err(e) => log::warn!("failed to load history: {e}"),
        }
        self.store = Some(store);
        self
    }

    pub fn buffer(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn section(&self) -> SectionId {
        self.section
    }

    pub fn history(&self) -> &History {
        &self.session.history
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Process bytes until the session ends.
    pub fn run(&mut self) -> Result<()> {
        while self.session.is_running() {
            self.consume_byte()?;
        }
        Ok(())
    }

    /// Current prompt text.
    pub fn prompt(&self) -> String {
        if let Some(alt) = self.alt_prompt {
            return alt.to_string();
        }
        let path = self.tree.path(self.section).join("-");
        self.prompt_template
            .replace("%(name)s", &self.name)
            .replace("%(path)s", &path)
            .replace("%%", "%")
    }

    /// Block for one byte and apply it.
    pub fn consume_byte(&mut self) -> Result<()> {
        let byte = self.stream.recv()?;
        let previous = std::mem::replace(&mut self.last_byte, byte);
        // Terminals send CR LF or CR NUL for a single Enter.
        if previous == b'\r' && (byte == b'\n' || byte == 0) {
            return Ok(());
        }

        match Control::from_byte(byte) {
            Control::Interrupt => self.interrupt(),
            Control::Suspend => self.suspend(),
            Control::Backspace => self.backspace(),
            Control::Tab => self.tab_complete(),
            Control::Printable('?') if self.mode == Mode::Normal => self.show_help(),
            Control::Escape => self.escape_sequence(),
            Control::ReverseSearch => self.start_search(Mode::ReverseSearch),
            Control::ForwardSearch => self.start_search(Mode::ForwardSearch),
            Control::EraseWord => self.erase_word(),
            Control::Printable(ch) => self.printable(ch),
            Control::ClearScreen => {
                self.send(CLEAR_SCREEN)?;
                self.fresh_redraw()
            },
            Control::Enter => self.enter(),
            Control::Other(b) => {
                self.send(&format!("\r\nchr(0x{b:02x})\r\n"))?;
                self.fresh_redraw()
            },
        }
    }

    // -- output ----------------------------------------------------------

    fn send(&mut self, data: &str) -> Result<()> {
        self.stream.send(normalize_newlines(data).as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    fn beep(&mut self) -> Result<()> {
        self.stream.send(&[BEL])?;
        self.stream.flush()?;
        Ok(())
    }

    /// Text shown after the prompt and where the cursor sits within it.
    fn display(&self) -> (String, usize) {
        let filter: String = self.buffer.iter().collect();
        match &self.search_match {
            Some(found) if self.mode != Mode::Normal => {
                let at = found
                    .find(&filter)
                    .map(|i| found[..i].chars().count())
                    .unwrap_or(0);
                (found.clone(), at)
            },
            _ => (filter, self.cursor),
        }
    }

    /// Erase the old line and repaint prompt plus text.
    fn redraw(&mut self) -> Result<()> {
        let prompt = self.prompt();
        let (text, at) = self.display();
        let width = text.chars().count();

        let mut out = String::from("\r");
        if self.shown > 0 {
            out.push_str(&" ".repeat(self.shown));
            out.push('\r');
        }
        out.push_str(&prompt);
        out.push_str(&text);
        out.push_str(&"\x08".repeat(width.saturating_sub(at)));
        self.shown = prompt.chars().count() + width;
        self.send(&out)
    }

    /// Repaint on a line known to be empty.
    fn fresh_redraw(&mut self) -> Result<()> {
        self.shown = 0;
        self.redraw()
    }

    fn set_buffer(&mut self, text: &str) {
        self.buffer = text.chars().collect();
        self.cursor = self.buffer.len();
    }

    fn leave_search(&mut self) {
        if self.mode != Mode::Normal {
            if let Some(found) = self.search_match.take() {
                self.set_buffer(&found);
            }
            self.mode = Mode::Normal;
            self.alt_prompt = None;
        }
    }

    // -- control bytes ---------------------------------------------------

    fn pop_section(&mut self) {
        if let Some(parent) = self.tree.parent(self.section) {
            self.section = parent;
        }
    }

    fn interrupt(&mut self) -> Result<()> {
        if self.buffer.is_empty() && self.mode == Mode::Normal {
            return self.terminate();
        }
        self.leave_search();
        self.pop_section();
        self.set_buffer("");
        self.session.history.reset();
        self.browsing = false;
        self.beep()?;
        self.send("\r\n")?;
        self.fresh_redraw()
    }

    fn suspend(&mut self) -> Result<()> {
        if self.section == self.tree.root() {
            return self.terminate();
        }
        self.leave_search();
        self.pop_section();
        self.set_buffer("");
        self.send("\r\n")?;
        self.fresh_redraw()
    }

    /// Run the root exit hook, flush its output and end the session.
    fn terminate(&mut self) -> Result<()> {
        log::info!("session terminated from keyboard");
        self.send("\r\n")?;
        let mut root = self.tree.root();
        if self.tree.command(root, "exit").is_some() {
            self.tree
                .execute(&mut root, &mut self.sink, "exit", &mut self.session);
        }
        let out = self.sink.output();
        self.sink.reset();
        self.send(&out)?;
        self.session.request_exit();
        Ok(())
    }

    fn backspace(&mut self) -> Result<()> {
        if self.mode != Mode::Normal {
            self.buffer.pop();
            if self.buffer.is_empty() {
                self.search_match = None;
                self.cursor = 0;
                return self.redraw();
            }
            let filter: String = self.buffer.iter().collect();
            return self.search(&filter);
        }
        if self.cursor > 0 {
            self.cursor -= 1;
            self.buffer.remove(self.cursor);
        }
        self.redraw()
    }

    fn tab_complete(&mut self) -> Result<()> {
        self.leave_search();
        let line = self.buffer();
        let matches = self.tree.complete(self.section, &line, true);
        match matches.as_slice() {
            [] => self.beep(),
            [only] => {
                self.set_buffer(&format!("{only} "));
                self.redraw()
            },
            _ => {
                // Show only the word being completed.
                let typed = line.split_whitespace().count()
                    - usize::from(!line.is_empty() && !line.ends_with(char::is_whitespace));
                let mut tails: Vec<String> = matches
                    .iter()
                    .map(|m| m.split(' ').skip(typed).collect::<Vec<_>>().join(" "))
                    .collect();
                tails.sort();
                self.send(&format!("\r\n{}\r\n", tails.join(" ")))?;
                self.fresh_redraw()
            },
        }
    }

    fn show_help(&mut self) -> Result<()> {
        let line = self.buffer();
        let matches = self.tree.complete(self.section, &line, false);
        let pad = " ".repeat(self.prompt().chars().count());
        let mut out = String::from("\r\n");
        match matches.as_slice() {
            [] => return self.beep(),
            [only] => {
                let deeper = self.tree.complete(self.section, &format!("{only} "), false);
                if deeper.is_empty() {
                    let usage = self.tree.usage_for(self.section, only);
                    out.push_str(&format!("{pad}{usage}\r\n"));
                }
                for item in &deeper {
                    out.push_str(&format!("{pad}{item}\r\n"));
                }
            },
            many => {
                let width = many.iter().map(|m| m.chars().count()).max().unwrap_or(0);
                for item in many {
                    let usage = self.tree.usage_for(self.section, item);
                    out.push_str(&format!("{pad}{item:<width$} {usage}\r\n"));
                }
            },
        }
        self.send(&out)?;
        self.fresh_redraw()
    }

    fn escape_sequence(&mut self) -> Result<()> {
        let mut seq = vec![ESC];
        while input::is_escape_prefix(&seq) {
            seq.push(self.stream.recv()?);
        }
        self.last_byte = seq.last().copied().unwrap_or(ESC);
        match input::decode_escape(&seq) {
            Some(key) => self.special_key(key),
            None => {
                log::debug!("unknown escape sequence {seq:02x?}");
                Ok(())
            },
        }
    }

    fn special_key(&mut self, key: Key) -> Result<()> {
        if key == Key::Escape {
            self.mode = Mode::Normal;
            self.alt_prompt = None;
            self.search_match = None;
            self.set_buffer("");
            self.session.history.reset();
            self.browsing = false;
            return self.redraw();
        }

        self.leave_search();
        match key {
            Key::Up => {
                let entry = if self.browsing {
                    self.session.history.backward()
                } else {
                    self.session.history.current()
                };
                let Some(entry) = entry.map(str::to_string) else {
                    return Ok(());
                };
                self.browsing = true;
                self.set_buffer(&entry);
            },
            Key::Down => {
                if self.session.history.is_empty() {
                    return Ok(());
                }
                match self.session.history.forward().map(str::to_string) {
                    Some(entry) => self.set_buffer(&entry),
                    None => {
                        self.browsing = false;
                        self.set_buffer("");
                    },
                }
            },
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.buffer.len()),
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.buffer.len(),
            Key::Delete => {
                if self.cursor < self.buffer.len() {
                    self.buffer.remove(self.cursor);
                }
            },
            other => {
                log::debug!("ignoring key {other:?}");
                return Ok(());
            },
        }
        self.redraw()
    }

    fn start_search(&mut self, mode: Mode) -> Result<()> {
        self.mode = mode;
        self.alt_prompt = Some(match mode {
            Mode::ForwardSearch => FORWARD_SEARCH_PROMPT,
            _ => REVERSE_SEARCH_PROMPT,
        });
        self.search_match = None;
        self.set_buffer("");
        self.redraw()
    }

    /// Look `filter` up in history in the current search direction.
    ///
    /// On a hit the filter becomes the logical buffer and the matching entry
    /// is displayed; on a miss the previous state is kept.
    fn search(&mut self, filter: &str) -> Result<()> {
        let history = &self.session.history;
        let found = match self.mode {
            Mode::ForwardSearch => history.complete_forward(filter),
            _ => history.complete_backward(filter),
        }
        .map(str::to_string);

        match found {
            Some(entry) => {
                self.set_buffer(filter);
                self.search_match = Some(entry);
                self.redraw()
            },
            None => self.beep(),
        }
    }

    fn erase_word(&mut self) -> Result<()> {
        if self.mode != Mode::Normal || self.cursor == 0 {
            return self.redraw();
        }
        let head = &self.buffer[..self.cursor];
        let end = head
            .iter()
            .rposition(|c| !matches!(c, ' ' | '\t'))
            .map_or(0, |i| i + 1);
        let start = head[..end]
            .iter()
            .rposition(|c| matches!(c, ' ' | '\t'))
            .map_or(0, |i| i + 1);
        self.buffer.drain(start..self.cursor);
        self.cursor = start;
        self.redraw()
    }

    fn printable(&mut self, ch: char) -> Result<()> {
        if self.mode == Mode::Normal {
            self.buffer.insert(self.cursor, ch);
            self.cursor += 1;
            return self.redraw();
        }
        let mut filter = self.buffer();
        filter.push(ch);
        self.search(&filter)
    }

    fn enter(&mut self) -> Result<()> {
        if self.mode != Mode::Normal {
            if self.search_match.is_none() {
                let filter = self.buffer();
                self.search_match = Some(filter);
            }
            self.leave_search();
            self.send("\r\n")?;
            return self.fresh_redraw();
        }
        self.send("\r\n")?;
        let line = self.buffer();
        self.accept(&line)
    }

    // -- line acceptance -------------------------------------------------

    fn accept(&mut self, raw: &str) -> Result<()> {
        self.set_buffer("");
        self.browsing = false;
        let line = raw.trim();
        if line.is_empty() {
            self.session.history.reset();
            return self.fresh_redraw();
        }

        if let Some(event) = line.strip_prefix('!') {
            return match self.recall(event) {
                Some(recalled) => self.commit(&recalled),
                None => {
                    self.send("event not found\r\n")?;
                    self.fresh_redraw()
                },
            };
        }
        self.commit(line)
    }

    /// Resolve `!N` (absolute index) or `!prefix` against history.
    fn recall(&self, event: &str) -> Option<String> {
        let word = event.split_whitespace().next().unwrap_or("");
        let history = &self.session.history;
        let found = if !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()) {
            history.get(word.parse().ok()?)
        } else {
            history.find_prefix(word)
        };
        found.map(str::to_string)
    }

    /// Run a line as a pipeline and record it.
    fn commit(&mut self, line: &str) -> Result<()> {
        match tokenize(line) {
            Ok(tokens) => {
                for (i, stage) in split_stages(&tokens).iter().enumerate() {
                    let outcome = if i == 0 {
                        self.tree
                            .execute(&mut self.section, &mut self.sink, stage, &mut self.session)
                    } else {
                        let mut at = self.filter.root();
                        self.filter
                            .execute(&mut at, &mut self.sink, stage, &mut self.session)
                    };
                    if !outcome.is_continue() || !self.session.is_running() {
                        break;
                    }
                }
            },
            Err(e) => self.sink.error(format!("error: {e}\n")),
        }

        let mut out = self.sink.output();
        self.sink.reset();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        self.send(&out)?;

        self.session.history.append(line);
        if let Some(store) = self.store.as_mut()
            && let Err(e) = store.append(line)
        {
            log::warn!("failed to persist history: {e}");
        }

        if self.session.is_running() {
            self.fresh_redraw()?;
        }
        Ok(())
    }
}
