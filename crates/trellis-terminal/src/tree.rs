//! Command tree: sections, commands, and dispatch.
//!
//! The tree is built once at startup and then shared read-only between
//! sessions (usually behind an `Arc`). Sections live in an arena owned by
//! [`CommandTree`] and refer to their parent by [`SectionId`], so there are
//! no reference cycles. A session's position in the tree is just a
//! `SectionId` it keeps for itself.
//!
//! Resolution walks child sections while at least two tokens remain, then
//! tries the reached section's commands, then the root's commands. Root
//! commands are therefore reachable from any depth.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use trellis_types::error::Result;

use crate::session::SessionState;
use crate::sink::Sink;

/// Index of a section inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(usize);

/// Declared argument shape of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Names of mandatory positional arguments.
    pub required: &'static [&'static str],
    /// Names of optional positional arguments.
    pub optional: &'static [&'static str],
    /// Accept any number of extra arguments.
    pub variadic: bool,
}

impl Arity {
    /// No arguments at all.
    pub const NONE: Arity = Arity::new(&[], &[]);

    pub const fn new(
        required: &'static [&'static str],
        optional: &'static [&'static str],
    ) -> Self {
        Self {
            required,
            optional,
            variadic: false,
        }
    }

    pub const fn variadic(
        required: &'static [&'static str],
        optional: &'static [&'static str],
    ) -> Self {
        Self {
            required,
            optional,
            variadic: true,
        }
    }

    pub fn min(&self) -> usize {
        self.required.len()
    }

    /// Upper bound, ignoring `variadic`.
    pub fn max(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    /// Usage string derived from the argument names.
    pub fn syntax(&self, name: &str) -> String {
        let mut parts = vec![name.to_string()];
        parts.extend(self.required.iter().map(|arg| format!("<{arg}>")));
        parts.extend(self.optional.iter().map(|arg| format!("[<{arg}>]")));
        if self.variadic {
            parts.push("[...]".to_string());
        }
        parts.join(" ")
    }

    /// Check a provided argument count against the declaration.
    fn check(&self, provided: usize) -> std::result::Result<(), String> {
        if provided < self.min() {
            return Err(format!(
                "missing required arguments {}",
                self.required[provided..].join(", ")
            ));
        }
        if provided > self.max() && !self.variadic {
            return Err("too many arguments".to_string());
        }
        Ok(())
    }
}

/// A handler's documentation split into its parts.
///
/// A first line starting with `syntax:` supplies the usage string; the next
/// non-empty line is the summary and the rest is the extended description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Documentation<'a> {
    pub syntax: Option<&'a str>,
    pub summary: &'a str,
    pub description: Vec<&'a str>,
}

impl<'a> Documentation<'a> {
    pub fn parse(doc: &'a str) -> Self {
        let mut lines = doc.lines().map(str::trim).skip_while(|l| l.is_empty()).peekable();
        let syntax = lines
            .next_if(|l| l.starts_with("syntax:"))
            .map(|l| l["syntax:".len()..].trim());
        let mut lines = lines.skip_while(|l| l.is_empty());
        let summary = lines.next().unwrap_or("");
        let mut description: Vec<&str> = lines.skip_while(|l| l.is_empty()).collect();
        while description.last().is_some_and(|l| l.is_empty()) {
            description.pop();
        }
        Self {
            syntax,
            summary,
            description,
        }
    }
}

/// A single executable command.
pub trait Command: Send + Sync {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// Extra names resolving to the same handler.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    fn arity(&self) -> Arity {
        Arity::NONE
    }

    /// Free-form documentation, see [`Documentation`].
    fn doc(&self) -> &str {
        ""
    }

    /// One-line usage string.
    fn usage(&self) -> String {
        match Documentation::parse(self.doc()).syntax {
            Some(syntax) => syntax.to_string(),
            None => self.arity().syntax(self.name()),
        }
    }

    /// One-line summary for `help`.
    fn summary(&self) -> &str {
        Documentation::parse(self.doc()).summary
    }

    /// Run the command.
    ///
    /// Return [`TrellisError::Usage`](trellis_types::error::TrellisError::Usage)
    /// for bad user input; any other error is treated as a handler fault.
    fn execute(&self, sink: &mut Sink, args: &[&str], env: &mut Environment<'_>) -> Result<()>;
}

/// What a handler can see and change while it runs.
pub struct Environment<'a> {
    /// The tree the command was resolved in.
    pub tree: &'a CommandTree,
    /// The section resolution ended in (not necessarily the command's owner).
    pub section: SectionId,
    /// State private to the running session.
    pub session: &'a mut SessionState,
}

/// Result of executing one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The stage finished; later stages may run.
    Continue,
    /// Bad input; the diagnostic has been written to the sink.
    Abort(String),
    /// The handler failed; the detail has been recorded for `traceback`.
    Fault { diagnostic: String, detail: String },
}

impl Outcome {
    pub fn is_continue(&self) -> bool {
        matches!(self, Outcome::Continue)
    }
}

/// A successful command resolution.
pub struct Resolved<'t, 'a> {
    /// Deepest section reached while walking the tokens.
    pub section: SectionId,
    pub command: &'t Arc<dyn Command>,
    pub args: &'a [&'a str],
}

#[derive(Default)]
struct SectionNode {
    name: String,
    summary: String,
    parent: Option<SectionId>,
    children: BTreeMap<String, SectionId>,
    commands: BTreeMap<String, Arc<dyn Command>>,
}

/// Arena-owned tree of sections and commands.
pub struct CommandTree {
    sections: Vec<SectionNode>,
}

impl CommandTree {
    /// Create a tree holding only an empty root section.
    pub fn new() -> Self {
        Self {
            sections: vec![SectionNode::default()],
        }
    }

    pub fn root(&self) -> SectionId {
        SectionId(0)
    }

    fn node(&self, id: SectionId) -> &SectionNode {
        &self.sections[id.0]
    }

    /// Add a named child section, returning the existing one if the name is
    /// already taken.
    pub fn add_section(&mut self, parent: SectionId, name: &str, summary: &str) -> SectionId {
        if let Some(&existing) = self.node(parent).children.get(name) {
            return existing;
        }
        let id = SectionId(self.sections.len());
        self.sections.push(SectionNode {
            name: name.to_string(),
            summary: summary.to_string(),
            parent: Some(parent),
            ..Default::default()
        });
        self.sections[parent.0].children.insert(name.to_string(), id);
        id
    }

    /// Register a command (and its aliases) in a section. Replaces any
    /// existing command with the same name.
    pub fn register(&mut self, section: SectionId, command: Box<dyn Command>) {
        let command: Arc<dyn Command> = Arc::from(command);
        let node = &mut self.sections[section.0];
        for alias in command.aliases() {
            node.commands.insert(alias.to_string(), Arc::clone(&command));
        }
        node.commands.insert(command.name().to_string(), command);
    }

    pub fn name(&self, id: SectionId) -> &str {
        &self.node(id).name
    }

    pub fn summary(&self, id: SectionId) -> &str {
        &self.node(id).summary
    }

    pub fn parent(&self, id: SectionId) -> Option<SectionId> {
        self.node(id).parent
    }

    /// Section names from the root (exclusive) down to `id`.
    pub fn path(&self, id: SectionId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut at = id;
        while let Some(parent) = self.parent(at) {
            path.push(self.name(at));
            at = parent;
        }
        path.reverse();
        path
    }

    pub fn child(&self, id: SectionId, name: &str) -> Option<SectionId> {
        self.node(id).children.get(name).copied()
    }

    /// Child sections, sorted by name.
    pub fn children(&self, id: SectionId) -> impl Iterator<Item = (&str, SectionId)> {
        self.node(id)
            .children
            .iter()
            .map(|(name, &child)| (name.as_str(), child))
    }

    /// Commands of a section under their primary names, sorted.
    pub fn commands(&self, id: SectionId) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.node(id)
            .commands
            .iter()
            .filter(|(key, cmd)| key.as_str() == cmd.name())
            .map(|(_, cmd)| cmd)
    }

    /// Command registered in this exact section under `name` or an alias.
    pub fn command(&self, id: SectionId, name: &str) -> Option<&Arc<dyn Command>> {
        self.node(id).commands.get(name)
    }

    /// Resolve tokens to a command, starting at `from`.
    pub fn lookup<'t, 'a>(&'t self, from: SectionId, tokens: &'a [&'a str]) -> Option<Resolved<'t, 'a>> {
        let (&first, rest) = tokens.split_first()?;
        if !rest.is_empty()
            && let Some(child) = self.child(from, first)
        {
            return self.lookup(child, rest);
        }
        let command = self
            .command(from, first)
            .or_else(|| self.command(self.root(), first))?;
        Some(Resolved {
            section: from,
            command,
            args: rest,
        })
    }

    /// Resolve tokens made only of section names.
    pub fn resolve_sections(&self, from: SectionId, tokens: &[&str]) -> Option<SectionId> {
        if tokens.is_empty() {
            return None;
        }
        tokens
            .iter()
            .try_fold(from, |at, name| self.child(at, name))
    }

    /// Execute one pipeline stage.
    ///
    /// `cursor` is the session's current section; a line naming only
    /// sections moves it. Diagnostics go to the sink's stderr channel and
    /// faults are recorded in the session's fault log.
    pub fn execute(
        &self,
        cursor: &mut SectionId,
        sink: &mut Sink,
        line: &str,
        session: &mut SessionState,
    ) -> Outcome {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return abort(sink, "empty command".to_string());
        }

        if let Some(resolved) = self.lookup(*cursor, &tokens) {
            return self.invoke(resolved, sink, line, session);
        }

        match self.resolve_sections(*cursor, &tokens) {
            Some(section) => {
                log::debug!("entering section {}", self.path(section).join("-"));
                *cursor = section;
                Outcome::Continue
            },
            None => abort(sink, format!("command not found: {}", tokens.join(" "))),
        }
    }

    fn invoke(
        &self,
        resolved: Resolved<'_, '_>,
        sink: &mut Sink,
        line: &str,
        session: &mut SessionState,
    ) -> Outcome {
        let Resolved {
            section,
            command,
            args,
        } = resolved;
        if let Err(message) = command.arity().check(args.len()) {
            return abort(sink, message);
        }

        let mut env = Environment {
            tree: self,
            section,
            session,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            command.execute(sink, args, &mut env)
        }));

        let (diagnostic, detail) = match result {
            Ok(Ok(())) => return Outcome::Continue,
            Ok(Err(e)) if e.is_user_error() => return abort(sink, e.to_string()),
            Ok(Err(e)) => (
                format!("{}: {e}", command.name()),
                format!("{}: {e:?}", command.name()),
            ),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                (
                    format!("{}: internal error: {message}", command.name()),
                    format!("{}: panicked: {message}", command.name()),
                )
            },
        };
        log::warn!("handler fault in '{line}': {detail}");
        env.session.faults.record(line.trim(), detail.clone());
        sink.error(format!(
            "error: {diagnostic} (type 'traceback' for details)\n"
        ));
        Outcome::Fault { diagnostic, detail }
    }

    /// Completion candidates for a partial line.
    ///
    /// Leading words are resolved through child sections; the trailing word
    /// is matched as a prefix against the reached section's commands and
    /// children, plus root commands when `include_root` is set and the
    /// section is not the root. Nested candidates carry their path prefix.
    pub fn complete(&self, from: SectionId, partial: &str, include_root: bool) -> Vec<String> {
        let mut words: Vec<&str> = partial.split_whitespace().collect();
        let current = if partial.is_empty() || partial.ends_with(char::is_whitespace) {
            ""
        } else {
            words.pop().unwrap_or("")
        };
        let mut candidates = self.complete_in(from, &words, current, include_root);
        candidates.sort();
        candidates.dedup();
        candidates
    }

    fn complete_in(
        &self,
        at: SectionId,
        words: &[&str],
        current: &str,
        include_root: bool,
    ) -> Vec<String> {
        match words.split_first() {
            Some((&first, rest)) => match self.child(at, first) {
                Some(child) => self
                    .complete_in(child, rest, current, include_root)
                    .into_iter()
                    .map(|c| format!("{first} {c}"))
                    .collect(),
                None => Vec::new(),
            },
            None => {
                let node = self.node(at);
                let mut names: Vec<&str> = node
                    .children
                    .keys()
                    .chain(node.commands.keys())
                    .map(String::as_str)
                    .collect();
                if include_root && at != self.root() {
                    names.extend(self.node(self.root()).commands.keys().map(String::as_str));
                }
                names
                    .into_iter()
                    .filter(|name| name.starts_with(current))
                    .map(str::to_string)
                    .collect()
            },
        }
    }

    /// One-line usage for a completion candidate: the command's syntax or the
    /// section's summary.
    pub fn usage_for(&self, from: SectionId, item: &str) -> String {
        let tokens: Vec<&str> = item.split_whitespace().collect();
        if let Some(resolved) = self.lookup(from, &tokens)
            && resolved.args.is_empty()
        {
            return resolved.command.usage();
        }
        self.resolve_sections(from, &tokens)
            .map(|id| self.summary(id).to_string())
            .unwrap_or_default()
    }
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

fn abort(sink: &mut Sink, message: String) -> Outcome {
    sink.error(format!("error: {message}\n"));
    Outcome::Abort(message)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
