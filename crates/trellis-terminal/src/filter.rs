//! Filter section: text transforms for pipeline stages after the first.
//!
//! Filters read the sink's stdout, transform it line by line, and replace
//! stdout with the result. Lines are split on CRLF or LF and re-terminated
//! with CRLF.

use regex::{Regex, RegexBuilder};
use trellis_types::error::{Result, TrellisError};

use crate::sink::Sink;
use crate::tree::{Arity, Command, CommandTree, Environment};

/// Build the filter section as a standalone tree.
///
/// The root has no parent and no built-ins, so only filters resolve there.
pub fn filter_tree() -> CommandTree {
    let mut tree = CommandTree::new();
    let root = tree.root();
    tree.register(root, Box::new(GrepCmd));
    tree.register(root, Box::new(IncludeCmd));
    tree.register(root, Box::new(ExcludeCmd));
    tree.register(root, Box::new(HeadCmd));
    tree
}

/// Parsed short options.
#[derive(Debug, Default)]
struct Options<'a> {
    flags: Vec<char>,
    values: Vec<(char, &'a str)>,
    operands: Vec<&'a str>,
}

impl Options<'_> {
    fn has(&self, flag: char) -> bool {
        self.flags.contains(&flag)
    }

    fn value(&self, opt: char) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|(o, _)| *o == opt)
            .map(|(_, v)| *v)
    }
}

/// Parse POSIX-style short options. `flags` take no argument, `valued`
/// options take one (attached or as the next word). Parsing stops at `--`
/// or the first non-option word.
fn getopt<'a>(args: &[&'a str], flags: &str, valued: &str) -> std::result::Result<Options<'a>, String> {
    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        if arg == "--" {
            i += 1;
            break;
        }
        let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.is_empty()) else {
            break;
        };
        for (pos, opt) in cluster.char_indices() {
            if flags.contains(opt) {
                opts.flags.push(opt);
            } else if valued.contains(opt) {
                let attached = &cluster[pos + opt.len_utf8()..];
                let value = if !attached.is_empty() {
                    attached
                } else {
                    i += 1;
                    *args
                        .get(i)
                        .ok_or_else(|| format!("option -{opt} requires argument"))?
                };
                opts.values.push((opt, value));
                break;
            } else {
                return Err(format!("option -{opt} not recognized"));
            }
        }
        i += 1;
    }
    opts.operands = args[i.min(args.len())..].to_vec();
    Ok(opts)
}

fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Fail a filter stage: discard the pending stdout and report `message`.
fn fail(sink: &mut Sink, command: &str, message: impl std::fmt::Display) -> TrellisError {
    sink.clear_stdout();
    TrellisError::Usage(format!("{command}: {message}"))
}

/// Shared body of `grep`, `include` and `exclude`.
fn grep(sink: &mut Sink, pattern: &str, ignore_case: bool, invert: bool, count: bool) -> Result<()> {
    // Anchored to emulate a match at the start of the line only.
    let regex: Regex = RegexBuilder::new(&format!("^(?:{pattern})"))
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| fail(sink, "grep", e))?;

    let input = sink.stdout();
    let kept: Vec<&str> = split_lines(&input)
        .into_iter()
        .filter(|line| regex.is_match(line) != invert)
        .collect();

    if count {
        sink.set_stdout(format!("{}\r\n", kept.len()));
    } else {
        sink.set_stdout(kept.iter().map(|l| format!("{l}\r\n")).collect::<String>());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// grep
// ---------------------------------------------------------------------------

struct GrepCmd;
impl Command for GrepCmd {
    fn name(&self) -> &str {
        "grep"
    }
    fn arity(&self) -> Arity {
        Arity::variadic(&[], &["pattern"])
    }
    fn doc(&self) -> &str {
        "syntax: grep [<options>] <pattern>
        Keep lines whose start matches a regular expression.

        -c  Print only a count of matching lines
        -i  Ignore case distinctions
        -v  Select non-matching lines"
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        let opts = getopt(args, "civ", "").map_err(|e| fail(sink, "grep", e))?;
        grep(
            sink,
            &opts.operands.join(" "),
            opts.has('i'),
            opts.has('v'),
            opts.has('c'),
        )
    }
}

// ---------------------------------------------------------------------------
// include / exclude
// ---------------------------------------------------------------------------

struct IncludeCmd;
impl Command for IncludeCmd {
    fn name(&self) -> &str {
        "inc"
    }
    fn aliases(&self) -> &[&str] {
        &["include"]
    }
    fn arity(&self) -> Arity {
        Arity::variadic(&[], &["text"])
    }
    fn doc(&self) -> &str {
        "Keep lines starting with the literal text."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        grep(sink, &regex::escape(&args.join(" ")), false, false, false)
    }
}

struct ExcludeCmd;
impl Command for ExcludeCmd {
    fn name(&self) -> &str {
        "exc"
    }
    fn aliases(&self) -> &[&str] {
        &["exclude"]
    }
    fn arity(&self) -> Arity {
        Arity::variadic(&[], &["text"])
    }
    fn doc(&self) -> &str {
        "Drop lines starting with the literal text."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        grep(sink, &regex::escape(&args.join(" ")), false, true, false)
    }
}

// ---------------------------------------------------------------------------
// head
// ---------------------------------------------------------------------------

struct HeadCmd;
impl Command for HeadCmd {
    fn name(&self) -> &str {
        "head"
    }
    fn arity(&self) -> Arity {
        Arity::variadic(&[], &[])
    }
    fn doc(&self) -> &str {
        "syntax: head -n <count>
        Keep only the first lines of output."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        let opts = getopt(args, "", "n").map_err(|e| fail(sink, "head", e))?;
        let count: usize = match opts.value('n') {
            Some(raw) => raw
                .parse()
                .map_err(|_| fail(sink, "head", "invalid numeric value"))?,
            None => return Err(fail(sink, "head", "missing line count")),
        };

        let input = sink.stdout();
        let kept: String = split_lines(&input)
            .into_iter()
            .take(count)
            .map(|l| format!("{l}\r\n"))
            .collect();
        sink.set_stdout(kept);
        Ok(())
    }
}
