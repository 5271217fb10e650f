//! Commands every shell gets for free.

use trellis_types::error::{Result, TrellisError};

use crate::sink::Sink;
use crate::tree::{Arity, Command, CommandTree, Documentation, Environment};

/// Register the built-in commands on the root section.
pub fn register_builtins(tree: &mut CommandTree) {
    let root = tree.root();
    tree.register(root, Box::new(HelpCmd));
    tree.register(root, Box::new(HistoryCmd));
    tree.register(root, Box::new(ExitCmd));
    tree.register(root, Box::new(TracebackCmd));
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn arity(&self) -> Arity {
        Arity::variadic(&[], &["topic"])
    }
    fn doc(&self) -> &str {
        "syntax: help [<topic>]
        Show the available commands, or help for the specified command.

        Without a topic, lists the commands and sections reachable from the
        current section. A topic may be a command or a section path."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        let tree = env.tree;
        if args.is_empty() {
            list_available(sink, tree, env);
            return Ok(());
        }

        if let Some(resolved) = tree.lookup(env.section, args)
            && resolved.args.is_empty()
        {
            let command = resolved.command;
            let doc = Documentation::parse(command.doc());
            let summary = doc.summary.trim_end_matches(['.', ' ']);
            sink.write(format!("Function:\n\n    {summary}\n\n"));
            sink.write(format!("Syntax:\n\n    {}\n\n", command.usage()));
            if !doc.description.is_empty() {
                sink.write("Description:\n\n");
                for line in &doc.description {
                    sink.write(format!("    {line}\n"));
                }
                sink.write("\n");
            }
            return Ok(());
        }

        if let Some(section) = tree.resolve_sections(env.section, args) {
            let summary = match tree.summary(section) {
                "" => format!("Go to the \"{}\" section", tree.name(section)),
                s => s.to_string(),
            };
            sink.write(format!("Function:\n\n    {summary}\n\n"));
            sink.write(format!("Syntax:\n\n    {}\n\n", args.join(" ")));
            return Ok(());
        }

        Err(TrellisError::Usage(format!(
            "unknown command or section \"{}\"",
            args.join(" ")
        )))
    }
}

fn list_available(sink: &mut Sink, tree: &CommandTree, env: &Environment<'_>) {
    let mut usages: Vec<String> = tree.commands(env.section).map(|c| c.usage()).collect();
    if env.section != tree.root() {
        usages.extend(tree.commands(tree.root()).map(|c| c.usage()));
    }
    usages.sort();
    usages.dedup();
    if !usages.is_empty() {
        sink.write("available commands:\n");
        for usage in &usages {
            sink.write(format!("    {usage}\n"));
        }
        sink.write("\n");
    }

    let sections: Vec<&str> = tree.children(env.section).map(|(name, _)| name).collect();
    if !sections.is_empty() {
        sink.write("available sections:\n");
        for name in sections {
            sink.write(format!("    {name}\n"));
        }
        sink.write("\n");
    }
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

struct HistoryCmd;
impl Command for HistoryCmd {
    fn name(&self) -> &str {
        "history"
    }
    fn doc(&self) -> &str {
        "Show the accepted lines of this session."
    }
    fn execute(&self, sink: &mut Sink, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        for (i, line) in env.session.history.entries().iter().enumerate() {
            sink.write(format!("{:5}  {line}\n", i + 1));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// exit
// ---------------------------------------------------------------------------

struct ExitCmd;
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn aliases(&self) -> &[&str] {
        &["quit"]
    }
    fn doc(&self) -> &str {
        "Terminate the command line session."
    }
    fn execute(&self, _sink: &mut Sink, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.session.request_exit();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// traceback
// ---------------------------------------------------------------------------

struct TracebackCmd;
impl Command for TracebackCmd {
    fn name(&self) -> &str {
        "traceback"
    }
    fn doc(&self) -> &str {
        "Show details of the last command failure."
    }
    fn execute(&self, sink: &mut Sink, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        match env.session.faults.latest() {
            Some(fault) => sink.write(format!("{}\n{}\n", fault.command, fault.detail)),
            None => sink.write("no traceback available\n"),
        }
        Ok(())
    }
}
