//! Demo command tree shipped with the `trellis` binary.

use trellis_terminal::{Arity, Command, CommandTree, Environment, Sink, register_builtins};
use trellis_types::error::{Result, TrellisError};

/// Interfaces reported by `net iface show`.
const INTERFACES: &[(&str, &str, &str)] = &[
    ("lo", "up", "127.0.0.1/8"),
    ("eth0", "up", "192.0.2.10/24"),
    ("eth1", "down", "-"),
];

/// Build the demo tree:
///
/// ```text
/// (root)  help history exit traceback echo
/// ├── test   ping version
/// ├── bogus  error panic
/// └── net    ping
///     └── iface  show
/// ```
pub fn build_tree() -> CommandTree {
    let mut tree = CommandTree::new();
    register_builtins(&mut tree);
    let root = tree.root();
    tree.register(root, Box::new(EchoCmd));

    let test = tree.add_section(root, "test", "Connectivity self-test");
    tree.register(test, Box::new(PongCmd));
    tree.register(test, Box::new(VersionCmd));

    let bogus = tree.add_section(root, "bogus", "Failure demonstrations");
    tree.register(bogus, Box::new(ErrorCmd));
    tree.register(bogus, Box::new(PanicCmd));

    let net = tree.add_section(root, "net", "Network diagnostics");
    tree.register(net, Box::new(PingCmd));
    let iface = tree.add_section(net, "iface", "Interface status");
    tree.register(iface, Box::new(IfaceShowCmd));

    tree
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn arity(&self) -> Arity {
        Arity::variadic(&[], &["text"])
    }
    fn doc(&self) -> &str {
        "Print the arguments."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        sink.write(format!("{}\n", args.join(" ")));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// test
// ---------------------------------------------------------------------------

struct PongCmd;
impl Command for PongCmd {
    fn name(&self) -> &str {
        "ping"
    }
    fn doc(&self) -> &str {
        "Answer with pong."
    }
    fn execute(&self, sink: &mut Sink, _args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        sink.write("pong!\n");
        Ok(())
    }
}

struct VersionCmd;
impl Command for VersionCmd {
    fn name(&self) -> &str {
        "version"
    }
    fn doc(&self) -> &str {
        "Show the trellis version."
    }
    fn execute(&self, sink: &mut Sink, _args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        sink.write(format!("trellis {}\n", env!("CARGO_PKG_VERSION")));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// bogus
// ---------------------------------------------------------------------------

struct ErrorCmd;
impl Command for ErrorCmd {
    fn name(&self) -> &str {
        "error"
    }
    fn doc(&self) -> &str {
        "Fail with a handler error."
    }
    fn execute(&self, _sink: &mut Sink, _args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        Err(TrellisError::Command("bogus".to_string()))
    }
}

struct PanicCmd;
impl Command for PanicCmd {
    fn name(&self) -> &str {
        "panic"
    }
    fn doc(&self) -> &str {
        "Panic inside the handler."
    }
    fn execute(&self, _sink: &mut Sink, _args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        panic!("bogus handler panicked");
    }
}

// ---------------------------------------------------------------------------
// net
// ---------------------------------------------------------------------------

struct PingCmd;
impl Command for PingCmd {
    fn name(&self) -> &str {
        "ping"
    }
    fn arity(&self) -> Arity {
        Arity::new(&["host"], &["count"])
    }
    fn doc(&self) -> &str {
        "Send simulated echo requests.

        Replies are generated locally; no packets leave the host. The count
        defaults to 4 and is capped at 100."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        let host = args[0];
        let count = match args.get(1) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if (1..=100).contains(&n) => n,
                _ => return Err(TrellisError::Usage(format!("invalid count: {raw}"))),
            },
            None => 4,
        };
        sink.write(format!("PING {host}\n"));
        for seq in 1..=count {
            sink.write(format!("reply from {host}: seq={seq}\n"));
        }
        sink.write(format!("{count} packets transmitted, {count} received\n"));
        Ok(())
    }
}

struct IfaceShowCmd;
impl Command for IfaceShowCmd {
    fn name(&self) -> &str {
        "show"
    }
    fn arity(&self) -> Arity {
        Arity::new(&[], &["name"])
    }
    fn doc(&self) -> &str {
        "Show interface state."
    }
    fn execute(&self, sink: &mut Sink, args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        let wanted = args.first().copied();
        if let Some(name) = wanted
            && !INTERFACES.iter().any(|(n, _, _)| *n == name)
        {
            return Err(TrellisError::Usage(format!("no such interface: {name}")));
        }
        for (name, state, addr) in INTERFACES {
            if wanted.is_none_or(|w| w == *name) {
                sink.write(format!("{name:<6} {state:<5} {addr}\n"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_terminal::Outcome;
    use trellis_terminal::session::SessionState;

    fn run(line: &str) -> (Outcome, Sink) {
        let tree = build_tree();
        let mut cursor = tree.root();
        let mut sink = Sink::new();
        let mut session = SessionState::new(4);
        let outcome = tree.execute(&mut cursor, &mut sink, line, &mut session);
        (outcome, sink)
    }

    #[test]
    fn echo_joins_arguments() {
        let (_, sink) = run("echo hello  world");
        assert_eq!(sink.stdout(), "hello world\n");
    }

    #[test]
    fn test_section_commands() {
        assert_eq!(run("test ping").1.stdout(), "pong!\n");
        assert!(run("test version").1.stdout().starts_with("trellis "));
    }

    #[test]
    fn bogus_commands_fault() {
        assert!(matches!(run("bogus error").0, Outcome::Fault { .. }));
        assert!(matches!(run("bogus panic").0, Outcome::Fault { .. }));
    }

    #[test]
    fn ping_default_and_explicit_count() {
        let (_, sink) = run("net ping 10.0.0.1");
        let out = sink.stdout();
        assert!(out.starts_with("PING 10.0.0.1\n"));
        assert!(out.ends_with("4 packets transmitted, 4 received\n"));

        let (_, sink) = run("net ping gw 2");
        assert_eq!(sink.stdout().lines().count(), 4);
    }

    #[test]
    fn ping_rejects_bad_count() {
        let (outcome, _) = run("net ping gw 0");
        assert_eq!(outcome, Outcome::Abort("invalid count: 0".to_string()));
        let (outcome, _) = run("net ping");
        assert!(matches!(outcome, Outcome::Abort(ref m) if m.contains("host")));
    }

    #[test]
    fn iface_show_all_and_one() {
        let (_, sink) = run("net iface show");
        assert_eq!(sink.stdout().lines().count(), 3);
        let (_, sink) = run("net iface show eth1");
        assert_eq!(sink.stdout(), "eth1   down  -\n");
        let (outcome, _) = run("net iface show wlan0");
        assert!(matches!(outcome, Outcome::Abort(_)));
    }

    #[test]
    fn usage_strings_follow_arity() {
        let tree = build_tree();
        assert_eq!(tree.usage_for(tree.root(), "net ping"), "ping <host> [<count>]");
        assert_eq!(tree.usage_for(tree.root(), "net iface show"), "show [<name>]");
    }
}
