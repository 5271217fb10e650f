//! trellis demo entry point.
//!
//! Runs the demo command tree either on the local terminal or, when the
//! configuration has a `[listen]` table, as a TCP server with one session
//! per client. The configuration file comes from the first argument or the
//! `TRELLIS_CONFIG` environment variable.

mod console;
mod demo;
mod history_store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use console::{Console, RawTerminal};
use history_store::FileHistoryStore;
use trellis_net::SessionServer;
use trellis_terminal::{LineEditor, filter_tree};
use trellis_types::config::ShellConfig;
use trellis_types::error::TrellisError;

fn main() -> Result<()> {
    let config = load_config()?;
    let default_level = if config.listen.is_some() { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    quiet_panics();

    let tree = Arc::new(demo::build_tree());
    let filter = Arc::new(filter_tree());

    if config.listen.is_some() {
        let server = SessionServer::new(config, tree, filter);
        let listener = server
            .bind()
            .with_context(|| format!("binding {}", server.configured_addr()))?;
        server.serve(listener)?;
        return Ok(());
    }

    run_console(&config, tree, filter)
}

/// Report handler panics through the log only.
///
/// Dispatch already catches the unwind and prints a diagnostic to the
/// session; the default hook would also write to stderr with bare line
/// feeds, which garbles a raw-mode console.
fn quiet_panics() {
    std::panic::set_hook(Box::new(|info| log::warn!("{info}")));
}

fn load_config() -> Result<ShellConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TRELLIS_CONFIG").ok())
        .map(PathBuf::from);
    match path {
        Some(path) => ShellConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ShellConfig::default()),
    }
}

fn run_console(
    config: &ShellConfig,
    tree: Arc<trellis_terminal::CommandTree>,
    filter: Arc<trellis_terminal::CommandTree>,
) -> Result<()> {
    let _raw = RawTerminal::enable().context("enabling raw terminal mode")?;
    log::info!("starting console session");

    let mut editor = LineEditor::new(Console::new(), tree, filter, config)?;
    if let Some(path) = &config.history_file {
        editor = editor.with_history_store(Box::new(FileHistoryStore::new(path)));
    }

    match editor.run() {
        Err(TrellisError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            log::info!("console input closed");
            Ok(())
        },
        other => Ok(other?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_terminal::session::SessionState;
    use trellis_terminal::{Outcome, Sink};

    #[test]
    fn panics_still_become_faults_with_quiet_hook() {
        quiet_panics();
        let tree = demo::build_tree();
        let mut cursor = tree.root();
        let mut sink = Sink::new();
        let mut session = SessionState::new(4);
        let outcome = tree.execute(&mut cursor, &mut sink, "bogus panic", &mut session);
        let Outcome::Fault { diagnostic, .. } = outcome else {
            panic!("expected a fault");
        };
        assert!(diagnostic.contains("internal error: bogus handler panicked"));
        let _ = std::panic::take_hook();
    }
}
