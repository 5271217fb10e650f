//! TCP session server.
//!
//! Accepts inbound connections and runs one [`LineEditor`] per client on its
//! own thread. The command tree and filter section are shared; every session
//! gets private edit state, history and section cursor. Connections beyond
//! the configured limit are told so and closed.

use std::io::{ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use trellis_terminal::{ByteStream, CommandTree, LineEditor};
use trellis_types::config::{ListenConfig, ShellConfig};
use trellis_types::error::{Result, TrellisError};

/// Sent to a client that arrives while the server is full.
const REJECT_MESSAGE: &[u8] = b"too many sessions\r\n";

/// Serves shell sessions to TCP clients.
#[derive(Clone)]
pub struct SessionServer {
    shell: Arc<ShellConfig>,
    listen: ListenConfig,
    tree: Arc<CommandTree>,
    filter: Arc<CommandTree>,
    active: Arc<AtomicUsize>,
}

/// Decrements the active-session count when a session thread ends.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SessionServer {
    /// Listen settings come from `shell.listen`, or the defaults.
    pub fn new(shell: ShellConfig, tree: Arc<CommandTree>, filter: Arc<CommandTree>) -> Self {
        let listen = shell.listen.clone().unwrap_or_default();
        Self {
            shell: Arc::new(shell),
            listen,
            tree,
            filter,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the configured address.
    pub fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind((self.listen.address.as_str(), self.listen.port))?;
        log::info!(
            "listening on {} (max {} sessions)",
            listener.local_addr()?,
            self.listen.max_connections
        );
        Ok(listener)
    }

    /// Number of sessions currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept connections forever.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.admit(stream),
                Err(e) => log::warn!("accept failed: {e}"),
            }
        }
        Ok(())
    }

    fn admit(&self, mut stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        if self.active_sessions() >= self.listen.max_connections {
            log::warn!("rejecting {peer}: session limit reached");
            if let Err(e) = stream.write_all(REJECT_MESSAGE) {
                log::debug!("could not notify {peer}: {e}");
            }
            return;
        }

        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));
        let shell = Arc::clone(&self.shell);
        let tree = Arc::clone(&self.tree);
        let filter = Arc::clone(&self.filter);
        let name = format!("session-{peer}");

        let spawned = thread::Builder::new().name(name).spawn(move || {
            let _guard = guard;
            log::info!("session opened for {peer}");
            if let Err(e) = run_session(stream, tree, filter, &shell) {
                log::warn!("session for {peer} failed: {e}");
            }
            log::info!("session closed for {peer}");
        });
        if let Err(e) = spawned {
            log::error!("could not start session thread: {e}");
        }
    }

    /// Address the server is configured for.
    pub fn configured_addr(&self) -> String {
        format!("{}:{}", self.listen.address, self.listen.port)
    }
}

/// Drive one session until the client exits or disconnects.
///
/// A peer closing the connection ends the session normally.
pub fn run_session<S: ByteStream>(
    stream: S,
    tree: Arc<CommandTree>,
    filter: Arc<CommandTree>,
    shell: &ShellConfig,
) -> Result<()> {
    let mut editor = LineEditor::new(stream, tree, filter, shell)?;
    match editor.run() {
        Err(TrellisError::Io(e))
            if matches!(
                e.kind(),
                ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
            ) =>
        {
            log::info!("peer disconnected: {e}");
            Ok(())
        },
        other => other,
    }
}
