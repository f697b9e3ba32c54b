//! Connection listener for remote plugins.
//!
//! Accepts TCP connections on a background thread, reads each one's identity
//! handshake on its own thread, and parks the stream in a
//! [`ConnectionRegistry`]. The host's tick picks connections up from there;
//! no plugin call ever runs on these threads.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gridwell_core::{wire, WireError};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::remote::RemoteConnection;

/// Longest identity accepted in a handshake.
pub const MAX_IDENTITY_LEN: u64 = 256;

/// Configuration for the listener.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Address to bind.
    pub addr: String,
    /// Sleep between accept polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// How long a new connection may take to send its identity.
    pub handshake_timeout_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl ListenerConfig {
    /// Fixed loopback port for the live-reload workflow.
    pub fn standard() -> Self {
        Self {
            addr: "127.0.0.1:7420".to_string(),
            poll_interval_ms: 100,
            handshake_timeout_ms: 2000,
        }
    }

    /// Ephemeral loopback port with fast polling, for tests and embedding.
    pub fn local() -> Self {
        Self {
            addr: "127.0.0.1:0".to_string(),
            poll_interval_ms: 5,
            handshake_timeout_ms: 1000,
        }
    }

    /// Create a config bound to `addr` with standard timings.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::standard()
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Connections waiting to be attached, by plugin identity.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<FxHashMap<String, RemoteConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a connection. A newer connection for the same identity replaces
    /// the waiting one.
    pub fn insert(&self, conn: RemoteConnection) {
        let identity = conn.identity().to_owned();
        if self.inner.lock().insert(identity.clone(), conn).is_some() {
            tracing::debug!(%identity, "pending connection replaced");
        }
    }

    /// Claim the waiting connection for `identity`.
    pub fn take(&self, identity: &str) -> Option<RemoteConnection> {
        self.inner.lock().remove(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.inner.lock().contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Handle to a running listener.
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    registry: ConnectionRegistry,
}

impl ListenerHandle {
    /// Request the listener to stop accepting.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Check if the accept loop is still running.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Stop and wait for the accept loop to exit.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Accepts remote plugin connections.
pub struct Listener {
    config: ListenerConfig,
    registry: ConnectionRegistry,
}

impl Listener {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            registry: ConnectionRegistry::new(),
        }
    }

    /// Share an existing registry instead of creating one.
    pub fn with_registry(mut self, registry: ConnectionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Bind and start accepting in a background thread.
    pub fn start(self) -> io::Result<ListenerHandle> {
        let listener = TcpListener::bind(&self.config.addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Plugin listener on {}", local_addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let registry = self.registry.clone();

        let thread = thread::Builder::new()
            .name("gridwell-listener".into())
            .spawn(move || self.run(listener, shutdown_clone))?;

        Ok(ListenerHandle {
            shutdown,
            thread: Some(thread),
            local_addr,
            registry,
        })
    }

    fn run(&self, listener: TcpListener, shutdown: Arc<AtomicBool>) {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let timeout = Duration::from_millis(self.config.handshake_timeout_ms.max(1));

        while !shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Plugin connection from {}", addr);
                    let registry = self.registry.clone();
                    thread::spawn(move || match handshake(stream, timeout) {
                        Ok(conn) => {
                            tracing::info!(identity = conn.identity(), %addr, "remote plugin connected");
                            registry.insert(conn);
                        }
                        Err(e) => tracing::debug!("Handshake from {} failed: {}", addr, e),
                    });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(poll);
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                    break;
                }
            }
        }
    }
}

/// Read the identity a plugin sends first.
fn handshake(stream: TcpStream, timeout: Duration) -> io::Result<RemoteConnection> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(timeout))?;
    let mut reader = &stream;
    let len = wire::read_u64(&mut reader).map_err(to_io)?;
    if len == 0 || len > MAX_IDENTITY_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("identity length {len}"),
        ));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    let identity = String::from_utf8(bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "identity is not UTF-8"))?;
    stream.set_read_timeout(None)?;
    RemoteConnection::new(identity, stream)
}

fn to_io(e: WireError) -> io::Error {
    match e {
        WireError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}
