//! Remote plugin backend
//!
//! A plugin process connected over TCP. The host sends a call, then the
//! plugin drives: it writes requests and blocks on each reply until it sends
//! `RenderDone`.
//!
//! ```text
//!   host                                   plugin
//!    │ ── name, encoded args ───────────────► │
//!    │ ◄────────────── opcode, args ───────── │
//!    │ ── status, values ───────────────────► │
//!    │            ... repeated ...            │
//!    │ ◄────────── RenderDone, [primary] ──── │
//! ```
//!
//! Any I/O or protocol error drops the connection.

use std::fmt;
use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};

use gridwell_bridge::{CallError, CallResult, CallReturn, HostContext, Opcode, PluginBackend};
use gridwell_core::{wire, TypedArg, WireError};

/// Per-call progress of the opcode loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    AwaitingRequest,
    Done,
}

/// An attached plugin process.
pub struct RemoteConnection {
    identity: String,
    peer: Option<SocketAddr>,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl fmt::Debug for RemoteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConnection")
            .field("identity", &self.identity)
            .field("peer", &self.peer)
            .finish()
    }
}

impl RemoteConnection {
    /// Wrap a stream whose handshake has already been read.
    pub fn new(identity: impl Into<String>, stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr().ok();
        let writer = BufWriter::new(stream.try_clone()?);
        Ok(Self {
            identity: identity.into(),
            peer,
            reader: BufReader::new(stream),
            writer,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn send_call(&mut self, function: &str, args: &[TypedArg]) -> CallResult<()> {
        wire::write_bytes(&mut self.writer, function.as_bytes())?;
        wire::write_bytes(&mut self.writer, &wire::encode_args(args))?;
        self.writer.flush().map_err(WireError::from)?;
        Ok(())
    }

    /// Serve requests until the plugin finishes the call.
    fn serve(&mut self, ctx: &mut HostContext<'_>) -> CallResult<Option<TypedArg>> {
        let mut state = LoopState::AwaitingRequest;
        let mut served = 0usize;
        while state == LoopState::AwaitingRequest {
            let code = wire::read_u64(&mut self.reader)?;
            let op = Opcode::try_from(code).map_err(CallError::Protocol)?;
            let args = wire::read_args(&mut self.reader)?;
            let reply = ctx.serve(op, args)?;
            if op == Opcode::RenderDone {
                state = LoopState::Done;
            } else {
                reply.write_to(&mut self.writer)?;
                self.writer.flush().map_err(WireError::from)?;
                served += 1;
            }
        }
        tracing::trace!(identity = %self.identity, served, "remote call finished");
        // The primary return was stored by RenderDone.
        Ok(None)
    }
}

/// Backend over an optional connection; calls fail with
/// [`CallError::NoConnection`] while detached.
#[derive(Debug, Default)]
pub struct RemoteBackend {
    conn: Option<RemoteConnection>,
}

impl RemoteBackend {
    pub fn new(conn: RemoteConnection) -> Self {
        Self { conn: Some(conn) }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn connection(&self) -> Option<&RemoteConnection> {
        self.conn.as_ref()
    }

    pub fn attach(&mut self, conn: RemoteConnection) {
        if let Some(old) = self.conn.replace(conn) {
            tracing::info!(identity = %old.identity, "remote connection replaced");
        }
    }

    pub fn detach(&mut self) -> Option<RemoteConnection> {
        self.conn.take()
    }
}

impl PluginBackend for RemoteBackend {
    fn kind(&self) -> &'static str {
        "remote"
    }

    fn call(
        &mut self,
        ctx: &mut HostContext<'_>,
        function: &str,
        args: Vec<TypedArg>,
    ) -> CallResult<CallReturn> {
        let conn = self.conn.as_mut().ok_or(CallError::NoConnection)?;
        let result = conn
            .send_call(function, &args)
            .and_then(|()| ctx.scoped_call(|ctx| conn.serve(ctx)));
        if let Err(e) = &result {
            if e.is_fatal() {
                let identity = conn.identity.clone();
                self.conn = None;
                tracing::warn!(%identity, function, error = %e, "remote plugin disconnected");
            }
        }
        result
    }
}
