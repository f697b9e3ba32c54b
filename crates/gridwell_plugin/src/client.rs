//! Plugin side of the remote protocol
//!
//! A plugin process connects, announces its identity, then waits for calls.
//! While a call runs the plugin drives the conversation through
//! [`RemoteHost`], which implements the same [`HostCalls`] interface an
//! in-process module sees. [`serve_module`] runs any [`PluginModule`] this
//! way, which is how a module is debugged live against a running host.

use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::net::{TcpStream, ToSocketAddrs};

use gridwell_bridge::{CallError, CallResult, HostCalls, Opcode, PluginModule, Reply};
use gridwell_core::{wire, TypedArg, WireError, WireResult};

/// An incoming export call.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingCall {
    pub function: String,
    pub args: Vec<TypedArg>,
}

/// Connection from a plugin process to the host.
pub struct RemoteClient {
    identity: String,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl RemoteClient {
    /// Connect and send the identity handshake.
    pub fn connect(addr: impl ToSocketAddrs, identity: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let mut writer = BufWriter::new(stream.try_clone()?);
        wire::write_bytes(&mut writer, identity.as_bytes()).map_err(into_io)?;
        writer.flush()?;
        Ok(Self {
            identity: identity.to_owned(),
            reader: BufReader::new(stream),
            writer,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Block until the host calls an export. `None` when the host closed the
    /// connection.
    pub fn next_call(&mut self) -> WireResult<Option<IncomingCall>> {
        let function = match wire::read_string(&mut self.reader) {
            Ok(f) => f,
            Err(e) if e.is_disconnect() => return Ok(None),
            Err(e) => return Err(e),
        };
        let args = wire::decode_args(&wire::read_bytes(&mut self.reader)?)?;
        Ok(Some(IncomingCall { function, args }))
    }

    /// Requests made through this handle are served by the host.
    pub fn host(&mut self) -> RemoteHost<'_> {
        RemoteHost { client: self }
    }

    /// End the current call with an optional primary return.
    pub fn finish(&mut self, primary: Option<TypedArg>) -> WireResult<()> {
        wire::write_u64(&mut self.writer, Opcode::RenderDone.code())?;
        let args: Vec<TypedArg> = primary.into_iter().collect();
        wire::write_args(&mut self.writer, &args)?;
        self.writer.flush()?;
        Ok(())
    }

    fn request(&mut self, op: Opcode, args: &[TypedArg]) -> WireResult<Reply> {
        wire::write_u64(&mut self.writer, op.code())?;
        wire::write_args(&mut self.writer, args)?;
        self.writer.flush()?;
        Reply::read_from(&mut self.reader)
    }
}

/// [`HostCalls`] over a [`RemoteClient`].
pub struct RemoteHost<'a> {
    client: &'a mut RemoteClient,
}

impl HostCalls for RemoteHost<'_> {
    fn invoke(&mut self, op: Opcode, args: Vec<TypedArg>) -> CallResult<Reply> {
        if op == Opcode::RenderDone {
            return Err(CallError::Export {
                function: op.name().to_owned(),
                message: "calls are finished by the client".to_owned(),
            });
        }
        Ok(self.client.request(op, &args)?)
    }
}

/// Serve `module`'s exports to the host until the connection closes.
///
/// A failing export still finishes its call (with no primary return) so the
/// host is never left waiting; a lost connection ends the loop.
pub fn serve_module(client: &mut RemoteClient, module: &mut dyn PluginModule) -> WireResult<()> {
    while let Some(call) = client.next_call()? {
        let result = {
            let mut host = client.host();
            module.call(&mut host, &call.function, call.args)
        };
        let primary = match result {
            Ok(primary) => primary,
            Err(CallError::Protocol(gridwell_bridge::ProtocolError::Wire(e))) => return Err(e),
            Err(e) => {
                tracing::warn!(function = %call.function, error = %e, "export failed");
                None
            }
        };
        client.finish(primary)?;
    }
    tracing::debug!(identity = %client.identity, "host closed the connection");
    Ok(())
}

fn into_io(e: WireError) -> io::Error {
    match e {
        WireError::Io(e) => e,
        other => io::Error::new(ErrorKind::InvalidData, other.to_string()),
    }
}
