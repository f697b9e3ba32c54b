//! gridwell plugin backends
//!
//! A plugin is reached one of two ways:
//!
//! - **In-process**: a [`PluginModule`](gridwell_bridge::PluginModule)
//!   registered by name in a [`ModuleRegistry`] and called directly.
//! - **Remote**: a separate process that connected to the [`Listener`] and
//!   speaks the framed opcode protocol ([`RemoteBackend`]).
//!
//! [`PluginInstance`] owns both and swaps between them while the host runs,
//! carrying the plugin's saved state across. [`RemoteClient`] is the other
//! end of the wire, for plugin processes written in Rust.

pub mod client;
pub mod inproc;
pub mod instance;
pub mod listener;
pub mod remote;

pub use client::{serve_module, IncomingCall, RemoteClient, RemoteHost};
pub use inproc::{InProcessBackend, ModuleRegistry};
pub use instance::{ActiveBackend, PluginInstance};
pub use listener::{ConnectionRegistry, Listener, ListenerConfig, ListenerHandle, MAX_IDENTITY_LEN};
pub use remote::{RemoteBackend, RemoteConnection};
