//! gridwell call bridge
//!
//! Host half of the plugin protocol. A plugin, wherever it runs, issues
//! numbered requests ([`Opcode`]); each one is decoded into a
//! [`HostRequest`], served against the [`HostState`] by [`dispatch`], and
//! answered with a [`Reply`].
//!
//! ```
//! use gridwell_bridge::{HostContext, HostState, HostCallsExt, NoSubRender};
//! use gridwell_core::GridRect;
//!
//! let mut state = HostState::default();
//! let mut sub = NoSubRender;
//! state.begin_tick();
//! {
//!     let mut host = HostContext::new(&mut state, "demo", &mut sub);
//!     host.div_start("toolbar", GridRect::new(0, 0, 4, 1)).unwrap();
//!     host.div_end().unwrap();
//! }
//! state.end_tick("demo");
//! assert!(state.log.is_empty());
//! ```

pub mod assets;
pub mod backend;
pub mod dispatch;
pub mod error;
pub mod exports;
pub mod log;
pub mod opcode;
pub mod pending;
pub mod request;
pub mod state;
pub mod storage;
pub mod translate;

pub use assets::AssetDir;
pub use backend::{
    ExportSignature, HostCalls, HostCallsExt, HostContext, NoSubRender, PluginBackend,
    PluginModule, SubRender,
};
pub use dispatch::dispatch;
pub use error::{AssetError, CallError, CallResult, ProtocolError, StorageError};
pub use log::{LogEntry, LogLevel, PluginLog};
pub use opcode::{Opcode, PROTOCOL_VERSION};
pub use pending::{CallReturn, PendingStack};
pub use request::{ArgReader, HostRequest, Reply, STATUS_FAILED};
pub use state::{DragPayload, HostState, BASE_LEVEL};
pub use storage::{NullStorage, Row, Storage, StorageEngine};
pub use translate::Translations;
