//! Live-swapping plugin instance
//!
//! Owns a plugin's in-process module (if one is registered) and its remote
//! connection (if one is attached). Calls go to the remote while it is
//! connected and to the module otherwise. Switching either way re-opens the
//! plugin with its last saved state.

use gridwell_bridge::exports;
use gridwell_bridge::{CallError, CallResult, CallReturn, HostContext, LogLevel, PluginBackend};
use gridwell_core::TypedArg;

use crate::inproc::InProcessBackend;
use crate::listener::ConnectionRegistry;
use crate::remote::RemoteBackend;

/// Which backend serves calls right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveBackend {
    InProcess,
    Remote,
    None,
}

#[derive(Debug)]
pub struct PluginInstance {
    name: String,
    identity: String,
    local: Option<InProcessBackend>,
    remote: RemoteBackend,
    saved: Vec<u8>,
    open_pending: bool,
    fell_back: bool,
}

impl PluginInstance {
    /// Instance backed by `local`, identified by the module's identity.
    pub fn new(name: impl Into<String>, local: Option<InProcessBackend>) -> Self {
        let name = name.into();
        let identity = local
            .as_ref()
            .map(|l| l.identity().to_owned())
            .unwrap_or_else(|| name.clone());
        Self {
            name,
            identity,
            local,
            remote: RemoteBackend::default(),
            saved: Vec::new(),
            open_pending: false,
            fell_back: false,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }

    pub fn active(&self) -> ActiveBackend {
        if self.remote.is_connected() {
            ActiveBackend::Remote
        } else if self.local.is_some() {
            ActiveBackend::InProcess
        } else {
            ActiveBackend::None
        }
    }

    /// Last state handed to or taken from the plugin.
    pub fn saved_state(&self) -> &[u8] {
        &self.saved
    }

    /// True once after the remote dropped and calls fell back to the module.
    pub fn take_fell_back(&mut self) -> bool {
        std::mem::take(&mut self.fell_back)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Swapping
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach a waiting connection for this plugin, if there is one.
    ///
    /// The module's current state is saved first so the remote opens where
    /// the module left off.
    pub fn poll(&mut self, registry: &ConnectionRegistry, ctx: &mut HostContext<'_>) -> bool {
        let Some(conn) = registry.take(&self.identity) else {
            return false;
        };
        if !self.remote.is_connected() && self.local.is_some() {
            if let Err(e) = self.save(ctx) {
                tracing::debug!(plugin = %self.name, error = %e, "save before attach failed");
            }
        }
        ctx.state.log.push(
            &self.name,
            LogLevel::Info,
            format!("remote attached from {:?}", conn.peer()),
        );
        self.remote.attach(conn);
        self.open_pending = true;
        true
    }

    /// Drop the remote connection and go back to the module.
    pub fn detach_remote(&mut self) {
        if self.remote.detach().is_some() {
            self.open_pending = true;
        }
    }

    fn fall_back(&mut self, ctx: &mut HostContext<'_>, error: &CallError) {
        ctx.state.log.push(
            &self.name,
            LogLevel::Warn,
            format!("remote lost ({error}), falling back"),
        );
        self.fell_back = true;
        self.open_pending = true;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn call_active(
        &mut self,
        ctx: &mut HostContext<'_>,
        function: &str,
        args: Vec<TypedArg>,
    ) -> CallResult<CallReturn> {
        if self.remote.is_connected() {
            let result = self.remote.call(ctx, function, args);
            if let Err(e) = &result {
                if !self.remote.is_connected() {
                    self.fall_back(ctx, e);
                }
            }
            return result;
        }
        match self.local.as_mut() {
            Some(local) => local.call(ctx, function, args),
            None => Err(CallError::NoModule),
        }
    }

    /// Re-open with the saved state after a swap.
    fn reopen_if_needed(&mut self, ctx: &mut HostContext<'_>) {
        if !self.open_pending || self.active() == ActiveBackend::None {
            return;
        }
        self.open_pending = false;
        let state = TypedArg::Bytes(self.saved.clone());
        match self.call_active(ctx, exports::OPEN, vec![state]) {
            Ok(ret) if !ret.handled() => {
                tracing::debug!(plugin = %self.name, "open did not take the saved state");
            }
            Ok(_) => {}
            Err(e) => ctx.state.log.push(
                &self.name,
                LogLevel::Warn,
                format!("open failed: {e}"),
            ),
        }
    }

    /// Call any export on the active backend.
    pub fn call(
        &mut self,
        ctx: &mut HostContext<'_>,
        function: &str,
        args: Vec<TypedArg>,
    ) -> CallResult<CallReturn> {
        self.reopen_if_needed(ctx);
        self.call_active(ctx, function, args)
    }

    /// Hand the plugin its persisted state.
    pub fn open(&mut self, ctx: &mut HostContext<'_>, state: Vec<u8>) -> CallResult<bool> {
        self.saved = state;
        self.open_pending = false;
        let ret = self.call_active(ctx, exports::OPEN, vec![TypedArg::Bytes(self.saved.clone())])?;
        Ok(ret.handled())
    }

    pub fn render(&mut self, ctx: &mut HostContext<'_>) -> CallResult<CallReturn> {
        self.call(ctx, exports::RENDER, Vec::new())
    }

    /// Ask the plugin for its state. `None` when it did not handle `save`.
    pub fn save(&mut self, ctx: &mut HostContext<'_>) -> CallResult<Option<Vec<u8>>> {
        let ret = self.call(ctx, exports::SAVE, Vec::new())?;
        if !ret.handled() {
            return Ok(None);
        }
        self.saved = ret.secondary.clone();
        Ok(Some(ret.secondary))
    }

    /// Identity reported by the plugin itself.
    pub fn info(&mut self, ctx: &mut HostContext<'_>) -> CallResult<String> {
        let ret = self.call(ctx, exports::INFO, Vec::new())?;
        Ok(String::from_utf8_lossy(&ret.to_bytes()).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwell_bridge::{
        ExportSignature, HostCalls, HostCallsExt, HostState, NoSubRender, PluginModule,
    };

    #[derive(Default)]
    struct Notes {
        text: Vec<u8>,
        renders: usize,
    }

    impl PluginModule for Notes {
        fn identity(&self) -> &str {
            "notes"
        }

        fn exports(&self) -> Vec<ExportSignature> {
            exports::standard()
        }

        fn call(
            &mut self,
            host: &mut dyn HostCalls,
            function: &str,
            args: Vec<TypedArg>,
        ) -> CallResult<Option<TypedArg>> {
            match function {
                exports::OPEN => {
                    self.text = args[0].as_bytes().unwrap_or_default().to_vec();
                    Ok(Some(TypedArg::Int64(1)))
                }
                exports::SAVE => {
                    self.text.extend_from_slice(b"+");
                    host.set_return(&self.text)?;
                    Ok(Some(TypedArg::Int64(1)))
                }
                exports::INFO => {
                    host.set_return(b"notes 1.0")?;
                    Ok(None)
                }
                _ => {
                    self.renders += 1;
                    Ok(Some(TypedArg::Int64(0)))
                }
            }
        }
    }

    fn instance() -> PluginInstance {
        PluginInstance::new(
            "notes",
            Some(InProcessBackend::new(Box::new(Notes::default()))),
        )
    }

    #[test]
    fn test_open_save_round_trip() {
        let mut state = HostState::default();
        let mut sub = NoSubRender;
        let mut ctx = HostContext::new(&mut state, "notes", &mut sub);
        let mut p = instance();

        assert_eq!(p.identity(), "notes");
        assert_eq!(p.active(), ActiveBackend::InProcess);
        assert!(p.open(&mut ctx, b"hello".to_vec()).unwrap());
        assert_eq!(p.save(&mut ctx).unwrap(), Some(b"hello+".to_vec()));
        assert_eq!(p.saved_state(), b"hello+");
        assert_eq!(p.info(&mut ctx).unwrap(), "notes 1.0");
        assert_eq!(p.render(&mut ctx).unwrap().primary_i64(), Some(0));
    }

    #[test]
    fn test_no_backend() {
        let mut state = HostState::default();
        let mut sub = NoSubRender;
        let mut ctx = HostContext::new(&mut state, "ghost", &mut sub);
        let mut p = PluginInstance::new("ghost", None);
        assert_eq!(p.active(), ActiveBackend::None);
        assert!(matches!(p.render(&mut ctx), Err(CallError::NoModule)));
        assert!(!p.take_fell_back());
    }

    #[test]
    fn test_poll_without_connection_is_noop() {
        let mut state = HostState::default();
        let mut sub = NoSubRender;
        let mut ctx = HostContext::new(&mut state, "notes", &mut sub);
        let mut p = instance();
        assert!(!p.poll(&ConnectionRegistry::new(), &mut ctx));
        assert_eq!(p.active(), ActiveBackend::InProcess);
    }
}
