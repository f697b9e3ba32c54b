//! Plugin seams
//!
//! ```text
//!   host tick ──► PluginBackend::call ──► plugin export
//!                                             │
//!                    HostCalls::invoke ◄──────┘  (opcode + args)
//!                           │
//!                     HostRequest::decode ──► dispatch ──► Reply
//! ```
//!
//! [`PluginModule`] is the in-process plugin. It sees the host only through
//! [`HostCalls`], the same opcode interface a remote plugin drives over its
//! socket, so a plugin can move between the two without changes.

use gridwell_core::{ArgType, Coercion, GridRect, Rect, TypedArg};

use crate::dispatch::dispatch;
use crate::error::{CallError, CallResult};
use crate::opcode::Opcode;
use crate::pending::CallReturn;
use crate::request::{HostRequest, Reply};
use crate::state::HostState;

// ============================================================================
// Export signatures
// ============================================================================

/// Declared shape of one plugin export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSignature {
    pub name: String,
    pub params: Vec<ArgType>,
    pub returns: Option<ArgType>,
}

impl ExportSignature {
    pub fn new(name: impl Into<String>, params: &[ArgType], returns: Option<ArgType>) -> Self {
        Self {
            name: name.into(),
            params: params.to_vec(),
            returns,
        }
    }

    /// Check `args` against the declared parameters, coercing scalars
    /// under `policy`.
    pub fn check_args(&self, args: Vec<TypedArg>, policy: Coercion) -> CallResult<Vec<TypedArg>> {
        if args.len() != self.params.len() {
            return Err(CallError::Export {
                function: self.name.clone(),
                message: format!(
                    "expected {} argument(s), got {}",
                    self.params.len(),
                    args.len()
                ),
            });
        }
        args.into_iter()
            .zip(&self.params)
            .enumerate()
            .map(|(index, (arg, &ty))| {
                arg.coerce(ty, policy).map_err(|source| CallError::Argument {
                    function: self.name.clone(),
                    index,
                    source,
                })
            })
            .collect()
    }
}

// ============================================================================
// Host side as seen by a plugin
// ============================================================================

/// Opcode interface a plugin uses to reach the host.
pub trait HostCalls {
    fn invoke(&mut self, op: Opcode, args: Vec<TypedArg>) -> CallResult<Reply>;
}

/// Typed wrappers over [`HostCalls::invoke`].
pub trait HostCallsExt: HostCalls {
    fn log(&mut self, level: i64, text: &str) -> CallResult<()> {
        self.invoke(Opcode::Log, vec![level.into(), text.into()])?;
        Ok(())
    }

    fn translate(&mut self, key: &str) -> CallResult<String> {
        let reply = self.invoke(Opcode::Translate, vec![key.into()])?;
        Ok(reply
            .values
            .first()
            .and_then(TypedArg::as_str)
            .unwrap_or(key)
            .to_owned())
    }

    /// False when `grid` reaches past the host's index limit. The div is
    /// opened clamped either way and still needs its [`div_end`](Self::div_end).
    fn div_start(&mut self, name: &str, grid: GridRect) -> CallResult<bool> {
        let reply = self.invoke(
            Opcode::DivStart,
            vec![
                name.into(),
                grid.x.into(),
                grid.y.into(),
                grid.w.into(),
                grid.h.into(),
            ],
        )?;
        Ok(!reply.is_failed())
    }

    fn div_end(&mut self) -> CallResult<bool> {
        Ok(!self.invoke(Opcode::DivEnd, Vec::new())?.is_failed())
    }

    fn div_col(&mut self, index: i64, min: f32, max: f32, resize: &str) -> CallResult<bool> {
        let reply = self.invoke(
            Opcode::DivCol,
            vec![index.into(), min.into(), max.into(), resize.into()],
        )?;
        Ok(!reply.is_failed())
    }

    fn div_row(&mut self, index: i64, min: f32, max: f32, resize: &str) -> CallResult<bool> {
        let reply = self.invoke(
            Opcode::DivRow,
            vec![index.into(), min.into(), max.into(), resize.into()],
        )?;
        Ok(!reply.is_failed())
    }

    fn div_enable(&mut self, flags: i64) -> CallResult<bool> {
        Ok(!self.invoke(Opcode::DivEnable, vec![flags.into()])?.is_failed())
    }

    fn div_input(&mut self) -> CallResult<i64> {
        let reply = self.invoke(Opcode::DivInput, Vec::new())?;
        Ok(reply.values.first().and_then(TypedArg::as_i64).unwrap_or(0))
    }

    /// `(canvas, crop)` in pixels.
    fn div_info(&mut self) -> CallResult<([i64; 4], [i64; 4])> {
        let reply = self.invoke(Opcode::DivInfo, Vec::new())?;
        let mut v = [0i64; 8];
        for (slot, arg) in v.iter_mut().zip(&reply.values) {
            *slot = arg.as_i64().unwrap_or(0);
        }
        Ok(([v[0], v[1], v[2], v[3]], [v[4], v[5], v[6], v[7]]))
    }

    fn paint_rect(&mut self, rect: Rect, color: u32, border: f32) -> CallResult<()> {
        self.invoke(
            Opcode::PaintRect,
            vec![
                rect.x().into(),
                rect.y().into(),
                rect.width().into(),
                rect.height().into(),
                i64::from(color).into(),
                border.into(),
            ],
        )?;
        Ok(())
    }

    fn paint_text(
        &mut self,
        rect: Rect,
        text: &str,
        color: u32,
        size: f32,
        align: i64,
    ) -> CallResult<()> {
        self.invoke(
            Opcode::PaintText,
            vec![
                rect.x().into(),
                rect.y().into(),
                rect.width().into(),
                rect.height().into(),
                text.into(),
                i64::from(color).into(),
                size.into(),
                align.into(),
            ],
        )?;
        Ok(())
    }

    fn dialog_open(&mut self, name: &str, anchor: i64, w: f32, h: f32) -> CallResult<bool> {
        let reply = self.invoke(
            Opcode::DialogOpen,
            vec![name.into(), anchor.into(), w.into(), h.into()],
        )?;
        Ok(reply.status == 1)
    }

    fn dialog_start(&mut self, name: &str) -> CallResult<bool> {
        Ok(self.invoke(Opcode::DialogStart, vec![name.into()])?.status == 1)
    }

    fn dialog_end(&mut self) -> CallResult<bool> {
        Ok(!self.invoke(Opcode::DialogEnd, Vec::new())?.is_failed())
    }

    fn dialog_close(&mut self, name: &str) -> CallResult<()> {
        self.invoke(Opcode::DialogClose, vec![name.into()])?;
        Ok(())
    }

    fn sql_execute(&mut self, sql: &str, params: Vec<TypedArg>) -> CallResult<i64> {
        let mut args = Vec::with_capacity(params.len() + 1);
        args.push(sql.into());
        args.extend(params);
        Ok(self.invoke(Opcode::SqlExecute, args)?.status)
    }

    fn set_return(&mut self, bytes: &[u8]) -> CallResult<()> {
        self.invoke(Opcode::SetReturn, vec![bytes.into()])?;
        Ok(())
    }

    fn append_return(&mut self, bytes: &[u8]) -> CallResult<()> {
        self.invoke(Opcode::AppendReturn, vec![bytes.into()])?;
        Ok(())
    }

    fn sub_render(&mut self, plugin: &str) -> CallResult<bool> {
        Ok(self.invoke(Opcode::SubRender, vec![plugin.into()])?.status == 1)
    }
}

impl<T: HostCalls + ?Sized> HostCallsExt for T {}

// ============================================================================
// Plugin side as seen by the host
// ============================================================================

/// A plugin that runs inside the host process.
pub trait PluginModule: Send {
    /// Identity used to match live-reload connections.
    fn identity(&self) -> &str;

    fn exports(&self) -> Vec<ExportSignature>;

    /// Run an export. Arguments have already been checked against the
    /// matching [`ExportSignature`].
    fn call(
        &mut self,
        host: &mut dyn HostCalls,
        function: &str,
        args: Vec<TypedArg>,
    ) -> CallResult<Option<TypedArg>>;
}

/// Renders another plugin into the current div.
pub trait SubRender {
    /// Returns false when `plugin` is unknown, already rendering, or failed.
    fn sub_render(&mut self, state: &mut HostState, caller: &str, plugin: &str) -> bool;
}

/// Sub-render target for hosts that run a single plugin.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSubRender;

impl SubRender for NoSubRender {
    fn sub_render(&mut self, _state: &mut HostState, _caller: &str, _plugin: &str) -> bool {
        false
    }
}

/// Everything an export call runs against.
pub struct HostContext<'a> {
    pub state: &'a mut HostState,
    /// Name of the plugin making requests.
    pub plugin: &'a str,
    pub sub: &'a mut dyn SubRender,
}

impl<'a> HostContext<'a> {
    pub fn new(state: &'a mut HostState, plugin: &'a str, sub: &'a mut dyn SubRender) -> Self {
        Self { state, plugin, sub }
    }

    /// Decode and serve one request.
    pub fn serve(&mut self, op: Opcode, args: Vec<TypedArg>) -> CallResult<Reply> {
        let request = HostRequest::decode(op, args, self.state.coercion)?;
        Ok(dispatch(self.state, self.plugin, request, &mut *self.sub))
    }

    /// Run `body` with fresh return buffers and collect them afterwards.
    pub fn scoped_call<F>(&mut self, body: F) -> CallResult<CallReturn>
    where
        F: FnOnce(&mut Self) -> CallResult<Option<TypedArg>>,
    {
        self.state.pending.push();
        let result = body(self);
        let mut ret = self.state.pending.pop();
        if let Some(primary) = result? {
            ret.primary = Some(primary);
        }
        Ok(ret)
    }
}

impl HostCalls for HostContext<'_> {
    fn invoke(&mut self, op: Opcode, args: Vec<TypedArg>) -> CallResult<Reply> {
        self.serve(op, args)
    }
}

/// One way of reaching a plugin.
pub trait PluginBackend {
    /// Short label for logs.
    fn kind(&self) -> &'static str;

    /// Call `function` with `args`. Requests the plugin issues meanwhile are
    /// served against `ctx`.
    fn call(
        &mut self,
        ctx: &mut HostContext<'_>,
        function: &str,
        args: Vec<TypedArg>,
    ) -> CallResult<CallReturn>;
}
