//! Request decoding and replies
//!
//! A request is an opcode plus a flat argument list. [`HostRequest::decode`]
//! checks the count and types of the arguments for that opcode (applying
//! the configured [`Coercion`]) and produces a typed request for dispatch.

use std::io::{Read, Write};
use std::vec;

use gridwell_core::wire;
use gridwell_core::{ArgType, Coercion, GridRect, Point, Rect, TypedArg, ValueError, WireResult};
use smallvec::SmallVec;

use crate::error::ProtocolError;
use crate::opcode::Opcode;

// ============================================================================
// Argument reader
// ============================================================================

/// Positional reader over one request's arguments.
pub struct ArgReader {
    op: Opcode,
    args: vec::IntoIter<TypedArg>,
    total: usize,
    index: usize,
    policy: Coercion,
}

impl ArgReader {
    pub fn new(op: Opcode, args: Vec<TypedArg>, policy: Coercion) -> Self {
        Self {
            op,
            total: args.len(),
            args: args.into_iter(),
            index: 0,
            policy,
        }
    }

    fn next(&mut self, expected: ArgType) -> Result<TypedArg, ProtocolError> {
        let arg = self.args.next().ok_or(ProtocolError::ArgCount {
            op: self.op,
            expected: self.index + 1,
            actual: self.total,
        })?;
        let index = self.index;
        self.index += 1;
        arg.coerce(expected, self.policy)
            .map_err(|source| ProtocolError::ArgType {
                op: self.op,
                index,
                source,
            })
    }

    pub fn i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(self.next(ArgType::Int64)?.as_i64().unwrap_or_default())
    }

    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        let v = self.i64()?;
        Ok(v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    pub fn f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(self.next(ArgType::Float32)?.as_f32().unwrap_or_default())
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.next(ArgType::Bytes)?.into_bytes().unwrap_or_default())
    }

    pub fn text(&mut self) -> Result<String, ProtocolError> {
        let index = self.index;
        let bytes = self.bytes()?;
        String::from_utf8(bytes).map_err(|_| ProtocolError::ArgType {
            op: self.op,
            index,
            source: ValueError::InvalidUtf8,
        })
    }

    /// Four f32 cells `x, y, w, h`.
    pub fn rect(&mut self) -> Result<Rect, ProtocolError> {
        Ok(Rect::new(self.f32()?, self.f32()?, self.f32()?, self.f32()?))
    }

    pub fn point(&mut self) -> Result<Point, ProtocolError> {
        Ok(Point::new(self.f32()?, self.f32()?))
    }

    /// Remaining arguments, untouched.
    pub fn rest(&mut self) -> Vec<TypedArg> {
        self.index = self.total;
        self.args.by_ref().collect()
    }

    /// Fail if arguments are left over.
    pub fn finish(self) -> Result<(), ProtocolError> {
        if self.index < self.total {
            return Err(ProtocolError::ArgCount {
                op: self.op,
                expected: self.index,
                actual: self.total,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Typed requests
// ============================================================================

/// A decoded host request.
#[derive(Clone, Debug, PartialEq)]
pub enum HostRequest {
    Log { level: i64, text: String },
    Time,
    WindowSize,
    Translate { key: String },
    ReadAsset { path: String },
    CellSize,

    SqlExecute { sql: String, params: Vec<TypedArg> },
    SqlQuery { sql: String, params: Vec<TypedArg> },
    SqlLastInsertId,
    SqlChanges,
    SqlLastError,

    DivStart { name: String, grid: GridRect },
    DivEnd,
    DivCol { index: i64, min: f32, max: f32, resize: String },
    DivRow { index: i64, min: f32, max: f32, resize: String },
    DivInfo,
    ScrollInfo,
    SetScroll { x: f32, y: f32 },
    DivInput,
    DivEnable { flags: i64 },
    GridInfo { axis: i64, index: i64 },

    DialogOpen { name: String, anchor: i64, size: (f32, f32) },
    DialogStart { name: String },
    DialogEnd,
    DialogClose { name: String },

    PaintRect { rect: Rect, color: i64, border: f32 },
    PaintLine { from: Point, to: Point, color: i64, width: f32 },
    PaintCircle { center: Point, radius: f32, color: i64, border: f32 },
    PaintImage { rect: Rect, path: String, tint: i64 },
    PaintText { rect: Rect, text: String, color: i64, size: f32, align: i64 },
    PaintCrop { rect: Rect },
    TextWidth { text: String, size: f32 },
    TextCells { text: String, size: f32 },

    SetReturn { bytes: Vec<u8> },
    AppendReturn { bytes: Vec<u8> },
    ClearReturn,

    DragSource { payload: Vec<u8> },
    DropTarget,

    SubRender { plugin: String },

    /// Primary return of the finished call, if any.
    RenderDone { value: Option<TypedArg> },
}

impl HostRequest {
    /// Decode `args` for `op`, enforcing the argument table.
    pub fn decode(
        op: Opcode,
        args: Vec<TypedArg>,
        policy: Coercion,
    ) -> Result<HostRequest, ProtocolError> {
        use HostRequest as R;

        if op == Opcode::RenderDone {
            if args.len() > 1 {
                return Err(ProtocolError::ArgCount {
                    op,
                    expected: 1,
                    actual: args.len(),
                });
            }
            return Ok(R::RenderDone {
                value: args.into_iter().next(),
            });
        }

        let mut r = ArgReader::new(op, args, policy);
        let req = match op {
            Opcode::Log => R::Log {
                level: r.i64()?,
                text: r.text()?,
            },
            Opcode::Time => R::Time,
            Opcode::WindowSize => R::WindowSize,
            Opcode::Translate => R::Translate { key: r.text()? },
            Opcode::ReadAsset => R::ReadAsset { path: r.text()? },
            Opcode::CellSize => R::CellSize,

            Opcode::SqlExecute => R::SqlExecute {
                sql: r.text()?,
                params: r.rest(),
            },
            Opcode::SqlQuery => R::SqlQuery {
                sql: r.text()?,
                params: r.rest(),
            },
            Opcode::SqlLastInsertId => R::SqlLastInsertId,
            Opcode::SqlChanges => R::SqlChanges,
            Opcode::SqlLastError => R::SqlLastError,

            Opcode::DivStart => R::DivStart {
                name: r.text()?,
                grid: GridRect::new(r.i32()?, r.i32()?, r.i32()?, r.i32()?),
            },
            Opcode::DivEnd => R::DivEnd,
            Opcode::DivCol => R::DivCol {
                index: r.i64()?,
                min: r.f32()?,
                max: r.f32()?,
                resize: r.text()?,
            },
            Opcode::DivRow => R::DivRow {
                index: r.i64()?,
                min: r.f32()?,
                max: r.f32()?,
                resize: r.text()?,
            },
            Opcode::DivInfo => R::DivInfo,
            Opcode::ScrollInfo => R::ScrollInfo,
            Opcode::SetScroll => R::SetScroll {
                x: r.f32()?,
                y: r.f32()?,
            },
            Opcode::DivInput => R::DivInput,
            Opcode::DivEnable => R::DivEnable { flags: r.i64()? },
            Opcode::GridInfo => R::GridInfo {
                axis: r.i64()?,
                index: r.i64()?,
            },

            Opcode::DialogOpen => R::DialogOpen {
                name: r.text()?,
                anchor: r.i64()?,
                size: (r.f32()?, r.f32()?),
            },
            Opcode::DialogStart => R::DialogStart { name: r.text()? },
            Opcode::DialogEnd => R::DialogEnd,
            Opcode::DialogClose => R::DialogClose { name: r.text()? },

            Opcode::PaintRect => R::PaintRect {
                rect: r.rect()?,
                color: r.i64()?,
                border: r.f32()?,
            },
            Opcode::PaintLine => R::PaintLine {
                from: r.point()?,
                to: r.point()?,
                color: r.i64()?,
                width: r.f32()?,
            },
            Opcode::PaintCircle => R::PaintCircle {
                center: r.point()?,
                radius: r.f32()?,
                color: r.i64()?,
                border: r.f32()?,
            },
            Opcode::PaintImage => R::PaintImage {
                rect: r.rect()?,
                path: r.text()?,
                tint: r.i64()?,
            },
            Opcode::PaintText => R::PaintText {
                rect: r.rect()?,
                text: r.text()?,
                color: r.i64()?,
                size: r.f32()?,
                align: r.i64()?,
            },
            Opcode::PaintCrop => R::PaintCrop { rect: r.rect()? },
            Opcode::TextWidth => R::TextWidth {
                text: r.text()?,
                size: r.f32()?,
            },
            Opcode::TextCells => R::TextCells {
                text: r.text()?,
                size: r.f32()?,
            },

            Opcode::SetReturn => R::SetReturn { bytes: r.bytes()? },
            Opcode::AppendReturn => R::AppendReturn { bytes: r.bytes()? },
            Opcode::ClearReturn => R::ClearReturn,

            Opcode::DragSource => R::DragSource {
                payload: r.bytes()?,
            },
            Opcode::DropTarget => R::DropTarget,

            Opcode::SubRender => R::SubRender { plugin: r.text()? },

            Opcode::RenderDone => R::RenderDone { value: None },
        };
        r.finish()?;
        Ok(req)
    }
}

// ============================================================================
// Replies
// ============================================================================

/// Status returned for failed operations.
pub const STATUS_FAILED: i64 = -1;

/// Host answer to one request: a status plus zero or more values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reply {
    /// `0` ok, `1`/`0` for yes/no answers, counts, or [`STATUS_FAILED`].
    pub status: i64,
    pub values: SmallVec<[TypedArg; 4]>,
}

impl Reply {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn status(status: i64) -> Self {
        Self {
            status,
            values: SmallVec::new(),
        }
    }

    pub fn flag(b: bool) -> Self {
        Self::status(b as i64)
    }

    pub fn failed() -> Self {
        Self::status(STATUS_FAILED)
    }

    pub fn value(v: impl Into<TypedArg>) -> Self {
        let mut reply = Self::ok();
        reply.values.push(v.into());
        reply
    }

    pub fn from_values(values: impl IntoIterator<Item = TypedArg>) -> Self {
        Self {
            status: 0,
            values: values.into_iter().collect(),
        }
    }

    pub fn with(mut self, v: impl Into<TypedArg>) -> Self {
        self.values.push(v.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> WireResult<()> {
        wire::write_i64(w, self.status)?;
        wire::write_args(w, &self.values)
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> WireResult<Self> {
        let status = wire::read_i64(r)?;
        let values = wire::read_args(r)?;
        Ok(Self {
            status,
            values: values.into(),
        })
    }
}
