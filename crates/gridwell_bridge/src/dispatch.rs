//! Request dispatch
//!
//! Turns one decoded [`HostRequest`] into host work and a [`Reply`]. Nothing
//! here fails outward: misuse and collaborator failures become a status code
//! plus a plugin log entry, and rendering carries on.
//!
//! Units: positions and extents arrive in cells relative to the current div
//! (after its scroll offset). Border widths, line widths and font sizes are
//! pixels.

use gridwell_core::{wire, Color, GridRect, Rect, Size, TypedArg};
use gridwell_layout::{AnchorKind, Axis, DivFlags, PaintFrame, TouchFlags};
use gridwell_paint::{PaintBuffer, TextAlign};

use crate::backend::SubRender;
use crate::log::LogLevel;
use crate::request::{HostRequest, Reply};
use crate::state::{CropOverride, DragPayload, HostState};

/// Highest column/row index a plugin may declare.
pub const MAX_GRID_INDEX: i64 = 1024;

fn color(v: i64) -> Color {
    Color::from_rgba_u32(v as u32)
}

fn grid_index(index: i64) -> Option<usize> {
    (0..=MAX_GRID_INDEX).contains(&index).then_some(index as usize)
}

/// Clamp a div's grid rect so it starts and ends within `MAX_GRID_INDEX + 1`
/// cells. Returns the clamped rect and whether it was already in range.
fn bounded_grid(grid: GridRect) -> (GridRect, bool) {
    let g = grid.sanitized();
    let limit = MAX_GRID_INDEX + 1;
    let axis = |start: i32, len: i32| {
        let start = i64::from(start).min(MAX_GRID_INDEX);
        let len = i64::from(len).min(limit - start);
        (start as i32, len as i32)
    };
    let (x, w) = axis(g.x, g.w);
    let (y, h) = axis(g.y, g.h);
    let bounded = GridRect::new(x, y, w, h);
    (bounded, bounded == g)
}

/// Warn the plugin and answer with the failure sentinel.
fn fail(state: &mut HostState, plugin: &str, message: impl Into<String>) -> Reply {
    state.log.push(plugin, LogLevel::Warn, message);
    Reply::failed()
}

/// Run `draw` against the current level's buffer with the right crop set.
fn paint<F>(state: &mut HostState, draw: F) -> Reply
where
    F: FnOnce(&mut PaintBuffer, &PaintFrame),
{
    let level_index = state.current_level_index();
    let level = state.levels.current_mut();
    let frame = level.tree.paint_frame();
    let div = level.tree.current();
    let crop = match state.crop {
        Some(o) if o.level == level_index && o.div == div => o.rect,
        _ => frame.crop,
    };
    level.paint.set_crop(crop);
    draw(&mut level.paint, &frame);
    Reply::ok()
}

/// Serve one request from `plugin`.
pub fn dispatch(
    state: &mut HostState,
    plugin: &str,
    request: HostRequest,
    sub: &mut dyn SubRender,
) -> Reply {
    use HostRequest as R;

    match request {
        // ─────────────────────────────────────────────────────────────────────
        // Host info
        // ─────────────────────────────────────────────────────────────────────
        R::Log { level, text } => {
            state.log.push(plugin, LogLevel::from_i64(level), text);
            Reply::ok()
        }
        R::Time => Reply::value(state.elapsed()),
        R::WindowSize => {
            let window = state.levels.window();
            Reply::value(window.width).with(window.height)
        }
        R::Translate { key } => Reply::value(state.translations.get(&key)),
        R::ReadAsset { path } => match state.assets.read(&path) {
            Ok(bytes) => Reply::value(bytes),
            Err(e) => fail(state, plugin, e.to_string()),
        },
        R::CellSize => Reply::value(state.cell_px),

        // ─────────────────────────────────────────────────────────────────────
        // Storage
        // ─────────────────────────────────────────────────────────────────────
        R::SqlExecute { sql, params } => match state.storage.execute(&sql, &params) {
            Ok(n) => Reply::status(i64::try_from(n).unwrap_or(i64::MAX)),
            Err(e) => fail(state, plugin, e.to_string()),
        },
        R::SqlQuery { sql, params } => match state.storage.query(&sql, &params) {
            Ok(rows) => Reply {
                status: rows.len() as i64,
                values: rows
                    .iter()
                    .map(|row| TypedArg::Bytes(wire::encode_args(row)))
                    .collect(),
            },
            Err(e) => fail(state, plugin, e.to_string()),
        },
        R::SqlLastInsertId => Reply::value(state.storage.last_insert_id()),
        R::SqlChanges => Reply::value(i64::try_from(state.storage.changes()).unwrap_or(i64::MAX)),
        R::SqlLastError => Reply::value(state.storage.last_error()),

        // ─────────────────────────────────────────────────────────────────────
        // Div tree
        // ─────────────────────────────────────────────────────────────────────
        R::DivStart { name, grid } => {
            state.crop = None;
            // Out of range rects still open a div so the matching DivEnd
            // stays balanced.
            let (bounded, in_range) = bounded_grid(grid);
            let memory = &state.memory;
            state.levels.current_mut().div_start(&name, bounded, memory);
            if in_range {
                Reply::ok()
            } else {
                fail(
                    state,
                    plugin,
                    format!(
                        "div '{name}' grid {}x{}+{}+{} exceeds {MAX_GRID_INDEX} cells, clamped",
                        grid.w, grid.h, grid.x, grid.y
                    ),
                )
            }
        }
        R::DivEnd => {
            state.crop = None;
            match state.levels.current_mut().div_end() {
                Ok(()) => Reply::ok(),
                Err(e) => fail(state, plugin, e.to_string()),
            }
        }
        R::DivCol {
            index,
            min,
            max,
            resize,
        } => set_grid(state, plugin, Axis::X, index, min, max, &resize),
        R::DivRow {
            index,
            min,
            max,
            resize,
        } => set_grid(state, plugin, Axis::Y, index, min, max, &resize),
        R::DivInfo => {
            let (canvas, crop) = state.levels.current_mut().tree.info();
            Reply::from_values(
                canvas
                    .to_pixels()
                    .into_iter()
                    .chain(crop.to_pixels())
                    .map(TypedArg::Int64),
            )
        }
        R::ScrollInfo => {
            let s = state.levels.current_mut().tree.scroll_info();
            Reply::value(s.offset[0])
                .with(s.offset[1])
                .with(s.content[0])
                .with(s.content[1])
                .with(s.view[0])
                .with(s.view[1])
        }
        R::SetScroll { x, y } => {
            state.levels.current_mut().tree.set_scroll(x, y);
            Reply::ok()
        }
        R::DivInput => Reply::value(i64::from(state.levels.current().tree.touch().bits())),
        R::DivEnable { flags } => {
            let flags = DivFlags::from_bits_truncate(flags as u32);
            match state.levels.current_mut().tree.enable(flags) {
                Ok(()) => Reply::ok(),
                Err(e) => fail(state, plugin, e.to_string()),
            }
        }
        R::GridInfo { axis, index } => {
            let (Some(axis), Some(index)) = (Axis::from_i64(axis), grid_index(index)) else {
                return fail(state, plugin, format!("invalid grid query ({axis}, {index})"));
            };
            let px = state.levels.current_mut().tree.grid_output(axis, index);
            Reply::value(i64::from(px))
        }

        // ─────────────────────────────────────────────────────────────────────
        // Dialogs
        // ─────────────────────────────────────────────────────────────────────
        R::DialogOpen { name, anchor, size } => {
            let opened = state
                .levels
                .open(&name, AnchorKind::from_i64(anchor), Size::new(size.0, size.1));
            Reply::flag(opened)
        }
        R::DialogStart { name } => {
            state.crop = None;
            Reply::flag(state.levels.start(&name))
        }
        R::DialogEnd => {
            state.crop = None;
            match state.levels.end() {
                Ok(()) => Reply::ok(),
                Err(e) => fail(state, plugin, e.to_string()),
            }
        }
        R::DialogClose { name } => {
            if name.is_empty() {
                state.levels.close_all(&mut state.memory);
            } else if let Err(e) = state.levels.close(&name, &mut state.memory) {
                tracing::debug!(plugin, error = %e, "close ignored");
            }
            Reply::ok()
        }

        // ─────────────────────────────────────────────────────────────────────
        // Paint
        // ─────────────────────────────────────────────────────────────────────
        R::PaintRect {
            rect,
            color: c,
            border,
        } => paint(state, |buf, frame| {
            buf.stroke_rect(frame.rect(rect), color(c), border.max(0.0))
        }),
        R::PaintLine {
            from,
            to,
            color: c,
            width,
        } => paint(state, |buf, frame| {
            buf.line(frame.point(from), frame.point(to), color(c), width.max(0.0))
        }),
        R::PaintCircle {
            center,
            radius,
            color: c,
            border,
        } => paint(state, |buf, frame| {
            buf.circle(
                frame.point(center),
                frame.length(radius.max(0.0)),
                color(c),
                border.max(0.0),
            )
        }),
        R::PaintImage { rect, path, tint } => paint(state, |buf, frame| {
            buf.image(path, frame.rect(rect), color(tint))
        }),
        R::PaintText {
            rect,
            text,
            color: c,
            size,
            align,
        } => paint(state, |buf, frame| {
            buf.text(
                text,
                frame.rect(rect),
                color(c),
                size.max(0.0),
                TextAlign::from_i64(align),
            )
        }),
        R::PaintCrop { rect } => {
            let level = state.current_level_index();
            let tree = &mut state.levels.current_mut().tree;
            let frame = tree.paint_frame();
            state.crop = Some(CropOverride {
                level,
                div: tree.current(),
                rect: frame.rect(rect).intersection(&frame.crop),
            });
            Reply::ok()
        }
        R::TextWidth { text, size } => Reply::value(state.metrics.text_width(&text, size)),
        R::TextCells { text, size } => {
            let px = state.metrics.text_width(&text, size);
            Reply::value(px / state.levels.cell_px().max(f32::EPSILON))
        }

        // ─────────────────────────────────────────────────────────────────────
        // Return buffers
        // ─────────────────────────────────────────────────────────────────────
        R::SetReturn { bytes } => {
            state.pending.set(bytes);
            Reply::ok()
        }
        R::AppendReturn { bytes } => {
            state.pending.append(&bytes);
            Reply::ok()
        }
        R::ClearReturn => {
            state.pending.clear();
            Reply::ok()
        }

        // ─────────────────────────────────────────────────────────────────────
        // Drag and drop
        // ─────────────────────────────────────────────────────────────────────
        R::DragSource { payload } => {
            let dragging = state
                .levels
                .current()
                .tree
                .touch()
                .contains(TouchFlags::DOWN);
            if dragging {
                state.drag = Some(DragPayload {
                    plugin: plugin.to_owned(),
                    bytes: payload,
                });
            }
            Reply::flag(dragging)
        }
        R::DropTarget => {
            let over = state
                .levels
                .current()
                .tree
                .touch()
                .contains(TouchFlags::HOVER);
            if over && state.input.released {
                if let Some(drag) = state.drag.take() {
                    tracing::debug!(from = %drag.plugin, to = plugin, "drop");
                    return Reply::flag(true).with(drag.bytes);
                }
            }
            Reply::flag(false)
        }

        // ─────────────────────────────────────────────────────────────────────
        // Composition
        // ─────────────────────────────────────────────────────────────────────
        R::SubRender { plugin: target } => {
            state.crop = None;
            let rendered = sub.sub_render(state, plugin, &target);
            state.crop = None;
            Reply::flag(rendered)
        }
        R::RenderDone { value } => {
            state.pending.set_primary(value);
            Reply::ok()
        }
    }
}

fn set_grid(
    state: &mut HostState,
    plugin: &str,
    axis: Axis,
    index: i64,
    min: f32,
    max: f32,
    resize: &str,
) -> Reply {
    let Some(index) = grid_index(index) else {
        return fail(state, plugin, format!("grid index {index} out of range"));
    };
    let resize = (!resize.is_empty()).then_some(resize);
    let memory = &state.memory;
    match state
        .levels
        .current_mut()
        .tree
        .set_grid(axis, index, min, max, resize, memory)
    {
        Ok(()) => Reply::ok(),
        Err(e) => fail(state, plugin, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoSubRender;
    use crate::storage::tests::ScriptedEngine;
    use gridwell_core::{GridRect, Point};
    use gridwell_layout::InputEvent;
    use gridwell_paint::PaintCommand;

    fn run(state: &mut HostState, req: HostRequest) -> Reply {
        dispatch(state, "demo", req, &mut NoSubRender)
    }

    fn start(state: &mut HostState, name: &str, x: i32) -> Reply {
        run(
            state,
            HostRequest::DivStart {
                name: name.into(),
                grid: GridRect::new(x, 0, 1, 1),
            },
        )
    }

    fn state() -> HostState {
        HostState::new(Size::new(200.0, 100.0), 20.0)
    }

    #[test]
    fn test_div_info_in_pixels() {
        let mut s = state();
        s.begin_tick();
        start(&mut s, "a", 1);
        let reply = run(&mut s, HostRequest::DivInfo);
        let px: Vec<i64> = reply.values.iter().filter_map(TypedArg::as_i64).collect();
        assert_eq!(px, [20, 0, 20, 20, 20, 0, 20, 20]);
        run(&mut s, HostRequest::DivEnd);
        s.end_tick("demo");
        assert!(s.log.is_empty());
    }

    #[test]
    fn test_grid_lock_is_logged_and_ignored() {
        let mut s = state();
        s.begin_tick();
        start(&mut s, "child", 0);
        run(&mut s, HostRequest::DivEnd);
        let reply = run(
            &mut s,
            HostRequest::DivCol {
                index: 0,
                min: 2.0,
                max: 0.0,
                resize: String::new(),
            },
        );
        assert!(reply.is_failed());
        assert_eq!(s.log.last().unwrap().level, LogLevel::Warn);

        let reply = run(
            &mut s,
            HostRequest::GridInfo {
                axis: 0,
                index: 0,
            },
        );
        assert_eq!(reply.values[0], TypedArg::Int64(20));
        s.end_tick("demo");
    }

    #[test]
    fn test_out_of_range_grid_is_clamped_and_reported() {
        for x in [i32::MAX, 500_000_000] {
            let mut s = state();
            s.begin_tick();
            assert!(start(&mut s, "far", x).is_failed());
            assert_eq!(s.log.last().unwrap().level, LogLevel::Warn);
            let reply = run(&mut s, HostRequest::DivInfo);
            assert_eq!(reply.values[0], TypedArg::Int64(MAX_GRID_INDEX * 20));
            assert!(!run(&mut s, HostRequest::DivEnd).is_failed());
            s.end_tick("demo");
            assert_eq!(s.log.len(), 1);
        }

        let mut s = state();
        s.begin_tick();
        let wide = run(
            &mut s,
            HostRequest::DivStart {
                name: "wide".into(),
                grid: GridRect::new(0, 0, i32::MAX, 1),
            },
        );
        assert!(wide.is_failed());
        run(&mut s, HostRequest::DivEnd);
        assert!(!start(&mut s, "edge", MAX_GRID_INDEX as i32).is_failed());
        run(&mut s, HostRequest::DivEnd);
        s.end_tick("demo");
        assert_eq!(s.log.len(), 1);
    }

    #[test]
    fn test_unbalanced_end_fails() {
        let mut s = state();
        s.begin_tick();
        assert!(run(&mut s, HostRequest::DivEnd).is_failed());
        assert!(run(&mut s, HostRequest::DialogEnd).is_failed());
        s.end_tick("demo");
        assert_eq!(s.log.len(), 2);
    }

    #[test]
    fn test_paint_rect_maps_cells_and_crops() {
        let mut s = state();
        s.begin_tick();
        start(&mut s, "a", 1);
        run(
            &mut s,
            HostRequest::PaintRect {
                rect: Rect::new(0.0, 0.0, 0.5, 0.5),
                color: 0xff0000ff,
                border: 0.0,
            },
        );
        let cmds = s.levels.current().paint.commands().to_vec();
        assert_eq!(
            cmds,
            vec![
                PaintCommand::Crop(Rect::new(20.0, 0.0, 20.0, 20.0)),
                PaintCommand::Rect {
                    rect: Rect::new(20.0, 0.0, 10.0, 10.0),
                    color: Color::from_rgba_u32(0xff0000ff),
                    border: 0.0,
                },
            ]
        );

        run(
            &mut s,
            HostRequest::PaintCrop {
                rect: Rect::new(0.0, 0.0, 0.25, 1.0),
            },
        );
        run(
            &mut s,
            HostRequest::PaintLine {
                from: Point::ZERO,
                to: Point::new(1.0, 1.0),
                color: 0,
                width: 1.0,
            },
        );
        assert_eq!(
            s.levels.current().paint.crop(),
            Some(Rect::new(20.0, 0.0, 5.0, 20.0))
        );
        run(&mut s, HostRequest::DivEnd);
        s.end_tick("demo");
    }

    #[test]
    fn test_storage_failures_become_sentinels() {
        let mut s = state();
        let reply = run(
            &mut s,
            HostRequest::SqlExecute {
                sql: "insert".into(),
                params: vec![],
            },
        );
        assert!(reply.is_failed());
        let reply = run(&mut s, HostRequest::SqlLastError);
        assert_eq!(reply.values[0].as_str(), Some("storage is not available"));
        assert_eq!(s.log.len(), 1);
    }

    #[test]
    fn test_query_rows_are_encoded() {
        let mut s = state().with_storage(Box::new(ScriptedEngine {
            rows: vec![vec![TypedArg::Int64(1), TypedArg::text("a")]],
            ..Default::default()
        }));
        let reply = run(
            &mut s,
            HostRequest::SqlQuery {
                sql: "select".into(),
                params: vec![],
            },
        );
        assert_eq!(reply.status, 1);
        let row = wire::decode_args(reply.values[0].as_bytes().unwrap()).unwrap();
        assert_eq!(row, vec![TypedArg::Int64(1), TypedArg::text("a")]);
    }

    #[test]
    fn test_translate_and_text_measure() {
        let mut s = state();
        s.translations.insert("hi", "hallo");
        let reply = run(&mut s, HostRequest::Translate { key: "hi".into() });
        assert_eq!(reply.values[0].as_str(), Some("hallo"));

        s.begin_tick();
        let reply = run(
            &mut s,
            HostRequest::TextCells {
                text: "abcd".into(),
                size: 10.0,
            },
        );
        let cells = reply.values[0].as_f32().unwrap();
        assert!((cells - 1.2).abs() < 1e-5);
        s.end_tick("demo");
    }

    #[test]
    fn test_return_buffers() {
        let mut s = state();
        s.pending.push();
        run(&mut s, HostRequest::SetReturn { bytes: b"ab".to_vec() });
        run(&mut s, HostRequest::AppendReturn { bytes: b"c".to_vec() });
        run(
            &mut s,
            HostRequest::RenderDone {
                value: Some(TypedArg::Int64(1)),
            },
        );
        let ret = s.pending.pop();
        assert_eq!(ret.secondary, b"abc");
        assert!(ret.handled());
    }

    #[test]
    fn test_dialog_flow() {
        let mut s = state();
        s.begin_tick();
        let open = |s: &mut HostState| {
            run(
                s,
                HostRequest::DialogOpen {
                    name: "menu".into(),
                    anchor: 0,
                    size: (4.0, 2.0),
                },
            )
        };
        assert_eq!(open(&mut s).status, 1);
        assert_eq!(open(&mut s).status, 0);
        assert_eq!(
            run(&mut s, HostRequest::DialogStart { name: "menu".into() }).status,
            1
        );
        assert!(!run(&mut s, HostRequest::DialogEnd).is_failed());
        s.end_tick("demo");
        assert_eq!(s.levels.len(), 2);

        s.begin_tick();
        run(&mut s, HostRequest::DialogClose { name: String::new() });
        s.end_tick("demo");
        assert_eq!(s.levels.len(), 1);
    }

    fn tick(s: &mut HostState, events: &[InputEvent], body: impl FnOnce(&mut HostState)) {
        for &e in events {
            s.push_input(e);
        }
        s.begin_tick();
        body(s);
        s.end_tick("demo");
    }

    fn touch_div(s: &mut HostState, name: &str, x: i32) {
        start(s, name, x);
        run(
            s,
            HostRequest::DivEnable {
                flags: DivFlags::TOUCH.bits() as i64,
            },
        );
    }

    #[test]
    fn test_drag_and_drop() {
        let mut s = state();
        let layout = |s: &mut HostState| {
            touch_div(s, "src", 0);
            run(s, HostRequest::DivEnd);
            touch_div(s, "dst", 1);
            run(s, HostRequest::DivEnd);
        };
        tick(&mut s, &[], layout);

        tick(
            &mut s,
            &[
                InputEvent::PointerMove(Point::new(5.0, 5.0)),
                InputEvent::PointerDown,
            ],
            |s| {
                touch_div(s, "src", 0);
                let r = run(
                    s,
                    HostRequest::DragSource {
                        payload: b"item".to_vec(),
                    },
                );
                assert_eq!(r.status, 1);
                run(s, HostRequest::DivEnd);
                touch_div(s, "dst", 1);
                assert_eq!(run(s, HostRequest::DropTarget).status, 0);
                run(s, HostRequest::DivEnd);
            },
        );
        assert!(s.drag.is_some());

        tick(
            &mut s,
            &[
                InputEvent::PointerMove(Point::new(25.0, 5.0)),
                InputEvent::PointerUp,
            ],
            |s| {
                touch_div(s, "src", 0);
                assert_eq!(
                    run(s, HostRequest::DragSource { payload: vec![] }).status,
                    0
                );
                run(s, HostRequest::DivEnd);
                touch_div(s, "dst", 1);
                let r = run(s, HostRequest::DropTarget);
                assert_eq!(r.status, 1);
                assert_eq!(r.values[0].as_bytes(), Some(&b"item"[..]));
                run(s, HostRequest::DivEnd);
            },
        );
        assert!(s.drag.is_none());
    }

    struct Recorder(Vec<(String, String)>);

    impl SubRender for Recorder {
        fn sub_render(&mut self, _state: &mut HostState, caller: &str, plugin: &str) -> bool {
            self.0.push((caller.to_owned(), plugin.to_owned()));
            plugin == "clock"
        }
    }

    #[test]
    fn test_sub_render_reports_result() {
        let mut s = state();
        let mut rec = Recorder(Vec::new());
        let reply = dispatch(
            &mut s,
            "shell",
            HostRequest::SubRender {
                plugin: "clock".into(),
            },
            &mut rec,
        );
        assert_eq!(reply.status, 1);
        let reply = dispatch(
            &mut s,
            "shell",
            HostRequest::SubRender {
                plugin: "nope".into(),
            },
            &mut rec,
        );
        assert_eq!(reply.status, 0);
        assert_eq!(rec.0[0], ("shell".to_owned(), "clock".to_owned()));
    }
}
