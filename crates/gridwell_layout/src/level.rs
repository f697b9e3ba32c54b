//! Dialog levels
//!
//! The base screen and every open dialog are levels, each with its own div
//! tree and paint buffer. Levels form a stack: only the top one receives
//! input, the ones below keep rendering and are flushed dimmed.
//!
//! A dialog lives as long as the plugin keeps starting it. Each tick the
//! stack is cut at the first dialog that was not started, and everything
//! above it goes with it.

use gridwell_core::{Color, GridRect, Rect, Size};
use gridwell_paint::{FrameLayer, PaintBackend, PaintBuffer, PaintCommand};

use crate::div::DivTree;
use crate::error::UsageError;
use crate::input::FrameInput;
use crate::memory::LayoutMemory;

/// Dim overlay painted over levels below the top.
pub const DIM_COLOR: Color = Color::rgba(0.0, 0.0, 0.0, 0.4);

const SCROLL_TRACK: Color = Color::rgba(0.5, 0.5, 0.5, 0.25);
const SCROLL_THUMB: Color = Color::rgba(0.5, 0.5, 0.5, 0.8);

/// Where a dialog is placed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Anchor {
    Centered,
    /// Below the rect, or above it when there is no room below.
    Relative(Rect),
}

/// How the plugin asked for the dialog to be anchored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnchorKind {
    #[default]
    Centered,
    /// Beside the last child drawn in the current div.
    Relative,
}

impl AnchorKind {
    pub fn from_i64(v: i64) -> Self {
        if v == 1 {
            AnchorKind::Relative
        } else {
            AnchorKind::Centered
        }
    }
}

/// One layer of the screen.
#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub tree: DivTree,
    pub paint: PaintBuffer,
    pub anchor: Anchor,
    /// Requested size in cells (unused for the base level).
    pub size_cells: Size,
    rect: Rect,
    used: bool,
    rendering: bool,
    closed: bool,
}

impl Level {
    fn new(name: &str, anchor: Anchor, size_cells: Size) -> Self {
        Self {
            name: name.to_owned(),
            tree: DivTree::new(name),
            paint: PaintBuffer::new(),
            anchor,
            size_cells,
            rect: Rect::ZERO,
            used: false,
            rendering: false,
            closed: false,
        }
    }

    /// Screen rect as of the last time the level began a frame.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    fn place(&self, window: Size, cell_px: f32) -> Rect {
        let w = (self.size_cells.width * cell_px).clamp(0.0, window.width);
        let h = (self.size_cells.height * cell_px).clamp(0.0, window.height);
        let (x, y) = match self.anchor {
            Anchor::Centered => ((window.width - w) / 2.0, (window.height - h) / 2.0),
            Anchor::Relative(src) => {
                let mut y = src.bottom();
                if y + h > window.height && src.y() - h >= 0.0 {
                    y = src.y() - h;
                }
                (src.x(), y)
            }
        };
        Rect::new(
            x.clamp(0.0, window.width - w),
            y.clamp(0.0, window.height - h),
            w,
            h,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Div operations that also paint
    // ─────────────────────────────────────────────────────────────────────────

    pub fn div_start(&mut self, name: &str, grid: GridRect, memory: &LayoutMemory) {
        self.tree.start(name, grid, memory);
    }

    /// Close the current div and paint its scrollbars over its children.
    pub fn div_end(&mut self) -> Result<(), UsageError> {
        let id = self.tree.end()?;
        let bars = self.tree.scrollbars(id);
        if !bars.is_empty() {
            if let Some(frame) = self.tree.node(id).map(|n| n.frame) {
                self.paint.set_crop(frame);
            }
            for (track, thumb) in bars {
                self.paint.fill_rect(track, SCROLL_TRACK);
                self.paint.fill_rect(thumb, SCROLL_THUMB);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Level Stack
// ============================================================================

/// Base level plus open dialogs, bottom to top.
#[derive(Debug)]
pub struct LevelStack {
    levels: Vec<Level>,
    /// Levels currently being rendered; the last one receives div calls.
    targets: Vec<usize>,
    window: Size,
    cell_px: f32,
    input: FrameInput,
}

impl LevelStack {
    pub fn new(base_name: &str) -> Self {
        let mut base = Level::new(base_name, Anchor::Centered, Size::ZERO);
        base.used = true;
        Self {
            levels: vec![base],
            targets: vec![0],
            window: Size::ZERO,
            cell_px: 1.0,
            input: FrameInput::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn top(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    pub fn window(&self) -> Size {
        self.window
    }

    pub fn cell_px(&self) -> f32 {
        self.cell_px
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.name == name)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.index_of(name)
            .is_some_and(|i| i > 0 && !self.levels[i].closed)
    }

    /// Level receiving div and paint calls.
    pub fn current(&self) -> &Level {
        let i = self.targets.last().copied().unwrap_or(0);
        &self.levels[i]
    }

    pub fn current_mut(&mut self) -> &mut Level {
        let i = self.targets.last().copied().unwrap_or(0);
        &mut self.levels[i]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tick
    // ─────────────────────────────────────────────────────────────────────────

    /// Handle dismissal input and start the base level's frame.
    ///
    /// Escape closes the top dialog; a press outside it closes it too and is
    /// consumed so the level underneath does not react to it.
    pub fn begin_tick(
        &mut self,
        window: Size,
        cell_px: f32,
        input: &mut FrameInput,
        memory: &mut LayoutMemory,
    ) {
        self.window = Size::new(window.width.max(0.0), window.height.max(0.0));
        self.cell_px = cell_px;

        let top = self.levels.len() - 1;
        if top > 0 {
            if input.escape {
                tracing::debug!(dialog = %self.levels[top].name, "escape closed dialog");
                self.truncate(top, memory);
                input.escape = false;
            } else if input.pressed && !self.levels[top].rect.contains(input.pointer) {
                tracing::debug!(dialog = %self.levels[top].name, "press outside closed dialog");
                self.truncate(top, memory);
                input.consume_press();
            }
        }
        self.input = *input;

        for level in &mut self.levels {
            level.used = false;
            level.rendering = false;
        }
        self.targets.clear();
        self.targets.push(0);
        self.begin_level(0);
    }

    fn begin_level(&mut self, index: usize) {
        let active = index == self.levels.len() - 1;
        let rect = if index == 0 {
            self.window.to_rect()
        } else {
            self.levels[index].place(self.window, self.cell_px)
        };
        let level = &mut self.levels[index];
        level.rect = rect;
        level.used = true;
        level.rendering = true;
        level.paint.clear();
        level.tree.begin_frame(rect, self.cell_px, &self.input, active);
    }

    /// Push a dialog. Returns false when one with that name is already open.
    pub fn open(&mut self, name: &str, anchor: AnchorKind, size_cells: Size) -> bool {
        if self.index_of(name).is_some() {
            return false;
        }
        let anchor = match anchor {
            AnchorKind::Centered => Anchor::Centered,
            AnchorKind::Relative => Anchor::Relative(self.current().tree.anchor_rect()),
        };
        tracing::debug!(dialog = name, ?anchor, "dialog opened");
        let mut level = Level::new(name, anchor, size_cells);
        // Counts as requested for the tick it was opened in.
        level.used = true;
        self.levels.push(level);
        true
    }

    /// Make a dialog the render target. Returns false when it is not open.
    pub fn start(&mut self, name: &str) -> bool {
        let Some(index) = self.index_of(name).filter(|&i| i > 0) else {
            return false;
        };
        if self.levels[index].closed {
            return false;
        }
        if !self.levels[index].rendering {
            self.begin_level(index);
        }
        self.targets.push(index);
        true
    }

    /// Return to the previous render target.
    pub fn end(&mut self) -> Result<(), UsageError> {
        if self.targets.len() <= 1 {
            return Err(UsageError::UnbalancedDialogEnd);
        }
        let Some(index) = self.targets.pop() else {
            return Err(UsageError::UnbalancedDialogEnd);
        };
        self.levels[index].tree.finish_frame()
    }

    /// Close a dialog and everything above it.
    pub fn close(&mut self, name: &str, memory: &mut LayoutMemory) -> Result<(), UsageError> {
        match self.index_of(name).filter(|&i| i > 0) {
            Some(index) => {
                self.close_from(index, memory);
                Ok(())
            }
            None => Err(UsageError::UnknownDialog(name.to_owned())),
        }
    }

    /// Close every dialog, leaving only the base level.
    pub fn close_all(&mut self, memory: &mut LayoutMemory) {
        if self.levels.len() > 1 {
            self.close_from(1, memory);
        }
    }

    /// Levels being rendered right now are only marked; they are removed at
    /// the end of the tick so their open start/end pairs stay balanced.
    fn close_from(&mut self, index: usize, memory: &mut LayoutMemory) {
        if self.targets.iter().any(|&t| t >= index) {
            for level in &mut self.levels[index..] {
                level.closed = true;
            }
        } else {
            self.truncate(index, memory);
        }
    }

    fn truncate(&mut self, index: usize, memory: &mut LayoutMemory) {
        if index == 0 || index >= self.levels.len() {
            return;
        }
        for level in &self.levels[index..] {
            level.tree.flush(memory);
        }
        self.levels.truncate(index);
        self.targets.retain(|&t| t < index);
    }

    /// Check nesting, drop dialogs that were not started or were closed, and
    /// sweep every remaining tree.
    pub fn end_tick(&mut self, memory: &mut LayoutMemory) -> Vec<UsageError> {
        let mut errors = Vec::new();

        let open = self.targets.len().saturating_sub(1);
        if open > 0 {
            errors.push(UsageError::UnclosedDialogs(open));
            while self.targets.len() > 1 {
                if let Some(index) = self.targets.pop() {
                    if let Err(e) = self.levels[index].tree.finish_frame() {
                        errors.push(e);
                    }
                }
            }
        }
        if let Err(e) = self.levels[0].tree.finish_frame() {
            errors.push(e);
        }

        if let Some(cut) = self
            .levels
            .iter()
            .skip(1)
            .position(|l| !l.used || l.closed)
            .map(|i| i + 1)
        {
            self.truncate(cut, memory);
        }

        for level in &mut self.levels {
            level.tree.sweep(memory);
        }
        for e in &errors {
            tracing::warn!(error = %e, "layout usage error");
        }
        errors
    }

    /// Hand every level's commands to the backend, bottom to top.
    pub fn flush(&mut self, backend: &mut dyn PaintBackend) {
        let window = self.window.to_rect();
        let top = self.levels.len() - 1;
        backend.begin_frame(self.window);
        for (index, level) in self.levels.iter_mut().enumerate() {
            let dimmed = index < top;
            let mut commands = level.paint.take_commands();
            if dimmed {
                commands.push(PaintCommand::Crop(window));
                commands.push(PaintCommand::Rect {
                    rect: window,
                    color: DIM_COLOR,
                    border: 0.0,
                });
            }
            backend.draw_layer(FrameLayer {
                level: &level.name,
                commands: &commands,
                dimmed,
            });
        }
        backend.end_frame();
    }

    /// Persist every level's layout state (shutdown).
    pub fn flush_memory(&self, memory: &mut LayoutMemory) {
        for level in &self.levels {
            level.tree.flush(memory);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{DivFlags, InputEvent, TouchFlags};
    use gridwell_core::Point;
    use gridwell_paint::RecordingBackend;

    const WINDOW: Size = Size::new(400.0, 300.0);

    fn tick(stack: &mut LevelStack, input: &mut FrameInput, mem: &mut LayoutMemory, dialogs: &[&str]) {
        stack.begin_tick(WINDOW, 10.0, input, mem);
        for name in dialogs {
            if stack.start(name) {
                stack.end().unwrap();
            }
        }
        assert!(stack.end_tick(mem).is_empty());
        input.end_tick();
    }

    #[test]
    fn test_close_all_truncates_to_base() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");
        stack.begin_tick(WINDOW, 10.0, &mut input, &mut mem);

        assert!(stack.open("first", AnchorKind::Centered, Size::new(10.0, 10.0)));
        assert!(stack.start("first"));
        assert!(stack.open("second", AnchorKind::Relative, Size::new(5.0, 5.0)));
        stack.end().unwrap();
        assert_eq!(stack.len(), 3);

        stack.close_all(&mut mem);
        assert_eq!(stack.len(), 1);
        assert!(!stack.is_open("first"));
        assert!(stack.end_tick(&mut mem).is_empty());
    }

    #[test]
    fn test_open_twice_is_noop() {
        let mut stack = LevelStack::new("base");
        assert!(stack.open("menu", AnchorKind::Centered, Size::new(1.0, 1.0)));
        assert!(!stack.open("menu", AnchorKind::Centered, Size::new(1.0, 1.0)));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_dialog_not_started_is_dropped() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");
        stack.begin_tick(WINDOW, 10.0, &mut input, &mut mem);
        stack.open("a", AnchorKind::Centered, Size::new(4.0, 4.0));
        stack.open("b", AnchorKind::Centered, Size::new(4.0, 4.0));
        assert!(stack.end_tick(&mut mem).is_empty());
        input.end_tick();
        // Opened this tick, so they get one tick to be started.
        assert_eq!(stack.len(), 3);

        tick(&mut stack, &mut input, &mut mem, &[]);
        assert_eq!(stack.len(), 1);

        stack.open("a", AnchorKind::Centered, Size::new(4.0, 4.0));
        stack.open("b", AnchorKind::Centered, Size::new(4.0, 4.0));
        tick(&mut stack, &mut input, &mut mem, &["a", "b"]);
        assert_eq!(stack.len(), 3);

        // "a" stops being rendered; "b" above it goes too.
        tick(&mut stack, &mut input, &mut mem, &["b"]);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_dialog_opened_after_its_start_check() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");

        stack.begin_tick(WINDOW, 10.0, &mut input, &mut mem);
        assert!(!stack.start("menu"));
        assert!(stack.open("menu", AnchorKind::Centered, Size::new(4.0, 4.0)));
        assert!(stack.end_tick(&mut mem).is_empty());
        input.end_tick();
        assert!(stack.is_open("menu"));

        stack.begin_tick(WINDOW, 10.0, &mut input, &mut mem);
        assert!(stack.start("menu"));
        stack.end().unwrap();
        assert!(stack.end_tick(&mut mem).is_empty());
        input.end_tick();
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_escape_and_outside_press_close_top() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");
        stack.open("a", AnchorKind::Centered, Size::new(10.0, 10.0));
        stack.open("b", AnchorKind::Centered, Size::new(10.0, 10.0));
        tick(&mut stack, &mut input, &mut mem, &["a", "b"]);
        assert_eq!(stack.top().rect(), Rect::new(150.0, 100.0, 100.0, 100.0));

        input.apply(InputEvent::Escape);
        tick(&mut stack, &mut input, &mut mem, &["a", "b"]);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.top().name, "a");

        // Press inside the dialog keeps it.
        input.apply(InputEvent::PointerMove(Point::new(200.0, 150.0)));
        input.apply(InputEvent::PointerDown);
        tick(&mut stack, &mut input, &mut mem, &["a"]);
        input.apply(InputEvent::PointerUp);
        tick(&mut stack, &mut input, &mut mem, &["a"]);
        assert_eq!(stack.len(), 2);

        input.apply(InputEvent::PointerMove(Point::new(5.0, 5.0)));
        input.apply(InputEvent::PointerDown);
        stack.begin_tick(WINDOW, 10.0, &mut input, &mut mem);
        assert_eq!(stack.len(), 1);
        assert!(!input.pressed);
    }

    #[test]
    fn test_close_while_rendering_is_deferred() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");
        stack.open("menu", AnchorKind::Centered, Size::new(4.0, 4.0));
        tick(&mut stack, &mut input, &mut mem, &["menu"]);

        stack.begin_tick(WINDOW, 10.0, &mut input, &mut mem);
        assert!(stack.start("menu"));
        stack.close("menu", &mut mem).unwrap();
        assert!(!stack.is_open("menu"));
        assert_eq!(stack.len(), 2);
        stack.end().unwrap();
        assert!(stack.end_tick(&mut mem).is_empty());
        assert_eq!(stack.len(), 1);

        assert_eq!(
            stack.close("menu", &mut mem),
            Err(UsageError::UnknownDialog("menu".into()))
        );
    }

    #[test]
    fn test_relative_anchor_flips_above() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");
        stack.begin_tick(WINDOW, 10.0, &mut input, &mut mem);
        let level = stack.current_mut();
        level.div_start("button", GridRect::new(2, 26, 4, 2), &mem);
        level.div_end().unwrap();

        stack.open("drop", AnchorKind::Relative, Size::new(8.0, 6.0));
        assert!(stack.start("drop"));
        // Button spans y 260..280; 60px does not fit below.
        assert_eq!(stack.current().rect(), Rect::new(20.0, 200.0, 80.0, 60.0));
        stack.end().unwrap();
        stack.end_tick(&mut mem);
    }

    #[test]
    fn test_only_top_level_gets_input() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");
        stack.open("dialog", AnchorKind::Centered, Size::new(10.0, 10.0));
        input.apply(InputEvent::PointerMove(Point::new(155.0, 105.0)));

        let render = |stack: &mut LevelStack, input: &mut FrameInput, mem: &mut LayoutMemory| {
            stack.begin_tick(WINDOW, 10.0, input, mem);
            let base = stack.current_mut();
            base.div_start("under", GridRect::new(0, 0, 40, 30), mem);
            base.tree.enable(DivFlags::TOUCH).unwrap();
            let under = base.tree.touch();
            base.div_end().unwrap();

            stack.start("dialog");
            let dialog = stack.current_mut();
            dialog.div_start("over", GridRect::new(0, 0, 2, 2), mem);
            dialog.tree.enable(DivFlags::TOUCH).unwrap();
            let over = dialog.tree.touch();
            dialog.div_end().unwrap();
            stack.end().unwrap();
            stack.end_tick(mem);
            input.end_tick();
            (under, over)
        };

        render(&mut stack, &mut input, &mut mem);
        let (under, over) = render(&mut stack, &mut input, &mut mem);
        assert!(under.is_empty());
        assert_eq!(over, TouchFlags::HOVER);
    }

    #[test]
    fn test_flush_dims_lower_levels() {
        let mut mem = LayoutMemory::new();
        let mut input = FrameInput::new();
        let mut stack = LevelStack::new("base");
        stack.open("dialog", AnchorKind::Centered, Size::new(10.0, 10.0));
        tick(&mut stack, &mut input, &mut mem, &["dialog"]);

        let mut backend = RecordingBackend::default();
        stack.flush(&mut backend);
        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.layers.len(), 2);
        assert!(frame.layers[0].dimmed);
        assert_eq!(frame.layers[0].commands.len(), 2);
        assert!(!frame.layers[1].dimmed);
        assert!(frame.layers[1].commands.is_empty());
    }
}
