//! Div tree
//!
//! Immediate-mode node tree for one level. Every frame the plugin walks the
//! tree with `start`/`end` pairs; nodes are found by `(parent, name, grid)`
//! and reused, so their scroll offsets and resize values survive between
//! frames. Nodes that are not referenced during a frame are removed by
//! [`DivTree::sweep`], which first writes their state to [`LayoutMemory`].
//!
//! A node's grid arrays are resolved ("locked") the first time its layout is
//! needed: its first child, a paint call, an info query, or its `end`.
//! Constraints declared after that are rejected with
//! [`UsageError::GridLocked`].
//!
//! Pointer input is hit-tested against the geometry of the previous frame,
//! which is what the user saw when they clicked.

use gridwell_core::{node_hash, resize_key, root_hash, GridRect, Point, Rect};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::error::UsageError;
use crate::grid::GridArray;
use crate::input::{DivFlags, FrameInput, TouchFlags};
use crate::memory::LayoutMemory;
use crate::scroll::{Axis, ScrollConfig, ScrollState};

new_key_type! {
    pub struct DivId;
}

// ============================================================================
// Node
// ============================================================================

/// A rectangular UI node.
#[derive(Clone, Debug)]
pub struct DivNode {
    pub name: String,
    /// Placement in the parent's grid, in cells.
    pub grid: GridRect,
    /// Structural identity; persistence key for scroll and resize state.
    pub hash: u64,
    pub parent: Option<DivId>,
    children: SmallVec<[DivId; 8]>,

    pub cols: GridArray,
    pub rows: GridArray,

    /// Full on-screen rect, including content scrolled out of view.
    pub canvas: Rect,
    /// Canvas clipped by the ancestors, scrollbars included.
    pub frame: Rect,
    /// Visible content rect: `frame` minus reserved scrollbars.
    pub crop: Rect,
    /// Whether a scrollbar is reserved, indexed by [`Axis::index`].
    pub bars: [bool; 2],
    pub scroll: ScrollState,

    pub flags: DivFlags,
    pub touch: TouchFlags,
    /// Canvas of the most recently ended child.
    pub last_child: Option<Rect>,

    wheel_hit: bool,
    locked: bool,
    used: bool,
}

impl DivNode {
    fn new(name: &str, grid: GridRect, hash: u64, parent: Option<DivId>) -> Self {
        Self {
            name: name.to_owned(),
            grid,
            hash,
            parent,
            children: SmallVec::new(),
            cols: GridArray::new(),
            rows: GridArray::new(),
            canvas: Rect::ZERO,
            frame: Rect::ZERO,
            crop: Rect::ZERO,
            bars: [false; 2],
            scroll: ScrollState::default(),
            flags: DivFlags::empty(),
            touch: TouchFlags::empty(),
            last_child: None,
            wheel_hit: false,
            locked: false,
            used: false,
        }
    }

    pub fn children(&self) -> &[DivId] {
        &self.children
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn grid_array(&self, axis: Axis) -> &GridArray {
        match axis {
            Axis::X => &self.cols,
            Axis::Y => &self.rows,
        }
    }

    fn grid_array_mut(&mut self, axis: Axis) -> &mut GridArray {
        match axis {
            Axis::X => &mut self.cols,
            Axis::Y => &mut self.rows,
        }
    }

    /// Top-left of the content after scrolling.
    pub fn content_origin(&self) -> Point {
        Point::new(
            self.canvas.x() - self.scroll.offset[0],
            self.canvas.y() - self.scroll.offset[1],
        )
    }

    fn persist(&self, memory: &mut LayoutMemory) {
        memory.store_scroll(self.hash, self.scroll.offset);
        for axis in Axis::BOTH {
            for slot in self.grid_array(axis).resize_slots() {
                if let Some(value) = slot.value {
                    memory.store_resize(resize_key(self.hash, axis.as_u8(), &slot.name), value);
                }
            }
        }
    }
}

/// Cell-to-pixel mapping for painting inside the current node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintFrame {
    pub origin: Point,
    pub crop: Rect,
    pub cell_px: f32,
}

impl PaintFrame {
    pub fn rect(&self, cells: Rect) -> Rect {
        Rect::new(
            self.origin.x + cells.x() * self.cell_px,
            self.origin.y + cells.y() * self.cell_px,
            cells.width() * self.cell_px,
            cells.height() * self.cell_px,
        )
    }

    pub fn point(&self, cells: Point) -> Point {
        Point::new(
            self.origin.x + cells.x * self.cell_px,
            self.origin.y + cells.y * self.cell_px,
        )
    }

    pub fn length(&self, cells: f32) -> f32 {
        cells * self.cell_px
    }
}

/// Pointer gesture captured on press.
#[derive(Clone, Copy, Debug)]
enum PointerDrag {
    Resize {
        node: DivId,
        axis: Axis,
        index: usize,
        start_px: f32,
        origin: Point,
    },
    Thumb {
        node: DivId,
        axis: Axis,
        start_offset: f32,
        track_len: f32,
        origin: Point,
    },
}

// ============================================================================
// Tree
// ============================================================================

/// Div arena for one level.
#[derive(Debug)]
pub struct DivTree {
    nodes: SlotMap<DivId, DivNode>,
    root: DivId,
    stack: Vec<DivId>,
    cell_px: f32,
    config: ScrollConfig,
    input: FrameInput,
    active: bool,
    hover: Option<DivId>,
    pressed: Option<DivId>,
    drag: Option<PointerDrag>,
    wheel_consumed: bool,
}

impl DivTree {
    pub fn new(level_name: &str) -> Self {
        Self::with_config(level_name, ScrollConfig::default())
    }

    pub fn with_config(level_name: &str, config: ScrollConfig) -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root_node = DivNode::new(level_name, GridRect::default(), root_hash(level_name), None);
        root_node.used = true;
        let root = nodes.insert(root_node);
        Self {
            nodes,
            root,
            stack: vec![root],
            cell_px: 1.0,
            config,
            input: FrameInput::default(),
            active: false,
            hover: None,
            pressed: None,
            drag: None,
            wheel_consumed: false,
        }
    }

    pub fn root(&self) -> DivId {
        self.root
    }

    /// Node currently open for children.
    pub fn current(&self) -> DivId {
        self.stack.last().copied().unwrap_or(self.root)
    }

    pub fn node(&self, id: DivId) -> Option<&DivNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of divs open below the root.
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    pub fn hover(&self) -> Option<DivId> {
        self.hover
    }

    pub fn cell_px(&self) -> f32 {
        self.cell_px
    }

    pub fn scroll_config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Child of `parent` with exactly this identity, if it exists.
    pub fn find_child(&self, parent: DivId, name: &str, grid: GridRect) -> Option<DivId> {
        let parent = self.nodes.get(parent)?;
        parent.children.iter().copied().find(|&c| {
            self.nodes
                .get(c)
                .is_some_and(|n| n.name == name && n.grid == grid)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Frame lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Reset per-frame state and resolve pointer input against last frame.
    pub fn begin_frame(&mut self, rect: Rect, cell_px: f32, input: &FrameInput, active: bool) {
        self.cell_px = if cell_px.is_finite() && cell_px > 0.0 {
            cell_px
        } else {
            1.0
        };
        self.input = *input;
        self.active = active;
        self.wheel_consumed = false;

        for node in self.nodes.values_mut() {
            node.used = false;
            node.locked = false;
            node.touch = if node.wheel_hit {
                TouchFlags::WHEEL
            } else {
                TouchFlags::empty()
            };
            node.wheel_hit = false;
        }

        if active {
            self.resolve_pointer();
        } else {
            self.hover = None;
            self.pressed = None;
            self.drag = None;
        }

        let root = &mut self.nodes[self.root];
        root.used = true;
        root.canvas = rect;
        root.frame = rect;
        root.crop = rect;
        root.last_child = None;
        self.stack.clear();
        self.stack.push(self.root);
    }

    fn resolve_pointer(&mut self) {
        let input = self.input;

        if let Some(drag) = self.drag {
            if input.down {
                self.apply_drag(drag, input.pointer);
            } else {
                self.drag = None;
            }
        } else if input.pressed {
            self.drag = self.drag_at(input.pointer);
        }

        self.hover = if self.drag.is_some() {
            None
        } else {
            self.hit_test(input.pointer)
        };

        if input.pressed && self.drag.is_none() {
            self.pressed = self.hover;
        }

        if let Some(id) = self.hover {
            let clicked = input.released && self.pressed == Some(id);
            let node = &mut self.nodes[id];
            node.touch |= TouchFlags::HOVER;
            if input.pressed {
                node.touch |= TouchFlags::PRESS;
            }
            if clicked {
                node.touch |= TouchFlags::CLICK;
            }
        }
        if let Some(node) = self.pressed.and_then(|id| self.nodes.get_mut(id)) {
            if input.down {
                node.touch |= TouchFlags::DOWN;
            }
        }
        if !input.down {
            self.pressed = None;
        }
    }

    /// Deepest touch-enabled node under `p`, later siblings first.
    pub fn hit_test(&self, p: Point) -> Option<DivId> {
        self.hit_node(self.root, p)
    }

    fn hit_node(&self, id: DivId, p: Point) -> Option<DivId> {
        let node = self.nodes.get(id)?;
        if !node.crop.contains(p) {
            return None;
        }
        node.children
            .iter()
            .rev()
            .find_map(|&c| self.hit_node(c, p))
            .or_else(|| node.flags.contains(DivFlags::TOUCH).then_some(id))
    }

    /// Nodes whose frame contains `p`, root first.
    fn path_at(&self, p: Point) -> SmallVec<[DivId; 16]> {
        let mut path = SmallVec::new();
        let mut id = self.root;
        loop {
            path.push(id);
            let next = self.nodes[id]
                .children
                .iter()
                .rev()
                .copied()
                .find(|&c| self.nodes.get(c).is_some_and(|n| n.frame.contains(p)));
            match next {
                Some(c) => id = c,
                None => break,
            }
        }
        path
    }

    fn drag_at(&self, p: Point) -> Option<PointerDrag> {
        for &id in self.path_at(p).iter().rev() {
            let node = &self.nodes[id];

            for axis in Axis::BOTH {
                if !node.bars[axis.index()] {
                    continue;
                }
                let track = node.scroll.track_rect(axis, node.crop, &self.config);
                if track.contains(p) {
                    let track_len = match axis {
                        Axis::X => track.width(),
                        Axis::Y => track.height(),
                    };
                    return Some(PointerDrag::Thumb {
                        node: id,
                        axis,
                        start_offset: node.scroll.offset[axis.index()],
                        track_len,
                        origin: p,
                    });
                }
            }

            if !node.crop.contains(p) {
                continue;
            }
            let origin = node.content_origin();
            for (axis, pos) in [(Axis::X, p.x - origin.x), (Axis::Y, p.y - origin.y)] {
                let grid = node.grid_array(axis);
                if let Some(index) = grid.resizer_at(pos) {
                    let start_px = grid.output(index).unwrap_or_default() as f32;
                    return Some(PointerDrag::Resize {
                        node: id,
                        axis,
                        index,
                        start_px,
                        origin: p,
                    });
                }
            }
        }
        None
    }

    fn apply_drag(&mut self, drag: PointerDrag, p: Point) {
        let cell_px = self.cell_px;
        match drag {
            PointerDrag::Resize {
                node,
                axis,
                index,
                start_px,
                origin,
            } => {
                let delta = match axis {
                    Axis::X => p.x - origin.x,
                    Axis::Y => p.y - origin.y,
                };
                if let Some(n) = self.nodes.get_mut(node) {
                    n.grid_array_mut(axis)
                        .drag_resize(index, start_px, delta, cell_px);
                }
            }
            PointerDrag::Thumb {
                node,
                axis,
                start_offset,
                track_len,
                origin,
            } => {
                let delta = match axis {
                    Axis::X => p.x - origin.x,
                    Axis::Y => p.y - origin.y,
                };
                let config = self.config;
                if let Some(n) = self.nodes.get_mut(node) {
                    n.scroll
                        .drag_thumb(axis, start_offset, delta, track_len, &config);
                }
            }
        }
    }

    /// Check nesting at the end of a frame; unclosed divs are reported and
    /// popped.
    pub fn finish_frame(&mut self) -> Result<(), UsageError> {
        self.lock(self.root);
        let open = self.depth();
        self.stack.truncate(1);
        if open > 0 {
            tracing::warn!(open, "frame ended with unclosed divs");
            return Err(UsageError::UnclosedDivs(open));
        }
        Ok(())
    }

    /// Remove every node not referenced this frame, persisting its state
    /// first. Returns the number of nodes removed.
    pub fn sweep(&mut self, memory: &mut LayoutMemory) -> usize {
        let dead: Vec<DivId> = self
            .nodes
            .iter()
            .filter(|(id, node)| !node.used && *id != self.root)
            .map(|(id, _)| id)
            .collect();

        for &id in &dead {
            if let Some(node) = self.nodes.remove(id) {
                node.persist(memory);
            }
        }
        if !dead.is_empty() {
            let nodes = &self.nodes;
            let live: Vec<(DivId, SmallVec<[DivId; 8]>)> = nodes
                .iter()
                .map(|(id, n)| {
                    (
                        id,
                        n.children
                            .iter()
                            .copied()
                            .filter(|c| nodes.contains_key(*c))
                            .collect(),
                    )
                })
                .collect();
            for (id, children) in live {
                self.nodes[id].children = children;
            }
            for slot in [&mut self.hover, &mut self.pressed] {
                if slot.is_some_and(|id| !self.nodes.contains_key(id)) {
                    *slot = None;
                }
            }
            let drag_node = match self.drag {
                Some(PointerDrag::Resize { node, .. } | PointerDrag::Thumb { node, .. }) => {
                    Some(node)
                }
                None => None,
            };
            if drag_node.is_some_and(|id| !self.nodes.contains_key(id)) {
                self.drag = None;
            }
            tracing::trace!(removed = dead.len(), "swept unused divs");
        }
        dead.len()
    }

    /// Persist every node's state (shutdown, level close).
    pub fn flush(&self, memory: &mut LayoutMemory) {
        for node in self.nodes.values() {
            node.persist(memory);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Start / end
    // ─────────────────────────────────────────────────────────────────────────

    /// Find or create the child `(name, grid)` of the current node, place it,
    /// and make it current.
    pub fn start(&mut self, name: &str, grid: GridRect, memory: &LayoutMemory) -> DivId {
        let grid = grid.sanitized();
        let parent = self.current();
        self.lock(parent);

        let id = match self.find_child(parent, name, grid) {
            Some(id) => id,
            None => {
                let hash = node_hash(self.nodes[parent].hash, name, grid);
                let mut node = DivNode::new(name, grid, hash, Some(parent));
                if let Some(offset) = memory.scroll(hash) {
                    node.scroll.offset = offset;
                }
                let id = self.nodes.insert(node);
                self.nodes[parent].children.push(id);
                id
            }
        };

        let cell = self.cell_px;
        let p = &self.nodes[parent];
        let origin = p.content_origin();
        let x0 = p.cols.convert(cell, 0, grid.x as usize);
        let y0 = p.rows.convert(cell, 0, grid.y as usize);
        let w = p.cols.convert(cell, grid.x as usize, grid.col_end());
        let h = p.rows.convert(cell, grid.y as usize, grid.row_end());
        let canvas = Rect::new(origin.x + x0 as f32, origin.y + y0 as f32, w as f32, h as f32);
        let frame = canvas.intersection(&p.crop);

        let node = &mut self.nodes[id];
        node.canvas = canvas;
        node.frame = frame;
        node.crop = frame;
        node.bars = [false; 2];
        node.flags = DivFlags::empty();
        node.last_child = None;
        node.used = true;
        node.locked = false;
        self.stack.push(id);
        id
    }

    /// Close the current node. Wheel input is offered to it here, after all
    /// of its descendants had their chance.
    pub fn end(&mut self) -> Result<DivId, UsageError> {
        if self.stack.len() <= 1 {
            return Err(UsageError::UnbalancedEnd);
        }
        let Some(id) = self.stack.pop() else {
            return Err(UsageError::UnbalancedEnd);
        };
        self.lock(id);

        let input = self.input;
        let config = self.config;
        if self.active && !self.wheel_consumed && input.has_wheel() {
            let node = &mut self.nodes[id];
            if node.frame.contains(input.pointer)
                && node.flags.intersects(DivFlags::SCROLL_X | DivFlags::SCROLL_Y)
                && node.scroll.apply_wheel(input.wheel, node.flags, &config)
            {
                node.wheel_hit = true;
                self.wheel_consumed = true;
            }
        }

        let canvas = self.nodes[id].canvas;
        if let Some(parent) = self.nodes[id].parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.last_child = Some(canvas);
        }
        Ok(id)
    }

    /// Resolve the node's grid arrays, scrollbars and crop for this frame.
    fn lock(&mut self, id: DivId) {
        let cell = self.cell_px;
        let bar = self.config.bar_px.round() as i32;
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.locked {
            return;
        }

        let w = node.canvas.width().round() as i32;
        let h = node.canvas.height().round() as i32;
        let mut bars = [false; 2];
        let mut view;
        let mut content;
        let mut passes = 0;
        loop {
            // A vertical bar narrows the width and vice versa.
            view = [
                (w - if bars[Axis::Y.index()] { bar } else { 0 }).max(0),
                (h - if bars[Axis::X.index()] { bar } else { 0 }).max(0),
            ];
            node.cols.update(cell, view[0]);
            node.rows.update(cell, view[1]);
            content = [node.cols.total(), node.rows.total()];

            let mut wanted = bars;
            for axis in Axis::BOTH {
                let i = axis.index();
                wanted[i] |= node.flags.contains(axis.scroll_flag()) && content[i] > view[i];
            }
            passes += 1;
            if wanted == bars || passes == 3 {
                break;
            }
            bars = wanted;
        }

        node.bars = bars;
        node.scroll.set_extent(content, view);
        let bar_f = bar as f32;
        node.crop = node.frame.shrink(
            if bars[Axis::Y.index()] { bar_f } else { 0.0 },
            if bars[Axis::X.index()] { bar_f } else { 0.0 },
        );
        node.locked = true;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Current-node operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Declare a column or row on the current node.
    pub fn set_grid(
        &mut self,
        axis: Axis,
        index: usize,
        min: f32,
        max: f32,
        resize: Option<&str>,
        memory: &LayoutMemory,
    ) -> Result<(), UsageError> {
        let id = self.current();
        let node = &mut self.nodes[id];
        if node.locked {
            return Err(UsageError::GridLocked {
                node: node.name.clone(),
            });
        }
        let hash = node.hash;
        let grid = node.grid_array_mut(axis);
        if let Some(name) = grid.declare(index, min, max, resize) {
            if let Some(value) = memory.resize(resize_key(hash, axis.as_u8(), &name)) {
                grid.set_resize_value(&name, value);
            }
        }
        Ok(())
    }

    /// Set which inputs the current node takes part in.
    pub fn enable(&mut self, flags: DivFlags) -> Result<(), UsageError> {
        let id = self.current();
        let node = &mut self.nodes[id];
        if node.locked {
            return Err(UsageError::GridLocked {
                node: node.name.clone(),
            });
        }
        node.flags = flags;
        Ok(())
    }

    /// `(canvas, crop)` of the current node.
    pub fn info(&mut self) -> (Rect, Rect) {
        let id = self.current();
        self.lock(id);
        let node = &self.nodes[id];
        (node.canvas, node.crop)
    }

    pub fn scroll_info(&mut self) -> ScrollState {
        let id = self.current();
        self.lock(id);
        self.nodes[id].scroll
    }

    /// Set the current node's offset; negative values keep an axis as is.
    pub fn set_scroll(&mut self, x: f32, y: f32) {
        let id = self.current();
        self.lock(id);
        let scroll = &mut self.nodes[id].scroll;
        for (axis, v) in [(Axis::X, x), (Axis::Y, y)] {
            if v >= 0.0 {
                scroll.set_offset(axis, v);
            }
        }
    }

    /// Resolved pixel size of one column/row of the current node.
    pub fn grid_output(&mut self, axis: Axis, index: usize) -> i32 {
        let id = self.current();
        self.lock(id);
        self.nodes[id]
            .grid_array(axis)
            .convert(self.cell_px, index, index + 1)
    }

    pub fn touch(&self) -> TouchFlags {
        self.nodes
            .get(self.current())
            .map(|n| n.touch)
            .unwrap_or_default()
    }

    pub fn paint_frame(&mut self) -> PaintFrame {
        let id = self.current();
        self.lock(id);
        let node = &self.nodes[id];
        PaintFrame {
            origin: node.content_origin(),
            crop: node.crop,
            cell_px: self.cell_px,
        }
    }

    /// Anchor rect for a dialog opened from the current node: its last ended
    /// child, or the node itself.
    pub fn anchor_rect(&self) -> Rect {
        let node = &self.nodes[self.current()];
        node.last_child.unwrap_or(node.canvas)
    }

    /// `(track, thumb)` rects of the visible scrollbars of `id`.
    pub fn scrollbars(&self, id: DivId) -> SmallVec<[(Rect, Rect); 2]> {
        let mut out = SmallVec::new();
        let Some(node) = self.nodes.get(id) else {
            return out;
        };
        for axis in Axis::BOTH {
            if !node.bars[axis.index()] {
                continue;
            }
            let track = node.scroll.track_rect(axis, node.crop, &self.config);
            if let Some(thumb) = node.scroll.thumb_rect(axis, track, &self.config) {
                out.push((track, thumb));
            }
        }
        out
    }
}
