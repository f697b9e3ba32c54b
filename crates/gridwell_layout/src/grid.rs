//! Grid arrays
//!
//! A grid array is one axis (columns or rows) of a div: an ordered list of
//! size constraints in cells that resolves to whole-pixel extents against the
//! space the div has available.
//!
//! Resolution seeds every item with its minimum and then grows items in
//! equal per-pass shares, each capped at its own maximum, until the window is
//! filled or nothing can grow:
//!
//! ```
//! use gridwell_layout::GridArray;
//!
//! let mut cols = GridArray::new();
//! cols.declare(0, 1.0, 0.0, None); // fixed one cell
//! cols.declare(1, 2.0, 5.0, None); // two to five cells
//! cols.update(10.0, 100);
//! assert_eq!(cols.outputs(), &[10, 50]);
//! ```

/// Smallest allowed minimum, in cells.
pub const MIN_EPSILON: f32 = 0.001;

/// Width of the draggable band centered on a resizable item's trailing edge.
pub const RESIZER_BAND_PX: f32 = 6.0;

// ============================================================================
// Items
// ============================================================================

/// Named, persisted size override.
///
/// Slots are looked up by name rather than index so inserting or reordering
/// items does not move a saved width onto a different column.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeSlot {
    pub name: String,
    /// Current size in cells; `None` until the user (or restore) sets one.
    pub value: Option<f32>,
}

/// One size constraint in cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridItem {
    pub min: f32,
    /// `<= 0` means unset (resolves to `min`).
    pub max: f32,
    /// Index into the array's resize pool.
    pub resize: Option<usize>,
}

impl Default for GridItem {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 0.0,
            resize: None,
        }
    }
}

impl GridItem {
    /// Effective `(min, max)` in cells, ignoring any resize slot.
    pub fn bounds(&self) -> (f32, f32) {
        let min = if self.min.is_finite() {
            self.min.max(MIN_EPSILON)
        } else {
            MIN_EPSILON
        };
        let max = if self.max.is_finite() && self.max > 0.0 {
            self.max.max(min)
        } else {
            min
        };
        (min, max)
    }
}

// ============================================================================
// Grid Array
// ============================================================================

/// One axis of constraints plus its resolved pixel outputs.
#[derive(Clone, Debug, Default)]
pub struct GridArray {
    items: Vec<GridItem>,
    resizes: Vec<ResizeSlot>,
    outputs: Vec<i32>,
}

impl GridArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[GridItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&GridItem> {
        self.items.get(index)
    }

    /// Declare constraints for `index`, growing the array as needed.
    ///
    /// Returns the name of the resize slot when this call created it, so the
    /// caller can restore a persisted value into it.
    pub fn declare(
        &mut self,
        index: usize,
        min: f32,
        max: f32,
        resize: Option<&str>,
    ) -> Option<String> {
        if self.items.len() <= index {
            self.items.resize(index + 1, GridItem::default());
        }

        let mut created = None;
        let slot = resize.filter(|name| !name.is_empty()).map(|name| {
            match self.resizes.iter().position(|s| s.name == name) {
                Some(i) => i,
                None => {
                    self.resizes.push(ResizeSlot {
                        name: name.to_owned(),
                        value: None,
                    });
                    created = Some(name.to_owned());
                    self.resizes.len() - 1
                }
            }
        });

        self.items[index] = GridItem {
            min,
            max,
            resize: slot,
        };
        created
    }

    pub fn resize_slots(&self) -> &[ResizeSlot] {
        &self.resizes
    }

    pub fn resize_value(&self, name: &str) -> Option<f32> {
        self.resizes
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.value)
    }

    /// Set a slot's value by name. Returns false when no such slot exists.
    pub fn set_resize_value(&mut self, name: &str, value: f32) -> bool {
        match self.resizes.iter_mut().find(|s| s.name == name) {
            Some(slot) => {
                slot.value = value.is_finite().then_some(value);
                true
            }
            None => false,
        }
    }

    /// Effective `(min, max)` for `index`, with a resize value applied.
    pub fn resolved_bounds(&self, index: usize) -> (f32, f32) {
        let item = self.items.get(index).copied().unwrap_or_default();
        let (min, max) = item.bounds();
        let value = item
            .resize
            .and_then(|i| self.resizes.get(i))
            .and_then(|slot| slot.value);
        match value {
            Some(v) => {
                let v = v.clamp(min, max);
                (v, v)
            }
            None => (min, max),
        }
    }

    /// Resolve every item to whole pixels against `window_px`.
    pub fn update(&mut self, cell_px: f32, window_px: i32) {
        let cell_px = if cell_px.is_finite() && cell_px > 0.0 {
            cell_px
        } else {
            1.0
        };
        let window = i64::from(window_px.max(0));

        let mut outputs: Vec<i64> = Vec::with_capacity(self.items.len());
        let mut caps: Vec<i64> = Vec::with_capacity(self.items.len());
        for index in 0..self.items.len() {
            let (min, max) = self.resolved_bounds(index);
            let seed = (min * cell_px).round() as i64;
            outputs.push(seed);
            caps.push(((max * cell_px).round() as i64).max(seed));
        }

        let mut sum: i64 = outputs.iter().sum();
        while sum < window {
            let growable = outputs
                .iter()
                .zip(&caps)
                .filter(|(out, cap)| *cap > *out)
                .count() as i64;
            if growable == 0 {
                break;
            }
            let share = ((window - sum) / growable).max(1);
            for (out, cap) in outputs.iter_mut().zip(&caps) {
                if sum >= window {
                    break;
                }
                let headroom = cap - *out;
                if headroom <= 0 {
                    continue;
                }
                let add = share.min(headroom).min(window - sum);
                *out += add;
                sum += add;
            }
        }

        self.outputs = outputs
            .into_iter()
            .map(|v| v.clamp(0, i64::from(i32::MAX)) as i32)
            .collect();
    }

    /// Pixel extents from the last [`update`](Self::update).
    pub fn outputs(&self) -> &[i32] {
        &self.outputs
    }

    pub fn output(&self, index: usize) -> Option<i32> {
        self.outputs.get(index).copied()
    }

    /// Sum of all resolved outputs, saturating at `i32::MAX`.
    pub fn total(&self) -> i32 {
        saturate(self.outputs.iter().map(|&v| i64::from(v)).sum())
    }

    /// Pixel extent of items `[start, end)`, saturating at `i32::MAX`.
    ///
    /// Indices past the resolved outputs count one cell each.
    pub fn convert(&self, cell_px: f32, start: usize, end: usize) -> i32 {
        if end <= start {
            return 0;
        }
        let resolved = end.min(self.outputs.len());
        let known: i64 = self
            .outputs
            .get(start..resolved)
            .unwrap_or_default()
            .iter()
            .map(|&v| i64::from(v))
            .sum();
        let unresolved = i64::try_from(end - start.max(resolved)).unwrap_or(i64::MAX);
        let cell = i64::from(cell_px.round() as i32);
        saturate(known.saturating_add(unresolved.saturating_mul(cell)))
    }

    /// Index of the resizable item whose trailing edge band contains `pos`.
    ///
    /// `pos` is measured from the start of the first item.
    pub fn resizer_at(&self, pos: f32) -> Option<usize> {
        let half = RESIZER_BAND_PX / 2.0;
        let mut edge = 0i32;
        for (index, out) in self.outputs.iter().enumerate() {
            edge += out;
            let resizable = self.items.get(index).is_some_and(|i| i.resize.is_some());
            if resizable && (pos - edge as f32).abs() <= half {
                return Some(index);
            }
        }
        None
    }

    /// Apply a resizer drag: `start_px` is the item's output when the drag
    /// began, `delta_px` the pointer travel since then.
    pub fn drag_resize(&mut self, index: usize, start_px: f32, delta_px: f32, cell_px: f32) {
        let Some(slot) = self.items.get(index).and_then(|i| i.resize) else {
            return;
        };
        if cell_px <= 0.0 {
            return;
        }
        let (min, max) = self.items[index].bounds();
        let cells = ((start_px + delta_px) / cell_px).clamp(min, max);
        if let Some(s) = self.resizes.get_mut(slot) {
            s.value = Some(cells);
        }
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(items: &[(f32, f32)]) -> GridArray {
        let mut g = GridArray::new();
        for (i, (min, max)) in items.iter().enumerate() {
            g.declare(i, *min, *max, None);
        }
        g
    }

    #[test]
    fn test_unset_max_pins_to_min() {
        let mut g = array(&[(1.0, 0.0), (2.0, 5.0)]);
        g.update(10.0, 100);
        assert_eq!(g.outputs(), &[10, 50]);
    }

    #[test]
    fn test_growth_is_even_per_pass() {
        let mut g = array(&[(1.0, 10.0), (1.0, 10.0), (1.0, 2.0)]);
        g.update(10.0, 100);
        // 30 seeded, 70 left: third caps at 20, the rest split evenly.
        assert_eq!(g.outputs(), &[40, 40, 20]);
        assert_eq!(g.total(), 100);
    }

    #[test]
    fn test_indivisible_remainder_goes_in_index_order() {
        let mut g = array(&[(1.0, 10.0), (1.0, 10.0), (1.0, 10.0)]);
        g.update(10.0, 61);
        assert_eq!(g.outputs(), &[21, 20, 20]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut g = array(&[(1.0, 3.0), (0.5, 7.0), (2.0, 0.0)]);
        g.update(12.0, 97);
        let first = g.outputs().to_vec();
        g.update(12.0, 97);
        assert_eq!(g.outputs(), first.as_slice());
    }

    #[test]
    fn test_fill_invariant() {
        let cases: &[(&[(f32, f32)], i32)] = &[
            (&[(1.0, 4.0), (1.0, 0.0)], 37),
            (&[(1.0, 2.0), (1.0, 2.0)], 1000),
            (&[(0.0, 9.0), (1.5, 2.5), (1.0, 3.0)], 55),
            (&[(1.0, 100.0)], 13),
        ];
        for (items, window) in cases {
            let mut g = array(items);
            let cell = 10.0;
            g.update(cell, *window);
            let min_sum: i32 = (0..g.len())
                .map(|i| (g.resolved_bounds(i).0 * cell).round() as i32)
                .sum();
            let max_sum: i32 = (0..g.len())
                .map(|i| (g.resolved_bounds(i).1 * cell).round() as i32)
                .sum();
            assert!(*window > min_sum);
            assert_eq!(g.total(), (*window).min(max_sum), "items {:?}", items);
        }
    }

    #[test]
    fn test_overflow_keeps_minimums() {
        let mut g = array(&[(5.0, 0.0), (5.0, 8.0)]);
        g.update(10.0, 40);
        assert_eq!(g.outputs(), &[50, 50]);
    }

    #[test]
    fn test_min_is_clamped_to_epsilon() {
        let g = array(&[(-3.0, 0.0)]);
        assert_eq!(g.resolved_bounds(0), (MIN_EPSILON, MIN_EPSILON));
    }

    #[test]
    fn test_convert_matches_outputs() {
        let mut g = array(&[(1.0, 3.0), (2.0, 2.0), (1.0, 0.0)]);
        g.update(10.0, 55);
        for start in 0..=3 {
            for end in start..=3 {
                let expect: i32 = g.outputs()[start..end].iter().sum();
                assert_eq!(g.convert(10.0, start, end), expect);
            }
        }
        // Unresolved trailing items count one cell.
        assert_eq!(g.convert(10.0, 2, 5), g.outputs()[2] + 20);
    }

    #[test]
    fn test_huge_sums_saturate() {
        let mut g = array(&[(1e9, 0.0), (1e9, 0.0)]);
        g.update(10.0, 100);
        assert_eq!(g.outputs(), &[i32::MAX, i32::MAX]);
        assert_eq!(g.total(), i32::MAX);
        assert_eq!(g.convert(10.0, 0, 2), i32::MAX);
        assert_eq!(g.convert(10.0, 1, 500_000_000), i32::MAX);
        assert_eq!(g.convert(10.0, 0, usize::MAX), i32::MAX);
        assert_eq!(g.convert(10.0, 3, 2), 0);
    }

    #[test]
    fn test_resize_overrides_and_clamps() {
        let mut g = GridArray::new();
        assert_eq!(g.declare(0, 2.0, 8.0, Some("name")), Some("name".into()));
        g.declare(1, 1.0, 0.0, None);
        g.set_resize_value("name", 20.0);
        g.update(10.0, 500);
        assert_eq!(g.outputs(), &[80, 10]);

        // Redeclaring does not recreate the slot.
        assert_eq!(g.declare(0, 2.0, 8.0, Some("name")), None);
        assert_eq!(g.resize_value("name"), Some(20.0));
    }

    #[test]
    fn test_resize_survives_recreation() {
        let build = |saved: Option<f32>| {
            let mut g = GridArray::new();
            g.declare(0, 1.0, 0.0, None);
            if let Some(name) = g.declare(1, 2.0, 10.0, Some("width")) {
                if let Some(v) = saved {
                    g.set_resize_value(&name, v);
                }
            }
            g.declare(2, 1.0, 20.0, None);
            g.update(10.0, 300);
            g
        };

        let mut first = build(None);
        first.set_resize_value("width", 4.5);
        first.update(10.0, 300);
        let saved = first.resize_value("width");

        let second = build(saved);
        assert_eq!(first.outputs(), second.outputs());
        assert_eq!(second.output(1), Some(45));
    }

    #[test]
    fn test_resize_slot_follows_name_not_index() {
        let mut g = GridArray::new();
        g.declare(0, 1.0, 10.0, Some("a"));
        g.set_resize_value("a", 3.0);
        // "a" moves to index 1 next frame.
        g.declare(0, 1.0, 0.0, None);
        g.declare(1, 1.0, 10.0, Some("a"));
        g.update(10.0, 1000);
        assert_eq!(g.output(1), Some(30));
    }

    #[test]
    fn test_resizer_hit_and_drag() {
        let mut g = GridArray::new();
        g.declare(0, 2.0, 10.0, Some("left"));
        g.declare(1, 1.0, 0.0, None);
        g.update(10.0, 30);
        assert_eq!(g.outputs(), &[20, 10]);

        assert_eq!(g.resizer_at(21.0), Some(0));
        assert_eq!(g.resizer_at(30.0), None);
        assert_eq!(g.resizer_at(10.0), None);

        g.drag_resize(0, 20.0, 15.0, 10.0);
        assert_eq!(g.resize_value("left"), Some(3.5));
        g.drag_resize(0, 20.0, -500.0, 10.0);
        assert_eq!(g.resize_value("left"), Some(2.0));
    }
}
