//! Scroll state for div content
//!
//! Offsets are in pixels, measured from the start of the content, and always
//! clamped to `[0, content - view]`. Wheel input is applied post-order so the
//! deepest scrollable node under the pointer consumes it first; a node that
//! is already at its limit lets the wheel through to its ancestors.

use gridwell_core::{Point, Rect};

use crate::input::DivFlags;

// ============================================================================
// Scroll Configuration
// ============================================================================

/// Scrollbar geometry and wheel response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    /// Width reserved for a scrollbar on the right/bottom of the crop.
    pub bar_px: f32,
    /// Shortest thumb, so huge content stays draggable.
    pub min_thumb_px: f32,
    /// Multiplier applied to raw wheel travel.
    pub wheel_scale: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            bar_px: 10.0,
            min_thumb_px: 16.0,
            wheel_scale: 1.0,
        }
    }
}

impl ScrollConfig {
    /// Thin bars for dense screens.
    pub fn compact() -> Self {
        Self {
            bar_px: 6.0,
            min_thumb_px: 12.0,
            ..Default::default()
        }
    }
}

// ============================================================================
// Axis
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Columns / horizontal.
    X,
    /// Rows / vertical.
    Y,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::X, Axis::Y];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }

    /// Plugin-facing encoding (0 columns, 1 rows).
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self.index() as u8
    }

    pub fn scroll_flag(self) -> DivFlags {
        match self {
            Axis::X => DivFlags::SCROLL_X,
            Axis::Y => DivFlags::SCROLL_Y,
        }
    }

    fn of(self, p: Point) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }
}

// ============================================================================
// Scroll State
// ============================================================================

/// Offset and extents of a scrollable div.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    pub offset: [f32; 2],
    /// Total content size in pixels.
    pub content: [i32; 2],
    /// Visible size in pixels (crop without scrollbars).
    pub view: [i32; 2],
}

impl ScrollState {
    pub fn offset_point(&self) -> Point {
        Point::new(self.offset[0], self.offset[1])
    }

    pub fn max_offset(&self, axis: Axis) -> f32 {
        let i = axis.index();
        (self.content[i] - self.view[i]).max(0) as f32
    }

    pub fn overflows(&self, axis: Axis) -> bool {
        let i = axis.index();
        self.content[i] > self.view[i]
    }

    pub fn set_offset(&mut self, axis: Axis, value: f32) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.offset[axis.index()] = value.clamp(0.0, self.max_offset(axis));
    }

    pub fn clamp(&mut self) {
        for axis in Axis::BOTH {
            let current = self.offset[axis.index()];
            self.set_offset(axis, current);
        }
    }

    /// Record this frame's extents and re-clamp the offset.
    pub fn set_extent(&mut self, content: [i32; 2], view: [i32; 2]) {
        self.content = content;
        self.view = view;
        self.clamp();
    }

    /// Scroll by `delta` on the enabled axes. Returns true if the offset moved.
    pub fn apply_wheel(&mut self, delta: Point, enabled: DivFlags, config: &ScrollConfig) -> bool {
        let mut moved = false;
        for axis in Axis::BOTH {
            if !enabled.contains(axis.scroll_flag()) {
                continue;
            }
            let d = axis.of(delta) * config.wheel_scale;
            if d == 0.0 {
                continue;
            }
            let before = self.offset[axis.index()];
            self.set_offset(axis, before + d);
            moved |= self.offset[axis.index()] != before;
        }
        moved
    }

    /// Scrollbar track beside `crop` for `axis`.
    pub fn track_rect(&self, axis: Axis, crop: Rect, config: &ScrollConfig) -> Rect {
        match axis {
            Axis::Y => Rect::new(crop.right(), crop.y(), config.bar_px, crop.height()),
            Axis::X => Rect::new(crop.x(), crop.bottom(), crop.width(), config.bar_px),
        }
    }

    fn thumb_len(&self, axis: Axis, track_len: f32, config: &ScrollConfig) -> f32 {
        let i = axis.index();
        if self.content[i] <= 0 {
            return track_len;
        }
        let ratio = self.view[i] as f32 / self.content[i] as f32;
        (track_len * ratio).max(config.min_thumb_px).min(track_len)
    }

    /// Thumb inside `track`, or `None` when the axis does not overflow.
    pub fn thumb_rect(&self, axis: Axis, track: Rect, config: &ScrollConfig) -> Option<Rect> {
        if !self.overflows(axis) {
            return None;
        }
        let max = self.max_offset(axis);
        let t = if max > 0.0 {
            self.offset[axis.index()] / max
        } else {
            0.0
        };
        Some(match axis {
            Axis::Y => {
                let len = self.thumb_len(axis, track.height(), config);
                Rect::new(track.x(), track.y() + (track.height() - len) * t, track.width(), len)
            }
            Axis::X => {
                let len = self.thumb_len(axis, track.width(), config);
                Rect::new(track.x() + (track.width() - len) * t, track.y(), len, track.height())
            }
        })
    }

    /// Move the thumb by `delta_px` from a drag that began at `start_offset`.
    pub fn drag_thumb(
        &mut self,
        axis: Axis,
        start_offset: f32,
        delta_px: f32,
        track_len: f32,
        config: &ScrollConfig,
    ) {
        let travel = track_len - self.thumb_len(axis, track_len, config);
        if travel <= 0.0 {
            return;
        }
        let per_px = self.max_offset(axis) / travel;
        self.set_offset(axis, start_offset + delta_px * per_px);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(content: i32, view: i32) -> ScrollState {
        let mut s = ScrollState::default();
        s.set_extent([content, content], [view, view]);
        s
    }

    #[test]
    fn test_offset_clamped() {
        let mut s = state(300, 100);
        s.set_offset(Axis::Y, 500.0);
        assert_eq!(s.offset[1], 200.0);
        s.set_offset(Axis::Y, -5.0);
        assert_eq!(s.offset[1], 0.0);

        s.set_offset(Axis::Y, 150.0);
        s.set_extent([300, 120], [100, 100]);
        assert_eq!(s.offset[1], 20.0);
    }

    #[test]
    fn test_wheel_respects_enabled_axes() {
        let mut s = state(300, 100);
        let cfg = ScrollConfig::default();
        assert!(s.apply_wheel(Point::new(10.0, 10.0), DivFlags::SCROLL_Y, &cfg));
        assert_eq!(s.offset, [0.0, 10.0]);

        // At the top edge, scrolling up does nothing and is not consumed.
        let mut s = state(300, 100);
        assert!(!s.apply_wheel(Point::new(0.0, -10.0), DivFlags::SCROLL_Y, &cfg));
    }

    #[test]
    fn test_no_overflow_no_thumb() {
        let s = state(100, 100);
        let cfg = ScrollConfig::default();
        let track = s.track_rect(Axis::Y, Rect::new(0.0, 0.0, 90.0, 100.0), &cfg);
        assert_eq!(track, Rect::new(90.0, 0.0, 10.0, 100.0));
        assert!(s.thumb_rect(Axis::Y, track, &cfg).is_none());
    }

    #[test]
    fn test_thumb_tracks_offset() {
        let mut s = state(400, 100);
        let cfg = ScrollConfig::default();
        let track = Rect::new(90.0, 0.0, 10.0, 100.0);
        let thumb = s.thumb_rect(Axis::Y, track, &cfg).unwrap();
        assert_eq!(thumb.height(), 25.0);
        assert_eq!(thumb.y(), 0.0);

        s.set_offset(Axis::Y, 300.0);
        let thumb = s.thumb_rect(Axis::Y, track, &cfg).unwrap();
        assert_eq!(thumb.y(), 75.0);
    }

    #[test]
    fn test_thumb_drag_maps_to_content() {
        let mut s = state(400, 100);
        let cfg = ScrollConfig::default();
        // Thumb 25px over a 100px track leaves 75px of travel for 300px.
        s.drag_thumb(Axis::Y, 0.0, 15.0, 100.0, &cfg);
        assert_eq!(s.offset[1], 60.0);
        s.drag_thumb(Axis::Y, 0.0, 1000.0, 100.0, &cfg);
        assert_eq!(s.offset[1], 300.0);
    }
}
