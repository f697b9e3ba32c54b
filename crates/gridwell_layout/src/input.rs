//! Per-tick pointer and keyboard input

use bitflags::bitflags;
use gridwell_core::Point;

bitflags! {
    /// Input state of a div as seen by the plugin.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TouchFlags: u32 {
        /// Pointer is over the node.
        const HOVER = 1 << 0;
        /// Node was pressed and the button is still held.
        const DOWN = 1 << 1;
        /// Pressed this tick.
        const PRESS = 1 << 2;
        /// Released this tick over the node that was pressed.
        const CLICK = 1 << 3;
        /// Node consumed wheel input.
        const WHEEL = 1 << 4;
    }
}

bitflags! {
    /// Which inputs a div takes part in.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DivFlags: u32 {
        const TOUCH = 1 << 0;
        const SCROLL_X = 1 << 1;
        const SCROLL_Y = 1 << 2;
    }
}

/// Raw event from the window layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerMove(Point),
    PointerDown,
    PointerUp,
    /// Wheel travel in pixels; positive moves toward the end of the content.
    Wheel(Point),
    Escape,
}

/// Input accumulated for one tick.
///
/// Edge flags (`pressed`, `released`, `escape`) and wheel travel last exactly
/// one tick; call [`end_tick`](Self::end_tick) after rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub pointer: Point,
    pub down: bool,
    pub pressed: bool,
    pub released: bool,
    pub wheel: Point,
    pub escape: bool,
}

impl FrameInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMove(p) => self.pointer = p,
            InputEvent::PointerDown => {
                if !self.down {
                    self.pressed = true;
                }
                self.down = true;
            }
            InputEvent::PointerUp => {
                if self.down {
                    self.released = true;
                }
                self.down = false;
            }
            InputEvent::Wheel(delta) => {
                self.wheel.x += delta.x;
                self.wheel.y += delta.y;
            }
            InputEvent::Escape => self.escape = true,
        }
    }

    /// Drop this tick's press/release so nothing underneath reacts to it.
    pub fn consume_press(&mut self) {
        self.pressed = false;
        self.released = false;
    }

    pub fn has_wheel(&self) -> bool {
        self.wheel.x != 0.0 || self.wheel.y != 0.0
    }

    pub fn end_tick(&mut self) {
        self.pressed = false;
        self.released = false;
        self.escape = false;
        self.wheel = Point::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_release_edges() {
        let mut input = FrameInput::new();
        input.apply(InputEvent::PointerDown);
        assert!(input.pressed && input.down);
        input.end_tick();
        assert!(!input.pressed && input.down);

        input.apply(InputEvent::PointerDown);
        assert!(!input.pressed);

        input.apply(InputEvent::PointerUp);
        assert!(input.released && !input.down);
        input.end_tick();
        assert!(!input.released);
    }

    #[test]
    fn test_wheel_accumulates() {
        let mut input = FrameInput::new();
        input.apply(InputEvent::Wheel(Point::new(0.0, 5.0)));
        input.apply(InputEvent::Wheel(Point::new(1.0, 5.0)));
        assert_eq!(input.wheel, Point::new(1.0, 10.0));
        input.end_tick();
        assert!(!input.has_wheel());
    }
}
