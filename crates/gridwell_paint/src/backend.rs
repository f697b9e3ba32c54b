//! Rendering backend interface
//!
//! The host flushes every level once per frame, bottom to top. Levels below
//! the top are flushed with `dimmed = true` so the backend can fade them.

use std::collections::VecDeque;

use gridwell_core::Size;
use smallvec::SmallVec;

use crate::command::PaintCommand;

/// One level's commands as handed to the backend.
#[derive(Clone, Copy, Debug)]
pub struct FrameLayer<'a> {
    pub level: &'a str,
    pub commands: &'a [PaintCommand],
    pub dimmed: bool,
}

/// Rasterizer seam.
///
/// Implementations own the surface. Calls always arrive as
/// `begin_frame`, zero or more `draw_layer`, `end_frame`.
pub trait PaintBackend {
    fn begin_frame(&mut self, window: Size);

    fn draw_layer(&mut self, layer: FrameLayer<'_>);

    fn end_frame(&mut self);
}

/// A level captured by [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedLayer {
    pub level: String,
    pub commands: Vec<PaintCommand>,
    pub dimmed: bool,
}

/// A complete frame captured by [`RecordingBackend`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedFrame {
    pub window: Size,
    pub layers: SmallVec<[RecordedLayer; 4]>,
}

impl RecordedFrame {
    /// Total commands across all layers.
    pub fn command_count(&self) -> usize {
        self.layers.iter().map(|l| l.commands.len()).sum()
    }
}

/// Headless backend that keeps the most recent frames in memory.
///
/// Used by the CLI host and by tests that assert on emitted commands.
#[derive(Debug)]
pub struct RecordingBackend {
    frames: VecDeque<RecordedFrame>,
    current: Option<RecordedFrame>,
    capacity: usize,
    frame_count: u64,
}

impl RecordingBackend {
    /// Keep at most `capacity` finished frames (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            current: None,
            capacity: capacity.max(1),
            frame_count: 0,
        }
    }

    /// Most recently finished frame.
    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.back()
    }

    pub fn frames(&self) -> impl Iterator<Item = &RecordedFrame> {
        self.frames.iter()
    }

    /// Number of frames finished since creation.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(8)
    }
}

impl PaintBackend for RecordingBackend {
    fn begin_frame(&mut self, window: Size) {
        if self.current.is_some() {
            tracing::warn!("begin_frame called twice without end_frame");
        }
        self.current = Some(RecordedFrame {
            window,
            layers: SmallVec::new(),
        });
    }

    fn draw_layer(&mut self, layer: FrameLayer<'_>) {
        let Some(frame) = self.current.as_mut() else {
            tracing::warn!(level = layer.level, "draw_layer outside of a frame");
            return;
        };
        frame.layers.push(RecordedLayer {
            level: layer.level.to_owned(),
            commands: layer.commands.to_vec(),
            dimmed: layer.dimmed,
        });
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.current.take() else {
            return;
        };
        tracing::trace!(
            layers = frame.layers.len(),
            commands = frame.command_count(),
            "frame recorded"
        );
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        self.frame_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwell_core::{Color, Rect};

    fn rect_cmd() -> PaintCommand {
        PaintCommand::Rect {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            color: Color::WHITE,
            border: 0.0,
        }
    }

    #[test]
    fn test_records_layers_in_order() {
        let mut backend = RecordingBackend::default();
        let cmds = [rect_cmd()];
        backend.begin_frame(Size::new(100.0, 50.0));
        backend.draw_layer(FrameLayer {
            level: "base",
            commands: &cmds,
            dimmed: true,
        });
        backend.draw_layer(FrameLayer {
            level: "dialog",
            commands: &[],
            dimmed: false,
        });
        backend.end_frame();

        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.window, Size::new(100.0, 50.0));
        assert_eq!(frame.layers.len(), 2);
        assert!(frame.layers[0].dimmed);
        assert_eq!(frame.layers[1].level, "dialog");
        assert_eq!(frame.command_count(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut backend = RecordingBackend::new(2);
        for i in 0..3 {
            backend.begin_frame(Size::new(i as f32, 0.0));
            backend.end_frame();
        }
        assert_eq!(backend.frame_count(), 3);
        let widths: Vec<f32> = backend.frames().map(|f| f.window.width).collect();
        assert_eq!(widths, vec![1.0, 2.0]);
    }

    #[test]
    fn test_draw_outside_frame_ignored() {
        let mut backend = RecordingBackend::default();
        backend.draw_layer(FrameLayer {
            level: "base",
            commands: &[],
            dimmed: false,
        });
        backend.end_frame();
        assert_eq!(backend.frame_count(), 0);
    }
}
