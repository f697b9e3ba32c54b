//! Per-level paint buffer
//!
//! Records commands in submission order. Crop changes are deduplicated so
//! consecutive draws into the same div emit a single `Crop`.

use gridwell_core::{Color, Point, Rect};

use crate::command::{PaintCommand, TextAlign};

/// Ordered drawing commands for one level.
#[derive(Debug, Default)]
pub struct PaintBuffer {
    commands: Vec<PaintCommand>,
    crop: Option<Rect>,
}

impl PaintBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded commands.
    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the buffer empty.
    pub fn take_commands(&mut self) -> Vec<PaintCommand> {
        self.crop = None;
        std::mem::take(&mut self.commands)
    }

    /// Clear all recorded commands.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.crop = None;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Current crop, if any was set since the last flush.
    pub fn crop(&self) -> Option<Rect> {
        self.crop
    }

    /// Switch the clip rect; a no-op when it is already active.
    pub fn set_crop(&mut self, rect: Rect) {
        if self.crop == Some(rect) {
            return;
        }
        self.crop = Some(rect);
        self.commands.push(PaintCommand::Crop(rect));
    }

    pub fn push(&mut self, command: PaintCommand) {
        if let PaintCommand::Crop(rect) = command {
            self.set_crop(rect);
        } else {
            self.commands.push(command);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Convenience API
    // ═══════════════════════════════════════════════════════════════════════

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.push(PaintCommand::Rect {
            rect,
            color,
            border: 0.0,
        });
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Color, border: f32) {
        self.push(PaintCommand::Rect {
            rect,
            color,
            border,
        });
    }

    pub fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        self.push(PaintCommand::Line {
            from,
            to,
            color,
            width,
        });
    }

    pub fn circle(&mut self, center: Point, radius: f32, color: Color, border: f32) {
        self.push(PaintCommand::Circle {
            center,
            radius,
            color,
            border,
        });
    }

    pub fn image(&mut self, path: impl Into<String>, rect: Rect, tint: Color) {
        self.push(PaintCommand::Image {
            path: path.into(),
            rect,
            tint,
        });
    }

    pub fn text(
        &mut self,
        text: impl Into<String>,
        rect: Rect,
        color: Color,
        size: f32,
        align: TextAlign,
    ) {
        self.push(PaintCommand::Text {
            text: text.into(),
            rect,
            color,
            size,
            align,
        });
    }
}
