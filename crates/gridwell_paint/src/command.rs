//! Drawing commands

use gridwell_core::{Color, Point, Rect};

/// Horizontal text placement inside its rect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Decode the plugin-facing integer (0 left, 1 center, 2 right).
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => TextAlign::Center,
            2 => TextAlign::Right,
            _ => TextAlign::Left,
        }
    }
}

/// One recorded drawing operation, in window pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintCommand {
    /// Clip every following command to this rect.
    Crop(Rect),
    /// Filled rect when `border == 0`, outline of that width otherwise.
    Rect {
        rect: Rect,
        color: Color,
        border: f32,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f32,
    },
    /// Filled disc when `border == 0`, ring of that width otherwise.
    Circle {
        center: Point,
        radius: f32,
        color: Color,
        border: f32,
    },
    Image {
        path: String,
        rect: Rect,
        tint: Color,
    },
    Text {
        text: String,
        rect: Rect,
        color: Color,
        size: f32,
        align: TextAlign,
    },
}

impl PaintCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            PaintCommand::Crop(_) => "crop",
            PaintCommand::Rect { .. } => "rect",
            PaintCommand::Line { .. } => "line",
            PaintCommand::Circle { .. } => "circle",
            PaintCommand::Image { .. } => "image",
            PaintCommand::Text { .. } => "text",
        }
    }
}
