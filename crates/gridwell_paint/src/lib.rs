//! gridwell paint
//!
//! Each level accumulates an ordered list of drawing commands while its
//! plugin renders; the host hands every level's list to a [`PaintBackend`]
//! once per frame. Rasterizing, font shaping and image decoding live behind
//! that trait and are not part of this crate.
//!
//! # Example
//!
//! ```
//! use gridwell_paint::{PaintBuffer, PaintCommand};
//! use gridwell_core::{Color, Rect};
//!
//! let mut buf = PaintBuffer::new();
//! buf.set_crop(Rect::new(0.0, 0.0, 200.0, 100.0));
//! buf.fill_rect(Rect::new(10.0, 10.0, 50.0, 20.0), Color::WHITE);
//!
//! let commands = buf.take_commands();
//! assert!(matches!(commands[0], PaintCommand::Crop(_)));
//! assert_eq!(commands.len(), 2);
//! ```

pub mod backend;
pub mod buffer;
pub mod command;
pub mod metrics;

pub use backend::{FrameLayer, PaintBackend, RecordingBackend};
pub use buffer::PaintBuffer;
pub use command::{PaintCommand, TextAlign};
pub use metrics::{MonospaceMetrics, TextMetrics};
