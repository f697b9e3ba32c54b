//! gridwell layout
//!
//! Immediate-mode grid layout for plugin-described UIs:
//!
//! - [`GridArray`]: one axis of cell constraints resolved to pixels
//! - [`DivTree`]: per-level node arena with stable identity and mark-and-sweep
//! - [`LevelStack`]: base screen plus modal dialogs
//! - [`LayoutMemory`]: scroll/resize state persisted by structural hash
//!
//! A frame looks like:
//!
//! ```
//! use gridwell_core::{GridRect, Size};
//! use gridwell_layout::{Axis, FrameInput, LayoutMemory, LevelStack};
//!
//! let mut memory = LayoutMemory::new();
//! let mut input = FrameInput::new();
//! let mut levels = LevelStack::new("main");
//!
//! levels.begin_tick(Size::new(640.0, 480.0), 20.0, &mut input, &mut memory);
//! let base = levels.current_mut();
//! base.tree.set_grid(Axis::X, 0, 4.0, 0.0, None, &memory).unwrap();
//! base.tree.set_grid(Axis::X, 1, 1.0, 100.0, None, &memory).unwrap();
//! base.div_start("sidebar", GridRect::new(0, 0, 1, 1), &memory);
//! base.div_end().unwrap();
//! assert!(levels.end_tick(&mut memory).is_empty());
//! ```

pub mod div;
pub mod error;
pub mod grid;
pub mod input;
pub mod level;
pub mod memory;
pub mod scroll;

pub use div::{DivId, DivNode, DivTree, PaintFrame};
pub use error::UsageError;
pub use grid::{GridArray, GridItem, ResizeSlot, MIN_EPSILON, RESIZER_BAND_PX};
pub use input::{DivFlags, FrameInput, InputEvent, TouchFlags};
pub use level::{Anchor, AnchorKind, Level, LevelStack, DIM_COLOR};
pub use memory::LayoutMemory;
pub use scroll::{Axis, ScrollConfig, ScrollState};
