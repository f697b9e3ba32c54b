//! gridwell core
//!
//! Shared foundations for the gridwell plugin host:
//!
//! - **Geometry**: pixel-space `Point`/`Size`/`Rect`, cell-space `GridRect`, `Color`
//! - **Values**: `TypedArg`, the unit of data crossing the plugin call bridge
//! - **Wire**: the tagged little-endian codec both plugin backends share
//! - **Hash**: the structural identity hash used as a persistence key

pub mod error;
pub mod geometry;
pub mod hash;
pub mod value;
pub mod wire;

pub use error::{ValueError, WireError, WireResult};
pub use geometry::{Color, GridRect, Point, Rect, Size};
pub use hash::{node_hash, resize_key, root_hash, IdentityHasher};
pub use value::{ArgType, Coercion, FromArg, IntoArgs, TypedArg};
