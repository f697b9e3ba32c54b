//! Structural identity hashing
//!
//! Divs have no stable object identity across frames or sessions, so their
//! persisted state (scroll offsets, resize values) is keyed by a hash over
//! the identity chain: each node folds its name and grid rect into its
//! parent's hash. This is a persistence key, not a security hash.
//!
//! The algorithm is FNV-1a (64-bit), written out here so the values never
//! change with a dependency upgrade; stored layout files depend on them.

use crate::geometry::GridRect;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Incremental FNV-1a hasher over explicitly serialized fields.
#[derive(Clone, Copy, Debug)]
pub struct IdentityHasher {
    state: u64,
}

impl IdentityHasher {
    pub const fn new() -> Self {
        Self { state: FNV_OFFSET }
    }

    /// Continue hashing from a previously finished hash.
    pub const fn with_parent(parent: u64) -> Self {
        Self { state: parent }
    }

    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
        self
    }

    /// Strings are length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write(&(s.len() as u64).to_le_bytes());
        self.write(s.as_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.write(&v.to_le_bytes())
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.write(&[v])
    }

    pub fn finish(&self) -> u64 {
        self.state
    }
}

impl Default for IdentityHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash of a level's root node.
pub fn root_hash(level_name: &str) -> u64 {
    IdentityHasher::new().write_str(level_name).finish()
}

/// Hash of a child node under `parent_hash`.
pub fn node_hash(parent_hash: u64, name: &str, grid: GridRect) -> u64 {
    IdentityHasher::with_parent(parent_hash)
        .write_str(name)
        .write_i32(grid.x)
        .write_i32(grid.y)
        .write_i32(grid.w)
        .write_i32(grid.h)
        .finish()
}

/// Persistence key for a named resize slot on one axis of a node.
pub fn resize_key(node_hash: u64, axis: u8, slot_name: &str) -> u64 {
    IdentityHasher::with_parent(node_hash)
        .write_u8(axis)
        .write_str(slot_name)
        .finish()
}
