//! Process-wide layout memory
//!
//! Scroll offsets and resize values keyed by structural hash. Nodes write
//! into it when they are swept or when the host shuts down, and read from it
//! when they are created, so state outlives both frames and sessions.
//!
//! On disk the hashes are 16-digit hex strings:
//!
//! ```json
//! { "scroll": { "9f0c…": [0.0, 120.0] }, "resize": { "41aa…": 6.5 } }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutDocument", into = "LayoutDocument")]
pub struct LayoutMemory {
    scroll: IndexMap<u64, [f32; 2]>,
    resize: IndexMap<u64, f32>,
}

impl LayoutMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll(&self, node_hash: u64) -> Option<[f32; 2]> {
        self.scroll.get(&node_hash).copied()
    }

    /// Store an offset; a zero offset removes the entry.
    pub fn store_scroll(&mut self, node_hash: u64, offset: [f32; 2]) {
        if offset == [0.0, 0.0] {
            self.scroll.shift_remove(&node_hash);
        } else {
            self.scroll.insert(node_hash, offset);
        }
    }

    pub fn resize(&self, key: u64) -> Option<f32> {
        self.resize.get(&key).copied()
    }

    pub fn store_resize(&mut self, key: u64, value: f32) {
        if value.is_finite() {
            self.resize.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.scroll.len() + self.resize.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scroll.is_empty() && self.resize.is_empty()
    }

    pub fn clear(&mut self) {
        self.scroll.clear();
        self.resize.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serialized form
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
struct LayoutDocument {
    scroll: IndexMap<String, [f32; 2]>,
    resize: IndexMap<String, f32>,
}

fn parse_key(key: &str) -> Result<u64, String> {
    u64::from_str_radix(key, 16).map_err(|_| format!("invalid layout key '{key}'"))
}

impl TryFrom<LayoutDocument> for LayoutMemory {
    type Error = String;

    fn try_from(doc: LayoutDocument) -> Result<Self, Self::Error> {
        let scroll = doc
            .scroll
            .into_iter()
            .map(|(k, v)| Ok((parse_key(&k)?, v)))
            .collect::<Result<_, String>>()?;
        let resize = doc
            .resize
            .into_iter()
            .map(|(k, v)| Ok((parse_key(&k)?, v)))
            .collect::<Result<_, String>>()?;
        Ok(Self { scroll, resize })
    }
}

impl From<LayoutMemory> for LayoutDocument {
    fn from(memory: LayoutMemory) -> Self {
        Self {
            scroll: memory
                .scroll
                .into_iter()
                .map(|(k, v)| (format!("{k:016x}"), v))
                .collect(),
            resize: memory
                .resize
                .into_iter()
                .map(|(k, v)| (format!("{k:016x}"), v))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_scroll_is_not_stored() {
        let mut m = LayoutMemory::new();
        m.store_scroll(1, [0.0, 5.0]);
        assert_eq!(m.scroll(1), Some([0.0, 5.0]));
        m.store_scroll(1, [0.0, 0.0]);
        assert_eq!(m.scroll(1), None);
        assert!(m.is_empty());
    }

    #[test]
    fn test_json_uses_hex_keys() {
        let mut m = LayoutMemory::new();
        m.store_scroll(0xabc, [1.0, 2.0]);
        m.store_resize(u64::MAX, 3.5);

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["scroll"]["0000000000000abc"][1], 2.0);
        assert_eq!(json["resize"]["ffffffffffffffff"], 3.5);

        let back: LayoutMemory = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_missing_sections_default() {
        let m: LayoutMemory = serde_json::from_str("{}").unwrap();
        assert!(m.is_empty());
        assert!(serde_json::from_str::<LayoutMemory>(r#"{"resize": {"xyz": 1.0}}"#).is_err());
    }
}
