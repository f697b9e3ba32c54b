//! Return buffers of in-flight calls
//!
//! Every export call gets a fresh [`CallReturn`]. Sub-renders nest calls, so
//! the buffers live on a stack and the `SetReturn` family always writes to
//! the innermost one.

use gridwell_core::TypedArg;

/// What one export call handed back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallReturn {
    /// Direct result of the export.
    pub primary: Option<TypedArg>,
    /// Bytes written with `SetReturn`/`AppendReturn`.
    pub secondary: Vec<u8>,
}

impl CallReturn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_i64(&self) -> Option<i64> {
        self.primary.as_ref().and_then(TypedArg::as_i64)
    }

    /// True when the primary return is a non-zero integer.
    pub fn handled(&self) -> bool {
        self.primary_i64().is_some_and(|v| v != 0)
    }

    /// Primary payload followed by the secondary buffer.
    ///
    /// Scalars contribute their 8-byte little-endian payload, bytes their
    /// raw content.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.secondary.len());
        match &self.primary {
            Some(TypedArg::Bytes(b)) => out.extend_from_slice(b),
            Some(scalar) => {
                if let Some(bits) = scalar.scalar_bits() {
                    out.extend_from_slice(&bits.to_le_bytes());
                }
            }
            None => {}
        }
        out.extend_from_slice(&self.secondary);
        out
    }

    pub fn into_secondary(self) -> Vec<u8> {
        self.secondary
    }
}

/// Stack of return buffers, innermost call last.
#[derive(Debug, Default)]
pub struct PendingStack {
    stack: Vec<CallReturn>,
}

impl PendingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Start a call with empty buffers.
    pub fn push(&mut self) {
        self.stack.push(CallReturn::new());
    }

    pub fn pop(&mut self) -> CallReturn {
        self.stack.pop().unwrap_or_default()
    }

    fn top(&mut self) -> Option<&mut CallReturn> {
        self.stack.last_mut()
    }

    pub fn set_primary(&mut self, value: Option<TypedArg>) {
        if let Some(top) = self.top() {
            top.primary = value;
        }
    }

    pub fn set(&mut self, bytes: Vec<u8>) {
        if let Some(top) = self.top() {
            top.secondary = bytes;
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        if let Some(top) = self.top() {
            top.secondary.extend_from_slice(bytes);
        }
    }

    pub fn clear(&mut self) {
        if let Some(top) = self.top() {
            top.secondary.clear();
        }
    }
}
