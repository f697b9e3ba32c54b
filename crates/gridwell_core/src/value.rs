//! Typed values crossing the plugin call bridge
//!
//! `TypedArg` is what a plugin export receives and what every opcode
//! request/reply carries. Both plugin backends move the same values, so the
//! host-side handlers never care where a call came from.
//!
//! ```
//! use gridwell_core::value::{ArgType, Coercion, IntoArgs, TypedArg};
//!
//! let args = ("panel", 3i64, 0.5f32).into_args();
//! assert_eq!(args[1].as_i64(), Some(3));
//!
//! // Loosely typed plugins may pass an integer where a float is declared.
//! let bits = TypedArg::Int64(1.0f32.to_bits() as i64);
//! assert!(bits.clone().coerce(ArgType::Float32, Coercion::Strict).is_err());
//! let f = bits.coerce(ArgType::Float32, Coercion::Reinterpret).unwrap();
//! assert_eq!(f.as_f32(), Some(1.0));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Declared type of an export parameter or opcode field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgType {
    Int64,
    Float32,
    Float64,
    Bytes,
}

impl ArgType {
    /// One-byte tag used by the wire codec.
    pub const fn tag(self) -> u8 {
        match self {
            ArgType::Int64 => 1,
            ArgType::Float32 => 2,
            ArgType::Float64 => 3,
            ArgType::Bytes => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ArgType::Int64),
            2 => Some(ArgType::Float32),
            3 => Some(ArgType::Float64),
            4 => Some(ArgType::Bytes),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ArgType::Int64 => "Int64",
            ArgType::Float32 => "Float32",
            ArgType::Float64 => "Float64",
            ArgType::Bytes => "Bytes",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How to treat an argument whose tag disagrees with the declared type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Reject mismatched scalars.
    #[default]
    Strict,
    /// Reinterpret the 8-byte scalar payload as the declared type.
    Reinterpret,
}

/// A single call argument or return value.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedArg {
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
}

impl TypedArg {
    pub fn arg_type(&self) -> ArgType {
        match self {
            TypedArg::Int64(_) => ArgType::Int64,
            TypedArg::Float32(_) => ArgType::Float32,
            TypedArg::Float64(_) => ArgType::Float64,
            TypedArg::Bytes(_) => ArgType::Bytes,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.arg_type().name()
    }

    pub fn text(s: impl Into<String>) -> Self {
        TypedArg::Bytes(s.into().into_bytes())
    }

    pub fn flag(b: bool) -> Self {
        TypedArg::Int64(b as i64)
    }

    /// Extract as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedArg::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract as f32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            TypedArg::Float32(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedArg::Float64(v) => Some(*v),
            TypedArg::Float32(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Extract as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TypedArg::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Extract as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            TypedArg::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// The raw 8-byte payload of a scalar, as laid out on the wire.
    pub fn scalar_bits(&self) -> Option<u64> {
        match self {
            TypedArg::Int64(v) => Some(*v as u64),
            TypedArg::Float32(v) => Some(v.to_bits() as u64),
            TypedArg::Float64(v) => Some(v.to_bits()),
            TypedArg::Bytes(_) => None,
        }
    }

    /// Build a scalar of type `ty` from a raw payload.
    pub fn from_scalar_bits(ty: ArgType, bits: u64) -> Option<Self> {
        match ty {
            ArgType::Int64 => Some(TypedArg::Int64(bits as i64)),
            ArgType::Float32 => Some(TypedArg::Float32(f32::from_bits(bits as u32))),
            ArgType::Float64 => Some(TypedArg::Float64(f64::from_bits(bits))),
            ArgType::Bytes => None,
        }
    }

    /// Convert this value to the declared type under the given policy.
    ///
    /// Matching tags pass through. Scalar mismatches are rejected under
    /// [`Coercion::Strict`] and bit-reinterpreted under
    /// [`Coercion::Reinterpret`]. Bytes never convert to or from scalars.
    pub fn coerce(self, expected: ArgType, policy: Coercion) -> Result<Self, ValueError> {
        let actual = self.arg_type();
        if actual == expected {
            return Ok(self);
        }
        let mismatch = ValueError::TypeMismatch { expected, actual };
        if policy == Coercion::Strict {
            return Err(mismatch);
        }
        match self.scalar_bits() {
            Some(bits) => TypedArg::from_scalar_bits(expected, bits).ok_or(mismatch),
            None => Err(mismatch),
        }
    }
}

impl From<i64> for TypedArg {
    fn from(v: i64) -> Self {
        TypedArg::Int64(v)
    }
}

impl From<i32> for TypedArg {
    fn from(v: i32) -> Self {
        TypedArg::Int64(v as i64)
    }
}

impl From<bool> for TypedArg {
    fn from(v: bool) -> Self {
        TypedArg::flag(v)
    }
}

impl From<f32> for TypedArg {
    fn from(v: f32) -> Self {
        TypedArg::Float32(v)
    }
}

impl From<f64> for TypedArg {
    fn from(v: f64) -> Self {
        TypedArg::Float64(v)
    }
}

impl From<Vec<u8>> for TypedArg {
    fn from(v: Vec<u8>) -> Self {
        TypedArg::Bytes(v)
    }
}

impl From<&[u8]> for TypedArg {
    fn from(v: &[u8]) -> Self {
        TypedArg::Bytes(v.to_vec())
    }
}

impl From<String> for TypedArg {
    fn from(v: String) -> Self {
        TypedArg::Bytes(v.into_bytes())
    }
}

impl From<&str> for TypedArg {
    fn from(v: &str) -> Self {
        TypedArg::Bytes(v.as_bytes().to_vec())
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

/// Trait for converting Rust values into an argument list.
pub trait IntoArgs {
    fn into_args(self) -> Vec<TypedArg>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<TypedArg> {
        Vec::new()
    }
}

impl IntoArgs for Vec<TypedArg> {
    fn into_args(self) -> Vec<TypedArg> {
        self
    }
}

macro_rules! impl_into_args_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<TypedArg>),+> IntoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<TypedArg> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

impl_into_args_tuple!(A);
impl_into_args_tuple!(A, B);
impl_into_args_tuple!(A, B, C);
impl_into_args_tuple!(A, B, C, D);
impl_into_args_tuple!(A, B, C, D, E);
impl_into_args_tuple!(A, B, C, D, E, F);
impl_into_args_tuple!(A, B, C, D, E, F, G);
impl_into_args_tuple!(A, B, C, D, E, F, G, H);

/// Trait for extracting a Rust value from a returned argument.
pub trait FromArg: Sized {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError>;
}

impl FromArg for TypedArg {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError> {
        Ok(arg)
    }
}

impl FromArg for i64 {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError> {
        arg.as_i64().ok_or(ValueError::TypeMismatch {
            expected: ArgType::Int64,
            actual: arg.arg_type(),
        })
    }
}

impl FromArg for bool {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError> {
        i64::from_arg(arg).map(|v| v != 0)
    }
}

impl FromArg for f32 {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError> {
        arg.as_f32().ok_or(ValueError::TypeMismatch {
            expected: ArgType::Float32,
            actual: arg.arg_type(),
        })
    }
}

impl FromArg for f64 {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError> {
        arg.as_f64().ok_or(ValueError::TypeMismatch {
            expected: ArgType::Float64,
            actual: arg.arg_type(),
        })
    }
}

impl FromArg for Vec<u8> {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError> {
        let actual = arg.arg_type();
        arg.into_bytes().ok_or(ValueError::TypeMismatch {
            expected: ArgType::Bytes,
            actual,
        })
    }
}

impl FromArg for String {
    fn from_arg(arg: TypedArg) -> Result<Self, ValueError> {
        let bytes = Vec::<u8>::from_arg(arg)?;
        String::from_utf8(bytes).map_err(|_| ValueError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(TypedArg::Int64(42).as_i64(), Some(42));
        assert_eq!(TypedArg::Float32(1.5).as_f32(), Some(1.5));
        assert_eq!(TypedArg::Float32(1.5).as_f64(), Some(1.5));
        assert_eq!(TypedArg::text("hi").as_str(), Some("hi"));
        assert_eq!(TypedArg::Int64(1).as_bytes(), None);
    }

    #[test]
    fn test_into_args_tuples() {
        let args = ("name", 1i64, 2.0f32, 3.0f64, true).into_args();
        assert_eq!(args.len(), 5);
        assert_eq!(args[0].as_str(), Some("name"));
        assert_eq!(args[4].as_i64(), Some(1));
        assert!(().into_args().is_empty());
    }

    #[test]
    fn test_from_arg() {
        assert_eq!(i64::from_arg(TypedArg::Int64(7)).unwrap(), 7);
        assert!(bool::from_arg(TypedArg::Int64(2)).unwrap());
        assert!(f32::from_arg(TypedArg::Int64(2)).is_err());
        assert_eq!(String::from_arg(TypedArg::text("x")).unwrap(), "x");
        assert!(matches!(
            String::from_arg(TypedArg::Bytes(vec![0xFF])),
            Err(ValueError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_strict_coercion_rejects_mismatch() {
        let err = TypedArg::Int64(5)
            .coerce(ArgType::Float64, Coercion::Strict)
            .unwrap_err();
        assert_eq!(
            err,
            ValueError::TypeMismatch {
                expected: ArgType::Float64,
                actual: ArgType::Int64
            }
        );
    }

    #[test]
    fn test_reinterpret_keeps_bit_pattern() {
        let original = 2.75f64;
        let as_int = TypedArg::Float64(original)
            .coerce(ArgType::Int64, Coercion::Reinterpret)
            .unwrap();
        assert_eq!(as_int, TypedArg::Int64(original.to_bits() as i64));

        let back = as_int.coerce(ArgType::Float64, Coercion::Reinterpret).unwrap();
        assert_eq!(back, TypedArg::Float64(original));
    }

    #[test]
    fn test_bytes_never_coerce() {
        assert!(TypedArg::Bytes(vec![1])
            .coerce(ArgType::Int64, Coercion::Reinterpret)
            .is_err());
        assert!(TypedArg::Int64(1)
            .coerce(ArgType::Bytes, Coercion::Reinterpret)
            .is_err());
    }
}
