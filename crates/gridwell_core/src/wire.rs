//! Binary wire codec
//!
//! Everything is little-endian. Scalars travel as a 1-byte tag plus an
//! 8-byte payload; byte strings as a tag, a `u64` length and the raw bytes.
//! An argument list is a `u64` count followed by that many tagged values.
//!
//! ```text
//! ┌──────┬──────────────────────┐   ┌──────┬────────────┬───────────┐
//! │ tag  │ payload (8 bytes LE) │   │ 0x04 │ len (u64)  │ bytes ... │
//! └──────┴──────────────────────┘   └──────┴────────────┴───────────┘
//! ```

use std::io::{Read, Write};

use crate::error::{WireError, WireResult};
use crate::value::{ArgType, TypedArg};

/// Upper bound on any single length prefix (64 MiB).
pub const MAX_FIELD_LEN: u64 = 64 * 1024 * 1024;

/// Upper bound on the number of arguments in one list.
pub const MAX_ARG_COUNT: u64 = 4096;

pub fn read_u64<R: Read + ?Sized>(r: &mut R) -> WireResult<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn write_u64<W: Write + ?Sized>(w: &mut W, v: u64) -> WireResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn read_i64<R: Read + ?Sized>(r: &mut R) -> WireResult<i64> {
    read_u64(r).map(|v| v as i64)
}

pub fn write_i64<W: Write + ?Sized>(w: &mut W, v: i64) -> WireResult<()> {
    write_u64(w, v as u64)
}

/// Read a `u64` length followed by that many bytes.
pub fn read_bytes<R: Read + ?Sized>(r: &mut R) -> WireResult<Vec<u8>> {
    let len = read_u64(r)?;
    if len > MAX_FIELD_LEN {
        return Err(WireError::TooLarge {
            len,
            limit: MAX_FIELD_LEN,
        });
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn write_bytes<W: Write + ?Sized>(w: &mut W, bytes: &[u8]) -> WireResult<()> {
    write_u64(w, bytes.len() as u64)?;
    w.write_all(bytes)?;
    Ok(())
}

pub fn read_string<R: Read + ?Sized>(r: &mut R) -> WireResult<String> {
    String::from_utf8(read_bytes(r)?).map_err(|_| WireError::InvalidUtf8)
}

/// Encode one tagged argument.
pub fn write_arg<W: Write + ?Sized>(w: &mut W, arg: &TypedArg) -> WireResult<()> {
    w.write_all(&[arg.arg_type().tag()])?;
    match arg {
        TypedArg::Bytes(bytes) => write_bytes(w, bytes),
        scalar => {
            // Every non-bytes variant has a scalar payload.
            let bits = scalar.scalar_bits().unwrap_or_default();
            write_u64(w, bits)
        }
    }
}

/// Decode one tagged argument.
pub fn read_arg<R: Read + ?Sized>(r: &mut R) -> WireResult<TypedArg> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;
    let ty = ArgType::from_tag(tag[0]).ok_or(WireError::UnknownTag(tag[0]))?;
    match ty {
        ArgType::Bytes => Ok(TypedArg::Bytes(read_bytes(r)?)),
        scalar => {
            let bits = read_u64(r)?;
            TypedArg::from_scalar_bits(scalar, bits).ok_or(WireError::UnknownTag(tag[0]))
        }
    }
}

/// Encode a counted argument list.
pub fn write_args<W: Write + ?Sized>(w: &mut W, args: &[TypedArg]) -> WireResult<()> {
    write_u64(w, args.len() as u64)?;
    for arg in args {
        write_arg(w, arg)?;
    }
    Ok(())
}

/// Decode a counted argument list.
pub fn read_args<R: Read + ?Sized>(r: &mut R) -> WireResult<Vec<TypedArg>> {
    let count = read_u64(r)?;
    if count > MAX_ARG_COUNT {
        return Err(WireError::TooLarge {
            len: count,
            limit: MAX_ARG_COUNT,
        });
    }
    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        args.push(read_arg(r)?);
    }
    Ok(args)
}

/// Encode an argument list into a fresh buffer.
pub fn encode_args(args: &[TypedArg]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + args.len() * 9);
    // Writing into a Vec cannot fail.
    let _ = write_args(&mut buf, args);
    buf
}

/// Decode an argument list from a complete buffer; trailing bytes are rejected.
pub fn decode_args(mut bytes: &[u8]) -> WireResult<Vec<TypedArg>> {
    let args = read_args(&mut bytes)?;
    if !bytes.is_empty() {
        return Err(WireError::TrailingBytes(bytes.len()));
    }
    Ok(args)
}

/// Encode a single argument into a fresh buffer.
pub fn encode_arg(arg: &TypedArg) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    let _ = write_arg(&mut buf, arg);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_layout() {
        let bytes = encode_arg(&TypedArg::Int64(-2));
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..], &(-2i64).to_le_bytes());

        let bytes = encode_arg(&TypedArg::Float32(1.0));
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..5], &1.0f32.to_bits().to_le_bytes());
        assert_eq!(&bytes[5..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_bytes_layout() {
        let bytes = encode_arg(&TypedArg::text("ab"));
        assert_eq!(bytes[0], 4);
        assert_eq!(&bytes[1..9], &2u64.to_le_bytes());
        assert_eq!(&bytes[9..], b"ab");
    }

    #[test]
    fn test_list_preserves_values_bit_for_bit() {
        let args = vec![
            TypedArg::Int64(i64::MIN),
            TypedArg::Float64(f64::from_bits(0x7FF8_0000_0000_0001)),
            TypedArg::Float32(-0.0),
            TypedArg::Bytes(vec![0, 255, 7]),
            TypedArg::Bytes(Vec::new()),
        ];
        let decoded = decode_args(&encode_args(&args)).unwrap();
        assert_eq!(decoded.len(), args.len());
        for (a, b) in args.iter().zip(&decoded) {
            assert_eq!(a.arg_type(), b.arg_type());
            assert_eq!(a.scalar_bits(), b.scalar_bits());
            assert_eq!(a.as_bytes(), b.as_bytes());
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut bytes = encode_args(&[TypedArg::Int64(1)]);
        bytes[8] = 9;
        assert!(matches!(decode_args(&bytes), Err(WireError::UnknownTag(9))));
    }

    #[test]
    fn test_short_read_is_disconnect() {
        let bytes = encode_args(&[TypedArg::Int64(1)]);
        let err = decode_args(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut buf = Vec::new();
        buf.push(4u8);
        buf.extend_from_slice(&(MAX_FIELD_LEN + 1).to_le_bytes());
        assert!(matches!(
            read_arg(&mut buf.as_slice()),
            Err(WireError::TooLarge { .. })
        ));
    }
}
