use std::fmt;

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::error::CodecError;

/// Supported field widths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    U32,
    U64,
}

impl Width {
    /// Number of bytes occupied by a field of this width.
    pub const fn bytes(self) -> usize {
        match self {
            Width::U32 => 4,
            Width::U64 => 8,
        }
    }

    /// Map a bit count (32 or 64) to a width.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Width::U32),
            64 => Some(Width::U64),
            _ => None,
        }
    }
}

/// Encode `value` as a little-endian buffer of exactly `width` bytes.
pub fn encode(value: &BigUint, width: Width) -> Result<Vec<u8>, CodecError> {
    encode_le(value, width.bytes())
}

/// Decode a little-endian buffer that must be exactly `width` bytes long.
pub fn decode(buf: &[u8], width: Width) -> Result<BigUint, CodecError> {
    decode_le(buf, width.bytes())
}

fn encode_le(value: &BigUint, width: usize) -> Result<Vec<u8>, CodecError> {
    // minimal big-endian form; zero renders as a single 0x00
    let mut bytes = value.to_bytes_be();
    if bytes.len() > width {
        return Err(CodecError::OutOfRange {
            width,
            needed: bytes.len(),
        });
    }
    bytes.reverse();
    bytes.resize(width, 0);
    Ok(bytes)
}

fn decode_le(buf: &[u8], width: usize) -> Result<BigUint, CodecError> {
    if buf.len() != width {
        return Err(CodecError::InvalidLength {
            expected: width,
            actual: buf.len(),
        });
    }
    Ok(BigUint::from_bytes_le(buf))
}

/// Unsigned integer bound to `N` bytes on the wire.
///
/// The value itself is unbounded; the width is enforced when encoding, so a
/// too-large value surfaces as [`CodecError::OutOfRange`] instead of being
/// truncated.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedWidthUint<const N: usize> {
    value: BigUint,
}

/// 32-bit field.
pub type U32 = FixedWidthUint<4>;
/// 64-bit field.
pub type U64 = FixedWidthUint<8>;

impl<const N: usize> FixedWidthUint<N> {
    pub const WIDTH: usize = N;

    pub fn new(value: impl Into<BigUint>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Largest value representable in `N` bytes.
    pub fn max_value() -> BigUint {
        (BigUint::from(1u8) << (8 * N)) - 1u8
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn into_inner(self) -> BigUint {
        self.value
    }

    /// Render as `N` little-endian bytes.
    pub fn encode(&self) -> Result<[u8; N], CodecError> {
        let bytes = encode_le(&self.value, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    /// Append the encoded field to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.extend_from_slice(&self.encode()?);
        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        decode_le(buf, N).map(|value| Self { value })
    }

    fn out_of_range(&self) -> CodecError {
        CodecError::OutOfRange {
            width: N,
            needed: self.value.to_bytes_be().len(),
        }
    }
}

impl U32 {
    pub fn to_u32(&self) -> Result<u32, CodecError> {
        self.value.to_u32().ok_or_else(|| self.out_of_range())
    }
}

impl U64 {
    pub fn to_u64(&self) -> Result<u64, CodecError> {
        self.value.to_u64().ok_or_else(|| self.out_of_range())
    }
}

impl<const N: usize> From<u32> for FixedWidthUint<N> {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<u64> for FixedWidthUint<N> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<BigUint> for FixedWidthUint<N> {
    fn from(value: BigUint) -> Self {
        Self { value }
    }
}

impl<const N: usize> fmt::Display for FixedWidthUint<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// Read a 32-bit field from the front of `data`, returning it and the rest.
pub fn take_u32(data: &[u8]) -> Result<(u32, &[u8]), CodecError> {
    let (head, rest) = split_field(data, U32::WIDTH)?;
    Ok((U32::decode(head)?.to_u32()?, rest))
}

/// Read a 64-bit field from the front of `data`, returning it and the rest.
pub fn take_u64(data: &[u8]) -> Result<(u64, &[u8]), CodecError> {
    let (head, rest) = split_field(data, U64::WIDTH)?;
    Ok((U64::decode(head)?.to_u64()?, rest))
}

fn split_field(data: &[u8], width: usize) -> Result<(&[u8], &[u8]), CodecError> {
    if data.len() < width {
        return Err(CodecError::InvalidLength {
            expected: width,
            actual: data.len(),
        });
    }
    Ok(data.split_at(width))
}
