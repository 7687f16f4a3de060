//! Value Types: satu byte tag per scalar
//!
//! Tag menentukan lebar di wire dan cara interpretasi:
//! ┌──────┬────────┬───────┬──────────────────────────────┐
//! │ Tag  │ Tipe   │ Lebar │ Decoding                     │
//! ├──────┼────────┼───────┼──────────────────────────────┤
//! │ 0x01 │ U8     │ 1     │ raw byte                     │
//! │ 0x02 │ U16    │ 2     │ little-endian                │
//! │ 0x03 │ U32    │ 4     │ little-endian                │
//! │ 0x04 │ U64    │ 8     │ little-endian                │
//! │ 0x11 │ I8     │ 1     │ two's complement             │
//! │ 0x12 │ I16    │ 2     │ two's complement             │
//! │ 0x13 │ I32    │ 4     │ two's complement             │
//! │ 0x14 │ I64    │ 8     │ two's complement             │
//! │ 0x15 │ Float  │ 4     │ i32 / 1000                   │
//! │ 0x16 │ Double │ 8     │ i64 / 1000                   │
//! │ 0x20 │ Str    │ 8     │ 8 byte Latin-1, tanpa trim   │
//! └──────┴────────┴───────┴──────────────────────────────┘

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Bit penanda tipe signed di tag
pub const SIGNED_BIT: u8 = 0x10;
/// Lebar field string di wire
pub const STR_LEN: usize = 8;
/// Lebar maksimum satu field
pub const MAX_FIELD_SIZE: usize = 8;
/// Fixed point: tiga digit desimal implisit
pub const FIXED_POINT_SCALE: i64 = 1000;

/// Tipe value di wire
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    U8 = 0x01,
    U16 = 0x02,
    U32 = 0x03,
    U64 = 0x04,
    I8 = 0x11,
    I16 = 0x12,
    I32 = 0x13,
    I64 = 0x14,
    /// 32-bit fixed point, thousandths
    Float = 0x15,
    /// 64-bit fixed point, thousandths
    Double = 0x16,
    /// 8 raw characters
    Str = 0x20,
}

impl ValueType {
    pub const ALL: [ValueType; 11] = [
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::Float,
        Self::Double,
        Self::Str,
    ];

    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::U8),
            0x02 => Some(Self::U16),
            0x03 => Some(Self::U32),
            0x04 => Some(Self::U64),
            0x11 => Some(Self::I8),
            0x12 => Some(Self::I16),
            0x13 => Some(Self::I32),
            0x14 => Some(Self::I64),
            0x15 => Some(Self::Float),
            0x16 => Some(Self::Double),
            0x20 => Some(Self::Str),
            _ => None,
        }
    }

    /// Lebar value dalam bytes (tanpa tag)
    #[inline(always)]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::Float => 4,
            Self::U64 | Self::I64 | Self::Double => 8,
            Self::Str => STR_LEN,
        }
    }

    #[inline(always)]
    pub const fn is_signed(self) -> bool {
        (self as u8) & SIGNED_BIT != 0
    }

    /// Decode raw bytes. `raw.len()` harus sama dengan `self.size()`.
    pub fn decode(self, raw: &[u8]) -> Scalar {
        match self {
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => Scalar::Unsigned(le_unsigned(raw)),
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => Scalar::Signed(le_signed(raw)),
            Self::Float | Self::Double => {
                Scalar::Decimal(le_signed(raw) as f64 / FIXED_POINT_SCALE as f64)
            }
            Self::Str => Scalar::Text(raw.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode scalar ke raw bytes. Hanya `self.size()` byte pertama yang valid.
    ///
    /// String lebih dari 8 karakter dipotong, yang lebih pendek di-pad NUL.
    pub fn encode(self, value: &Scalar) -> Result<[u8; MAX_FIELD_SIZE], EncodeError> {
        let bits = self.size() * 8;
        match self {
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => {
                let v = match value {
                    Scalar::Unsigned(u) => *u,
                    Scalar::Signed(i) if *i >= 0 => *i as u64,
                    _ => return Err(EncodeError::out_of_range(self, value)),
                };
                if bits < 64 && v >> bits != 0 {
                    return Err(EncodeError::out_of_range(self, value));
                }
                Ok(v.to_le_bytes())
            }
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => {
                let v = match value {
                    Scalar::Signed(i) => *i,
                    Scalar::Unsigned(u) => {
                        i64::try_from(*u).map_err(|_| EncodeError::out_of_range(self, value))?
                    }
                    _ => return Err(EncodeError::out_of_range(self, value)),
                };
                signed_to_raw(self, v, value)
            }
            Self::Float | Self::Double => {
                let milli = match value {
                    Scalar::Decimal(f) => {
                        let scaled = (f * FIXED_POINT_SCALE as f64).round();
                        let in_range = scaled >= i64::MIN as f64 && scaled < i64::MAX as f64;
                        if !scaled.is_finite() || !in_range {
                            return Err(EncodeError::out_of_range(self, value));
                        }
                        Some(scaled as i64)
                    }
                    Scalar::Signed(i) => i.checked_mul(FIXED_POINT_SCALE),
                    Scalar::Unsigned(u) => i64::try_from(*u)
                        .ok()
                        .and_then(|i| i.checked_mul(FIXED_POINT_SCALE)),
                    Scalar::Text(_) => None,
                }
                .ok_or_else(|| EncodeError::out_of_range(self, value))?;
                self.encode_fixed(milli)
            }
            Self::Str => {
                let text = value
                    .as_str()
                    .ok_or_else(|| EncodeError::out_of_range(self, value))?;
                let mut raw = [0u8; MAX_FIELD_SIZE];
                for (slot, c) in raw.iter_mut().zip(text.chars()) {
                    *slot = latin1(c)?;
                }
                Ok(raw)
            }
        }
    }

    /// Encode fixed point mentah (seperseribu) untuk `Float` / `Double`
    ///
    /// Nilai ditulis apa adanya, tanpa konversi lewat f64.
    pub fn encode_fixed(self, milli: i64) -> Result<[u8; MAX_FIELD_SIZE], EncodeError> {
        let value = Scalar::Decimal(milli as f64 / FIXED_POINT_SCALE as f64);
        match self {
            Self::Float | Self::Double => signed_to_raw(self, milli, &value),
            _ => Err(EncodeError::out_of_range(self, value)),
        }
    }

    /// Tipe terkecil untuk integer (kompresi payload di device)
    ///
    /// Nilai positif memakai unsigned, nol dan negatif memakai signed.
    pub fn smallest_for(value: i64) -> Self {
        if value > 0 {
            if value > i64::from(u32::MAX) {
                Self::U64
            } else if value > i64::from(u16::MAX) {
                Self::U32
            } else if value > i64::from(u8::MAX) {
                Self::U16
            } else {
                Self::U8
            }
        } else if value < i64::from(i32::MIN) {
            Self::I64
        } else if value < i64::from(i16::MIN) {
            Self::I32
        } else if value < i64::from(i8::MIN) {
            Self::I16
        } else {
            Self::I8
        }
    }
}

/// Little-endian unsigned, lebar 1..=8 byte
#[inline(always)]
fn le_unsigned(raw: &[u8]) -> u64 {
    raw.iter().rev().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Little-endian two's complement, lebar 1..=8 byte
#[inline(always)]
fn le_signed(raw: &[u8]) -> i64 {
    let bits = raw.len() * 8;
    let value = le_unsigned(raw);
    if bits == 0 || bits >= 64 {
        return value as i64;
    }
    if (value >> (bits - 1)) & 1 == 1 {
        value as i64 - (1i64 << bits)
    } else {
        value as i64
    }
}

fn signed_to_raw(
    ty: ValueType,
    v: i64,
    value: &Scalar,
) -> Result<[u8; MAX_FIELD_SIZE], EncodeError> {
    let bits = ty.size() * 8;
    if bits < 64 {
        let max = (1i64 << (bits - 1)) - 1;
        let min = -(1i64 << (bits - 1));
        if v < min || v > max {
            return Err(EncodeError::out_of_range(ty, value));
        }
    }
    Ok((v as u64).to_le_bytes())
}

#[inline]
pub(crate) fn latin1(c: char) -> Result<u8, EncodeError> {
    u8::try_from(u32::from(c)).map_err(|_| EncodeError::NotLatin1(c))
}

/// Satu nilai hasil decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Unsigned(u64),
    Signed(i64),
    /// Fixed point yang sudah dibagi 1000
    Decimal(f64),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(u) => Some(*u as f64),
            Self::Signed(i) => Some(*i as f64),
            Self::Decimal(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Unsigned(u) => i64::try_from(*u).ok(),
            Self::Signed(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(u) => write!(f, "{u}"),
            Self::Signed(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(impl From<$t> for Scalar {
            fn from(v: $t) -> Self {
                Self::$variant(<$target>::from(v))
            }
        })*
    };
}

scalar_from!(Unsigned as u64: u8, u16, u32, u64);
scalar_from!(Signed as i64: i8, i16, i32, i64);
scalar_from!(Decimal as f64: f32, f64);
scalar_from!(Text as String: &str, String);
