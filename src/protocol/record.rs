//! Record Format: satu measurement per record
//!
//! Layout buffer:
//! ┌─────────────────────────────────────────────────────┐
//! │ Protocol version (1 byte)                           │
//! ├─────────────────────────────────────────────────────┤
//! │ Record 1                                            │
//! │   name (4 bytes, NUL-padded)                        │
//! │   kind (1 byte: 1 = Single, 2 = Triple)             │
//! │   [tag (1 byte) + value (size(tag))] x 1 atau x 3   │
//! ├─────────────────────────────────────────────────────┤
//! │ Record 2 ... Record N (tanpa padding/alignment)     │
//! └─────────────────────────────────────────────────────┘

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::{latin1, Scalar};
use crate::error::EncodeError;

pub const PROTOCOL_VERSION: u8 = 1;
/// Lebar field name di wire
pub const NAME_LEN: usize = 4;

pub const MIN_SUFFIX: &str = "_min";
pub const MAX_SUFFIX: &str = "_max";

/// Bentuk record
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Satu value
    Single = 1,
    /// Value + min + max (measurement rata-rata)
    Triple = 2,
}

impl RecordKind {
    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Single),
            2 => Some(Self::Triple),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn field_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Triple => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Single(Scalar),
    Triple { value: Scalar, min: Scalar, max: Scalar },
}

/// Satu record hasil decode
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub value: RecordValue,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self.value {
            RecordValue::Single(_) => RecordKind::Single,
            RecordValue::Triple { .. } => RecordKind::Triple,
        }
    }
}

/// Name dari 4 byte wire. NUL dilewati di posisi mana pun.
pub fn parse_name(raw: &[u8]) -> String {
    raw.iter()
        .filter(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

/// Name ke 4 byte wire, right-padded dengan NUL
pub fn pack_name(name: &str) -> Result<[u8; NAME_LEN], EncodeError> {
    if name.chars().count() > NAME_LEN {
        return Err(EncodeError::NameTooLong(name.to_string()));
    }
    let mut raw = [0u8; NAME_LEN];
    for (slot, c) in raw.iter_mut().zip(name.chars()) {
        *slot = latin1(c).map_err(|_| EncodeError::InvalidName(name.to_string()))?;
    }
    Ok(raw)
}

/// Hasil decode: name -> value, urutan sesuai urutan record di buffer
///
/// Record Triple menambah `name`, `name_min`, `name_max` berurutan.
/// Name yang berulang menimpa value sebelumnya di posisi awalnya.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Readings(IndexMap<String, Scalar>);

impl Readings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand record ke map
    pub fn push(&mut self, record: Record) {
        match record.value {
            RecordValue::Single(value) => {
                self.0.insert(record.name, value);
            }
            RecordValue::Triple { value, min, max } => {
                let min_key = format!("{}{MIN_SUFFIX}", record.name);
                let max_key = format!("{}{MAX_SUFFIX}", record.name);
                self.0.insert(record.name, value);
                self.0.insert(min_key, min);
                self.0.insert(max_key, max);
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Scalar) -> Option<Scalar> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Scalar> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> IndexMap<String, Scalar> {
        self.0
    }

    /// JSON object, bentuk yang dibaca GUI
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl FromIterator<Record> for Readings {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut readings = Self::new();
        readings.extend(iter);
        readings
    }
}

impl Extend<Record> for Readings {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}

impl IntoIterator for Readings {
    type Item = (String, Scalar);
    type IntoIter = indexmap::map::IntoIter<String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Readings {
    type Item = (&'a String, &'a Scalar);
    type IntoIter = indexmap::map::Iter<'a, String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_nul_stripping() {
        assert_eq!(parse_name(&[0x43, 0x43, 0x00, 0x00]), "CC");
        assert_eq!(parse_name(b"PM10"), "PM10");
        // NUL di tengah juga dilewati
        assert_eq!(parse_name(&[b'A', 0, b'B', 0]), "AB");
    }

    #[test]
    fn test_pack_name() {
        assert_eq!(pack_name("CC").unwrap(), [b'C', b'C', 0, 0]);
        assert_eq!(pack_name("TEMP").unwrap(), *b"TEMP");
        assert_eq!(pack_name("").unwrap(), [0; 4]);
        assert_eq!(
            pack_name("LONGNAME"),
            Err(EncodeError::NameTooLong("LONGNAME".into()))
        );
        assert_eq!(pack_name("T€"), Err(EncodeError::InvalidName("T€".into())));
    }

    #[test]
    fn test_kind_from_u8() {
        assert_eq!(RecordKind::from_u8(1), Some(RecordKind::Single));
        assert_eq!(RecordKind::from_u8(2), Some(RecordKind::Triple));
        assert_eq!(RecordKind::from_u8(0), None);
        assert_eq!(RecordKind::from_u8(3), None);
        assert_eq!(RecordKind::Triple.field_count(), 3);
    }

    #[test]
    fn test_triple_expansion_order() {
        let readings: Readings = [
            Record {
                name: "TEMP".into(),
                value: RecordValue::Triple {
                    value: Scalar::Unsigned(10),
                    min: Scalar::Unsigned(2),
                    max: Scalar::Unsigned(20),
                },
            },
            Record {
                name: "CC".into(),
                value: RecordValue::Single(Scalar::Signed(-1)),
            },
        ]
        .into_iter()
        .collect();

        let keys: Vec<_> = readings.keys().collect();
        assert_eq!(keys, ["TEMP", "TEMP_min", "TEMP_max", "CC"]);
        assert_eq!(readings.get("TEMP_max"), Some(&Scalar::Unsigned(20)));
    }

    #[test]
    fn test_repeated_name_last_write_wins() {
        let mut readings = Readings::new();
        readings.push(Record {
            name: "CNT1".into(),
            value: RecordValue::Single(Scalar::Unsigned(1)),
        });
        readings.push(Record {
            name: "BAT".into(),
            value: RecordValue::Single(Scalar::Unsigned(90)),
        });
        readings.push(Record {
            name: "CNT1".into(),
            value: RecordValue::Single(Scalar::Unsigned(7)),
        });

        assert_eq!(readings.len(), 2);
        assert_eq!(readings.get("CNT1"), Some(&Scalar::Unsigned(7)));
        // posisi pertama dipertahankan
        assert_eq!(readings.keys().next(), Some("CNT1"));
    }

    #[test]
    fn test_readings_json() {
        let mut readings = Readings::new();
        readings.insert("TMP2", Scalar::Decimal(4.827));
        readings.insert("FW", Scalar::Text("abc".into()));
        assert_eq!(readings.to_json().unwrap(), r#"{"TMP2":4.827,"FW":"abc"}"#);
    }
}
