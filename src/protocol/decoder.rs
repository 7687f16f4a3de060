//! Zero-Copy Record Decoder
//!
//! Decode langsung dari buffer uplink, record demi record.
//! Setiap read di-bounds-check; tidak ada read di luar buffer.

use tracing::{debug, warn};

use super::record::{parse_name, Readings, Record, RecordKind, RecordValue, NAME_LEN};
use super::value::{Scalar, ValueType};
use crate::config::DecoderConfig;
use crate::error::DecodeError;

/// Cursor di atas satu buffer uplink
pub struct Decoder<'a> {
    buffer: &'a [u8],
    read_pos: usize,
    version: u8,
    stopped_at: Option<u8>,
    done: bool,
}

impl<'a> Decoder<'a> {
    /// Membuat decoder dari buffer
    ///
    /// Buffer kosong menghasilkan `BufferUnderrun`, versi yang tidak
    /// diterima menghasilkan `UnsupportedProtocolVersion`. Gate versi
    /// dicek sebelum batas panjang.
    pub fn new(buffer: &'a [u8], config: &DecoderConfig) -> Result<Self, DecodeError> {
        let version = *buffer
            .first()
            .ok_or_else(|| DecodeError::underrun(0, 1, 0))?;
        if !config.accepts(version) {
            return Err(DecodeError::UnsupportedProtocolVersion(version));
        }

        if buffer.len() > config.max_payload_len {
            return Err(DecodeError::PayloadTooLarge {
                size: buffer.len(),
                max: config.max_payload_len,
            });
        }

        Ok(Self {
            buffer,
            read_pos: 1,
            version,
            stopped_at: None,
            done: false,
        })
    }

    /// Decode record berikutnya
    ///
    /// `Ok(None)` di akhir buffer, atau saat kind byte tidak dikenal
    /// (soft stop, lihat `stopped_at`). Setelah error, decoder berhenti.
    pub fn next_record(&mut self) -> Result<Option<Record>, DecodeError> {
        if self.done || self.read_pos >= self.buffer.len() {
            return Ok(None);
        }

        let result = self.read_record();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    fn read_record(&mut self) -> Result<Option<Record>, DecodeError> {
        let record_start = self.read_pos;
        let name = parse_name(self.take(NAME_LEN)?);

        let kind_byte = self.read_u8()?;
        let Some(kind) = RecordKind::from_u8(kind_byte) else {
            warn!(
                kind = kind_byte,
                offset = record_start + NAME_LEN,
                name = %name,
                "unknown record kind, stopping"
            );
            self.stopped_at = Some(kind_byte);
            return Ok(None);
        };

        let value = match kind {
            RecordKind::Single => RecordValue::Single(self.read_field()?),
            RecordKind::Triple => {
                let value = self.read_field()?;
                let min = self.read_field()?;
                let max = self.read_field()?;
                RecordValue::Triple { value, min, max }
            }
        };

        debug!(name = %name, ?kind, offset = record_start, "record decoded");
        Ok(Some(Record { name, value }))
    }

    /// tag (1 byte) + value (size(tag) bytes)
    fn read_field(&mut self) -> Result<Scalar, DecodeError> {
        let offset = self.read_pos;
        let tag = self.read_u8()?;
        let ty = ValueType::from_u8(tag).ok_or_else(|| DecodeError::invalid_tag(tag, offset))?;
        Ok(ty.decode(self.take(ty.size())?))
    }

    #[inline(always)]
    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    #[inline(always)]
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let buffer = self.buffer;
        let start = self.read_pos;
        let raw = buffer
            .get(start..start + n)
            .ok_or_else(|| DecodeError::underrun(start, n, self.remaining()))?;
        self.read_pos += n;
        Ok(raw)
    }

    /// Protocol version dari byte 0
    #[inline(always)]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Remaining bytes
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.read_pos)
    }

    /// Kind byte yang menghentikan decode, kalau ada
    #[inline(always)]
    pub fn stopped_at(&self) -> Option<u8> {
        self.stopped_at
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<Record, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Decode dengan konfigurasi default (versi 1 dan 2)
///
/// Buffer kosong atau versi tidak dikenal menghasilkan map kosong.
pub fn decode(buffer: &[u8]) -> Result<Readings, DecodeError> {
    decode_with(buffer, &DecoderConfig::default())
}

/// Decode seluruh buffer; error di record mana pun menggagalkan decode
pub fn decode_with(buffer: &[u8], config: &DecoderConfig) -> Result<Readings, DecodeError> {
    let Some(mut decoder) = open(buffer, config)? else {
        return Ok(Readings::new());
    };

    let mut readings = Readings::new();
    while let Some(record) = decoder.next_record()? {
        readings.push(record);
    }
    Ok(readings)
}

/// Decode sebanyak mungkin; record sebelum error tetap dikembalikan
pub fn decode_partial(buffer: &[u8], config: &DecoderConfig) -> (Readings, Option<DecodeError>) {
    let mut readings = Readings::new();
    let mut decoder = match open(buffer, config) {
        Ok(Some(decoder)) => decoder,
        Ok(None) => return (readings, None),
        Err(e) => return (readings, Some(e)),
    };

    loop {
        match decoder.next_record() {
            Ok(Some(record)) => readings.push(record),
            Ok(None) => return (readings, None),
            Err(e) => return (readings, Some(e)),
        }
    }
}

/// Gate versi: buffer kosong dan versi asing bukan error untuk caller
fn open<'a>(
    buffer: &'a [u8],
    config: &DecoderConfig,
) -> Result<Option<Decoder<'a>>, DecodeError> {
    if buffer.is_empty() {
        return Ok(None);
    }
    match Decoder::new(buffer, config) {
        Ok(decoder) => Ok(Some(decoder)),
        Err(DecodeError::UnsupportedProtocolVersion(version)) => {
            debug!(version, "unsupported protocol version, payload ignored");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Captured from a PM sensor uplink
    const PM_FIXTURE: [u8; 27] = [
        1, 80, 77, 49, 48, 2, 1, 3, 2, 3, 0, 2, 5, 0, 80, 77, 50, 53, 2, 1, 2, 2, 2, 0, 2, 4, 0,
    ];

    fn single(name: &[u8; 4], tag: u8, value: &[u8]) -> Vec<u8> {
        let mut buf = name.to_vec();
        buf.push(RecordKind::Single as u8);
        buf.push(tag);
        buf.extend_from_slice(value);
        buf
    }

    fn payload(records: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = vec![1u8];
        for record in records {
            buf.extend_from_slice(record);
        }
        buf
    }

    #[test]
    fn test_decode_pm_fixture() {
        let readings = decode(&PM_FIXTURE).unwrap();

        let entries: Vec<_> = readings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_i64().unwrap()))
            .collect();
        assert_eq!(
            entries,
            [
                ("PM10", 3),
                ("PM10_min", 3),
                ("PM10_max", 5),
                ("PM25", 2),
                ("PM25_min", 2),
                ("PM25_max", 4),
            ]
        );
    }

    #[test]
    fn test_version_gate() {
        let mut buf = PM_FIXTURE.to_vec();
        buf[0] = 0x99;
        assert!(decode(&buf).unwrap().is_empty());
        assert!(decode(&[]).unwrap().is_empty());

        buf[0] = 2;
        assert_eq!(decode(&buf).unwrap().len(), 6);
        assert!(decode_with(&buf, &DecoderConfig::strict()).unwrap().is_empty());
    }

    #[test]
    fn test_decoder_new_reports_version() {
        let err = Decoder::new(&[7, 0, 0], &DecoderConfig::default()).err();
        assert_eq!(err, Some(DecodeError::UnsupportedProtocolVersion(7)));

        let decoder = Decoder::new(&[2], &DecoderConfig::default()).unwrap();
        assert_eq!(decoder.version(), 2);
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn test_unknown_kind_soft_stop() {
        let mut buf = payload(&[single(b"CNT1", 0x01, &[9])]);
        buf.extend_from_slice(b"BAD\0");
        buf.push(0x03);
        buf.extend_from_slice(&[0x01, 0x05]);

        let readings = decode(&buf).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings.get("CNT1"), Some(&Scalar::Unsigned(9)));

        let mut decoder = Decoder::new(&buf, &DecoderConfig::default()).unwrap();
        assert!(decoder.next_record().unwrap().is_some());
        assert!(decoder.next_record().unwrap().is_none());
        assert_eq!(decoder.stopped_at(), Some(0x03));
        // tetap berhenti
        assert!(decoder.next_record().unwrap().is_none());
    }

    #[test]
    fn test_triple_with_mixed_types() {
        let mut buf = vec![1u8];
        buf.extend_from_slice(b"TEMP");
        buf.push(RecordKind::Triple as u8);
        buf.extend_from_slice(&[0x02, 10, 0]);
        buf.extend_from_slice(&[0x11, 0xFE]);
        buf.push(0x15);
        buf.extend_from_slice(&22500i32.to_le_bytes());

        let readings = decode(&buf).unwrap();
        assert_eq!(readings.get("TEMP"), Some(&Scalar::Unsigned(10)));
        assert_eq!(readings.get("TEMP_min"), Some(&Scalar::Signed(-2)));
        assert_eq!(readings.get("TEMP_max"), Some(&Scalar::Decimal(22.5)));
    }

    #[test]
    fn test_invalid_tag_fails() {
        let buf = payload(&[single(b"CNT1", 0x01, &[1]), single(b"X\0\0\0", 0x42, &[1])]);
        assert_eq!(decode(&buf), Err(DecodeError::invalid_tag(0x42, 13)));

        let (readings, err) = decode_partial(&buf, &DecoderConfig::default());
        assert_eq!(readings.len(), 1);
        assert_eq!(err, Some(DecodeError::invalid_tag(0x42, 13)));
    }

    #[test]
    fn test_truncated_value_underrun() {
        let mut buf = payload(&[single(b"CNT1", 0x03, &[1, 2, 3, 4])]);
        buf.truncate(buf.len() - 2);
        assert_eq!(decode(&buf), Err(DecodeError::underrun(7, 4, 2)));
    }

    #[test]
    fn test_truncated_name_underrun() {
        let mut buf = payload(&[single(b"CNT1", 0x01, &[1])]);
        buf.push(0);
        let (readings, err) = decode_partial(&buf, &DecoderConfig::default());
        assert_eq!(readings.len(), 1);
        assert_eq!(err, Some(DecodeError::underrun(8, 4, 1)));
    }

    #[test]
    fn test_payload_cap() {
        let buf = vec![1u8; 300];
        assert_eq!(
            decode(&buf),
            Err(DecodeError::PayloadTooLarge { size: 300, max: 256 })
        );

        let config = DecoderConfig::default().with_max_payload_len(512);
        assert!(!matches!(
            decode_with(&buf, &config),
            Err(DecodeError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_unaccepted_version_ignored_beyond_cap() {
        let mut buf = vec![0u8; 300];
        buf[0] = 0x99;

        assert!(decode(&buf).unwrap().is_empty());
        let (readings, err) = decode_partial(&buf, &DecoderConfig::default());
        assert!(readings.is_empty());
        assert_eq!(err, None);

        let err = Decoder::new(&buf, &DecoderConfig::default()).err();
        assert_eq!(err, Some(DecodeError::UnsupportedProtocolVersion(0x99)));
    }

    #[test]
    fn test_iterator_fuses_after_error() {
        let buf = payload(&[single(b"A\0\0\0", 0x01, &[1]), single(b"B\0\0\0", 0x77, &[1])]);
        let decoder = Decoder::new(&buf, &DecoderConfig::default()).unwrap();
        let results: Vec<_> = decoder.collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
