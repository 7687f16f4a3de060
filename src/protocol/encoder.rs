//! Zero-Allocation Payload Builder
//!
//! Sisi device: measurement di-append ke buffer pre-allocated dengan
//! kapasitas satu uplink. Tidak ada alokasi setelah inisialisasi.
//! Record yang tidak muat tidak ditulis sama sekali.

use tracing::{debug, warn};

use super::record::{pack_name, RecordKind, NAME_LEN, PROTOCOL_VERSION};
use super::value::{Scalar, ValueType, MAX_FIELD_SIZE};
use crate::config::EncoderConfig;
use crate::error::EncodeError;

/// Kapasitas default: hex dari payload harus di bawah 242 byte modem LoRaWAN
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 120;
/// Name record untuk error code device
pub const ERROR_CODE_NAME: &str = "ERR";

/// Agregat sample dalam satu interval
///
/// `samplecount` adalah jumlah sample yang dikonfigurasi untuk measurement,
/// `count` jumlah yang benar-benar terkumpul. Bentuk record ditentukan
/// oleh `samplecount`: 1 menjadi Single, selain itu Triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate<T> {
    pub sum: T,
    pub min: T,
    pub max: T,
    pub count: u32,
    pub samplecount: u32,
}

impl<T: Copy> Aggregate<T> {
    /// Measurement dengan satu sample per interval: dikirim sebagai Single
    pub fn single(value: T) -> Self {
        Self {
            sum: value,
            min: value,
            max: value,
            count: 1,
            samplecount: 1,
        }
    }

    #[inline(always)]
    pub fn is_single(&self) -> bool {
        self.samplecount == 1
    }
}

/// Measurement yang siap dikirim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample {
    Integer(Aggregate<i64>),
    /// Fixed point, dalam seperseribu
    Float(Aggregate<i32>),
    Text(String),
}

/// Pre-allocated payload buffer
///
/// Byte 0 selalu protocol version.
pub struct PayloadBuilder {
    buffer: Box<[u8]>,
    write_pos: usize,
}

impl PayloadBuilder {
    /// Membuat builder dengan kapasitas total tertentu (termasuk version byte)
    pub fn new(capacity: usize) -> Self {
        let mut buffer = vec![0u8; capacity.max(1)].into_boxed_slice();
        buffer[0] = PROTOCOL_VERSION;
        Self {
            buffer,
            write_pos: 1,
        }
    }

    pub fn with_config(config: &EncoderConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Reset builder untuk uplink berikutnya
    #[inline(always)]
    pub fn reset(&mut self) {
        self.write_pos = 1;
    }

    /// Record Single dengan tipe eksplisit
    pub fn append_single(
        &mut self,
        name: &str,
        ty: ValueType,
        value: &Scalar,
    ) -> Result<(), EncodeError> {
        let raw = ty.encode(value)?;
        self.append_record(name, RecordKind::Single, &[(ty, raw)])
    }

    /// Record Triple (value, min, max), tiap field dengan tipe sendiri
    pub fn append_triple(
        &mut self,
        name: &str,
        fields: &[(ValueType, Scalar); 3],
    ) -> Result<(), EncodeError> {
        let [value, min, max] = fields;
        let encoded = [
            (value.0, value.0.encode(&value.1)?),
            (min.0, min.0.encode(&min.1)?),
            (max.0, max.0.encode(&max.1)?),
        ];
        self.append_record(name, RecordKind::Triple, &encoded)
    }

    /// Append measurement dengan tipe terkecil yang muat
    ///
    /// Measurement dengan `samplecount == 1` dikirim sebagai Single,
    /// selain itu sebagai Triple (mean, min, max) walaupun baru
    /// terkumpul satu sample.
    pub fn append_measurement(&mut self, name: &str, sample: &Sample) -> Result<(), EncodeError> {
        match sample {
            Sample::Integer(agg) => {
                if agg.count == 0 {
                    return Err(EncodeError::NoSamples);
                }
                let compressed = |v: i64| (ValueType::smallest_for(v), Scalar::Signed(v));
                if agg.is_single() {
                    let (ty, value) = compressed(agg.sum);
                    return self.append_single(name, ty, &value);
                }
                let mean = agg.sum / i64::from(agg.count);
                let fields = [compressed(mean), compressed(agg.min), compressed(agg.max)];
                self.append_triple(name, &fields)
            }
            Sample::Float(agg) => {
                if agg.count == 0 {
                    return Err(EncodeError::NoSamples);
                }
                let fixed = |milli: i64| -> Result<_, EncodeError> {
                    Ok((ValueType::Float, ValueType::Float.encode_fixed(milli)?))
                };
                if agg.is_single() {
                    let field = fixed(i64::from(agg.sum))?;
                    return self.append_record(name, RecordKind::Single, &[field]);
                }
                let mean = i64::from(agg.sum) / i64::from(agg.count);
                let encoded = [
                    fixed(mean)?,
                    fixed(i64::from(agg.min))?,
                    fixed(i64::from(agg.max))?,
                ];
                self.append_record(name, RecordKind::Triple, &encoded)
            }
            Sample::Text(text) => {
                self.append_single(name, ValueType::Str, &Scalar::Text(text.clone()))
            }
        }
    }

    /// Record error code device, name `ERR`
    pub fn append_error_code(&mut self, code: u8) -> Result<(), EncodeError> {
        let code = i64::from(code);
        self.append_single(
            ERROR_CODE_NAME,
            ValueType::smallest_for(code),
            &Scalar::Signed(code),
        )
    }

    /// Field sudah di-encode: error range tidak pernah menyentuh buffer
    fn append_record(
        &mut self,
        name: &str,
        kind: RecordKind,
        encoded: &[(ValueType, [u8; MAX_FIELD_SIZE])],
    ) -> Result<(), EncodeError> {
        let raw_name = pack_name(name)?;

        let needed = NAME_LEN + 1 + encoded.iter().map(|(ty, _)| 1 + ty.size()).sum::<usize>();
        let available = self.available();
        if needed > available {
            warn!(name, needed, available, "payload full, record dropped");
            return Err(EncodeError::BufferFull { needed, available });
        }

        self.put(&raw_name);
        self.put(&[kind as u8]);
        for (ty, raw) in encoded {
            self.put(&[*ty as u8]);
            self.put(&raw[..ty.size()]);
        }

        debug!(name, ?kind, len = needed, "record appended");
        Ok(())
    }

    #[inline(always)]
    fn put(&mut self, bytes: &[u8]) {
        let end = self.write_pos + bytes.len();
        self.buffer[self.write_pos..end].copy_from_slice(bytes);
        self.write_pos = end;
    }

    /// Get current buffer content
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.write_pos]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.write_pos
    }

    /// Belum ada record selain version byte
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.write_pos <= 1
    }

    /// Available space in buffer
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.write_pos
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_CAPACITY)
    }
}
