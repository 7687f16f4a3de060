//! OSM Payload - Tagged Binary Codec untuk uplink OpenSmartMonitor
//!
//! Arsitektur:
//! - Decoder: buffer uplink -> `Readings` (name -> value, urutan terjaga)
//! - Builder: measurement device -> buffer uplink berkapasitas tetap
//! - Command: satu field teks -> payload downlink
//!
//! Semua operasi murni: tidak ada I/O, tidak ada state global.

pub mod config;
pub mod error;
pub mod protocol;

pub use config::{DecoderConfig, EncoderConfig};
pub use error::{DecodeError, EncodeError};
pub use protocol::{
    decode, decode_partial, decode_with, encode_command, parse_command, try_encode_command,
    Aggregate, Decoder, PayloadBuilder, Readings, Record, RecordKind, RecordValue, Sample, Scalar,
    ValueType,
};
