//! Protocol Layer: Tagged Binary Records
//!
//! Prinsip desain:
//! - Self-describing: setiap field membawa type tag sendiri
//! - Flat: record back-to-back, tanpa padding atau alignment
//! - Bounds-checked: decode tidak pernah membaca di luar buffer

mod command;
mod decoder;
mod encoder;
mod record;
mod value;

pub use command::{encode_command, parse_command, try_encode_command, MAX_COMMAND_LEN};
pub use decoder::{decode, decode_partial, decode_with, Decoder};
pub use encoder::{Aggregate, PayloadBuilder, Sample, DEFAULT_PAYLOAD_CAPACITY, ERROR_CODE_NAME};
pub use record::{
    pack_name, parse_name, Readings, Record, RecordKind, RecordValue, MAX_SUFFIX, MIN_SUFFIX,
    NAME_LEN, PROTOCOL_VERSION,
};
pub use value::{Scalar, ValueType, FIXED_POINT_SCALE, MAX_FIELD_SIZE, STR_LEN};
