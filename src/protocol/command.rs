//! Command Payload: satu field teks, tanpa type tag
//!
//! Layout:
//! `[version (1)][name (4, NUL-padded)][payload (1 byte per karakter)]`
//! Total maksimum 56 byte.

use indexmap::IndexMap;
use tracing::debug;

use super::record::{pack_name, parse_name, NAME_LEN, PROTOCOL_VERSION};
use super::value::latin1;
use crate::error::EncodeError;

pub const MAX_COMMAND_LEN: usize = 56;

/// Encode satu field `name -> text`
pub fn try_encode_command(fields: &IndexMap<String, String>) -> Result<Vec<u8>, EncodeError> {
    let (name, payload) = match fields.len() {
        0 => return Err(EncodeError::NoFields),
        1 => fields.first().ok_or(EncodeError::NoFields)?,
        n => return Err(EncodeError::TooManyFields(n)),
    };

    let raw_name = pack_name(name)?;

    let size = 1 + NAME_LEN + payload.chars().count();
    if size > MAX_COMMAND_LEN {
        return Err(EncodeError::PayloadTooLarge {
            size,
            max: MAX_COMMAND_LEN,
        });
    }

    let mut bytes = Vec::with_capacity(size);
    bytes.push(PROTOCOL_VERSION);
    bytes.extend_from_slice(&raw_name);
    for c in payload.chars() {
        bytes.push(latin1(c)?);
    }
    Ok(bytes)
}

/// Seperti `try_encode_command`, tapi input invalid menghasilkan payload kosong
pub fn encode_command(fields: &IndexMap<String, String>) -> Vec<u8> {
    try_encode_command(fields).unwrap_or_else(|err| {
        debug!(%err, "command rejected");
        Vec::new()
    })
}

/// Kebalikan dari `encode_command`
pub fn parse_command(bytes: &[u8]) -> Option<(String, String)> {
    if bytes.len() < 1 + NAME_LEN || bytes.len() > MAX_COMMAND_LEN {
        return None;
    }
    if bytes[0] != PROTOCOL_VERSION {
        return None;
    }

    let name = parse_name(&bytes[1..1 + NAME_LEN]);
    let payload = bytes[1 + NAME_LEN..].iter().map(|&b| char::from(b)).collect();
    Some((name, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_command_layout() {
        let bytes = encode_command(&fields(&[("CMD", "How are you?")]));
        let mut expected = vec![1, b'C', b'M', b'D', 0];
        expected.extend_from_slice(b"How are you?");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_name_too_long_is_empty() {
        assert!(encode_command(&fields(&[("LONGNAME", "x")])).is_empty());
        assert_eq!(
            try_encode_command(&fields(&[("LONGNAME", "x")])),
            Err(EncodeError::NameTooLong("LONGNAME".into()))
        );
    }

    #[test]
    fn test_multi_field_is_empty() {
        assert!(encode_command(&fields(&[("A", "1"), ("B", "2")])).is_empty());
        assert_eq!(
            try_encode_command(&fields(&[("A", "1"), ("B", "2")])),
            Err(EncodeError::TooManyFields(2))
        );
        assert!(encode_command(&IndexMap::new()).is_empty());
    }

    #[test]
    fn test_size_limit() {
        let at_limit = "x".repeat(MAX_COMMAND_LEN - 5);
        assert_eq!(
            encode_command(&fields(&[("CMD", at_limit.as_str())])).len(),
            MAX_COMMAND_LEN
        );

        let over = "x".repeat(MAX_COMMAND_LEN - 4);
        assert!(encode_command(&fields(&[("CMD", over.as_str())])).is_empty());
    }

    #[test]
    fn test_non_latin1_payload_rejected() {
        assert_eq!(
            try_encode_command(&fields(&[("CMD", "5 €")])),
            Err(EncodeError::NotLatin1('€'))
        );
    }

    #[test]
    fn test_parse_command_inverse() {
        let bytes = encode_command(&fields(&[("CC", "interval CNT1 5")]));
        assert_eq!(
            parse_command(&bytes),
            Some(("CC".to_string(), "interval CNT1 5".to_string()))
        );
        assert_eq!(parse_command(&[2, b'C', 0, 0, 0]), None);
        assert_eq!(parse_command(&[1, b'C']), None);
    }
}
