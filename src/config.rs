//! Konfigurasi decoder dan encoder
//!
//! Dua generasi firmware memakai gate versi yang berbeda (hanya `1`, atau
//! `1` dan `2`), jadi versi yang diterima tidak di-hardcode.

use serde::{Deserialize, Serialize};

use crate::protocol::{DEFAULT_PAYLOAD_CAPACITY, PROTOCOL_VERSION};

/// Hard cap on an uplink buffer (LoRaWAN max application payload is 242).
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 256;

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Protocol versions accepted in byte 0
    pub accepted_versions: Vec<u8>,
    /// Buffers longer than this are rejected before decoding
    pub max_payload_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            accepted_versions: vec![PROTOCOL_VERSION, 2],
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

impl DecoderConfig {
    /// Version 1 only, as older network gateways expect
    pub fn strict() -> Self {
        Self {
            accepted_versions: vec![PROTOCOL_VERSION],
            ..Self::default()
        }
    }

    pub fn with_versions(mut self, versions: impl Into<Vec<u8>>) -> Self {
        self.accepted_versions = versions.into();
        self
    }

    pub fn with_max_payload_len(mut self, max: usize) -> Self {
        self.max_payload_len = max;
        self
    }

    #[inline(always)]
    pub fn accepts(&self, version: u8) -> bool {
        self.accepted_versions.contains(&version)
    }
}

/// Payload builder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Total buffer size, version byte included
    pub capacity: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_PAYLOAD_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accepts_both_generations() {
        let config = DecoderConfig::default();
        assert!(config.accepts(1));
        assert!(config.accepts(2));
        assert!(!config.accepts(3));
    }

    #[test]
    fn test_strict_accepts_only_v1() {
        let config = DecoderConfig::strict();
        assert!(config.accepts(1));
        assert!(!config.accepts(2));
        assert_eq!(config.max_payload_len, DEFAULT_MAX_PAYLOAD_LEN);
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: DecoderConfig = serde_json::from_str(r#"{"accepted_versions":[2]}"#).unwrap();
        assert_eq!(config.accepted_versions, vec![2]);
        assert_eq!(config.max_payload_len, DEFAULT_MAX_PAYLOAD_LEN);

        let config: EncoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.capacity, DEFAULT_PAYLOAD_CAPACITY);
    }
}
