//! Shared types, error enums, and the decoded message type for ais-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by ais-core.
#[derive(Debug, Error)]
pub enum AisError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export failed: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, AisError>;

/// Failure at the payload decoder boundary.
///
/// Expected at high volume under weak signal; callers discard the record
/// and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    EmptyPayload,
    #[error("pad bits out of range: {0}")]
    BadPadding(u8),
    #[error("invalid armor character {0:?}")]
    InvalidArmor(char),
    #[error("payload truncated: type {msg_type} needs {expected} bits, got {actual}")]
    Truncated {
        msg_type: u8,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported message type: {0}")]
    Unsupported(u8),
}

// ---------------------------------------------------------------------------
// Decoded message
// ---------------------------------------------------------------------------

/// One decoded AIS message.
///
/// Every field except the type is optional: a position report carries no
/// name, a static report carries no position. Absence is normal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedMessage {
    pub msg_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmsi: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<u16>,
}

impl DecodedMessage {
    /// Longitude and latitude, only when both are present.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

// ---------------------------------------------------------------------------
// AIS 6-bit text character set
// ---------------------------------------------------------------------------

/// AIS character set for text fields (6 bits per character, ITU-R M.1371).
pub const SIXBIT_CHARSET: &[u8; 64] =
    b"@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_ !\"#$%&'()*+,-./0123456789:;<=>?";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_requires_both() {
        let mut msg = DecodedMessage {
            longitude: Some(-70.5),
            ..Default::default()
        };
        assert!(msg.position().is_none());
        msg.latitude = Some(41.2);
        assert_eq!(msg.position(), Some((-70.5, 41.2)));
    }

    #[test]
    fn test_error_display() {
        let e = AisError::from(DecodeError::Unsupported(17));
        assert_eq!(e.to_string(), "decode failed: unsupported message type: 17");
    }

    #[test]
    fn test_charset_layout() {
        assert_eq!(SIXBIT_CHARSET[0], b'@');
        assert_eq!(SIXBIT_CHARSET[32], b' ');
        assert_eq!(SIXBIT_CHARSET[48], b'0');
    }
}
