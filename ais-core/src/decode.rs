//! Decode armored AIS payloads into `DecodedMessage`s.
//!
//! The pipeline only depends on the `MessageDecoder` trait. `PayloadDecoder`
//! is the shipped implementation and reads the identity and position fields
//! of these message types:
//! - 1, 2, 3: Class A position report
//! - 4:       Base station report
//! - 5:       Static and voyage data (vessel name)
//! - 18:      Class B position report
//! - 19:      Extended Class B report (position + name)
//! - 21:      Aid-to-navigation report (name + position)
//! - 24:      Static data report, part A (name)
//!
//! Everything else fails with `DecodeError::Unsupported`.

use crate::types::{DecodedMessage, DecodeError, SIXBIT_CHARSET};

/// Boundary between the stream pipeline and the payload decoder.
pub trait MessageDecoder {
    fn decode(&self, payload: &str, pad_bits: u8) -> Result<DecodedMessage, DecodeError>;
}

/// Built-in decoder for the message types listed in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadDecoder;

impl MessageDecoder for PayloadDecoder {
    fn decode(&self, payload: &str, pad_bits: u8) -> Result<DecodedMessage, DecodeError> {
        decode(payload, pad_bits)
    }
}

// ---------------------------------------------------------------------------
// Sentinel values
// ---------------------------------------------------------------------------

const LON_NOT_AVAILABLE: i64 = 181 * 600_000;
const LAT_NOT_AVAILABLE: i64 = 91 * 600_000;
const SPEED_NOT_AVAILABLE: u64 = 1023;
const COURSE_NOT_AVAILABLE: u64 = 3600;
const HEADING_NOT_AVAILABLE: u64 = 511;

/// Longitude/latitude units: 1/10000 minute.
const COORD_SCALE: f64 = 600_000.0;

// ---------------------------------------------------------------------------
// Bit access
// ---------------------------------------------------------------------------

/// De-armored payload: one 6-bit value per payload character.
struct Bits {
    sextets: Vec<u8>,
    len: usize,
}

impl Bits {
    fn from_payload(payload: &str, pad_bits: u8) -> Result<Bits, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }
        if pad_bits > 5 {
            return Err(DecodeError::BadPadding(pad_bits));
        }

        let mut sextets = Vec::with_capacity(payload.len());
        for c in payload.chars() {
            sextets.push(unarmor(c).ok_or(DecodeError::InvalidArmor(c))?);
        }

        let len = (sextets.len() * 6).saturating_sub(pad_bits as usize);
        Ok(Bits { sextets, len })
    }

    /// Unsigned field. Bits past the end read as zero.
    fn uint(&self, start: usize, width: usize) -> u64 {
        let mut value = 0u64;
        for i in start..start + width {
            let bit = if i < self.len {
                (self.sextets[i / 6] >> (5 - i % 6)) & 1
            } else {
                0
            };
            value = (value << 1) | bit as u64;
        }
        value
    }

    /// Two's complement signed field.
    fn int(&self, start: usize, width: usize) -> i64 {
        let raw = self.uint(start, width) as i64;
        if raw & (1 << (width - 1)) != 0 {
            raw - (1 << width)
        } else {
            raw
        }
    }

    /// Text field of `chars` six-bit characters with `@` padding removed.
    fn text(&self, start: usize, chars: usize) -> Option<String> {
        let raw: String = (0..chars)
            .map(|k| SIXBIT_CHARSET[self.uint(start + k * 6, 6) as usize] as char)
            .collect();
        let cleaned = raw.trim_end_matches(['@', ' ']).trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.to_string())
        }
    }

    fn require(&self, msg_type: u8, expected: usize) -> Result<(), DecodeError> {
        if self.len < expected {
            return Err(DecodeError::Truncated {
                msg_type,
                expected,
                actual: self.len,
            });
        }
        Ok(())
    }
}

/// Map a payload character to its 6-bit value.
fn unarmor(c: char) -> Option<u8> {
    match c {
        '0'..='W' => Some(c as u8 - 48),
        '`'..='w' => Some(c as u8 - 56),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn longitude(bits: &Bits, start: usize) -> Option<f64> {
    let raw = bits.int(start, 28);
    if raw == LON_NOT_AVAILABLE || raw.abs() > 180 * 600_000 {
        return None;
    }
    Some(raw as f64 / COORD_SCALE)
}

fn latitude(bits: &Bits, start: usize) -> Option<f64> {
    let raw = bits.int(start, 27);
    if raw == LAT_NOT_AVAILABLE || raw.abs() > 90 * 600_000 {
        return None;
    }
    Some(raw as f64 / COORD_SCALE)
}

fn speed(bits: &Bits, start: usize) -> Option<f64> {
    match bits.uint(start, 10) {
        SPEED_NOT_AVAILABLE => None,
        v => Some(v as f64 / 10.0),
    }
}

fn course(bits: &Bits, start: usize) -> Option<f64> {
    match bits.uint(start, 12) {
        v if v >= COURSE_NOT_AVAILABLE => None,
        v => Some(v as f64 / 10.0),
    }
}

fn heading(bits: &Bits, start: usize) -> Option<u16> {
    match bits.uint(start, 9) {
        HEADING_NOT_AVAILABLE => None,
        v if v > 359 => None,
        v => Some(v as u16),
    }
}

// ---------------------------------------------------------------------------
// Per-type decoders
// ---------------------------------------------------------------------------

/// Types 1-3: Class A position report (168 bits).
fn decode_class_a(bits: &Bits, msg: &mut DecodedMessage) -> Result<(), DecodeError> {
    bits.require(msg.msg_type, 168)?;
    msg.speed_kts = speed(bits, 50);
    msg.longitude = longitude(bits, 61);
    msg.latitude = latitude(bits, 89);
    msg.course_deg = course(bits, 116);
    msg.heading_deg = heading(bits, 128);
    Ok(())
}

/// Type 4: Base station report (168 bits).
fn decode_base_station(bits: &Bits, msg: &mut DecodedMessage) -> Result<(), DecodeError> {
    bits.require(msg.msg_type, 168)?;
    msg.longitude = longitude(bits, 79);
    msg.latitude = latitude(bits, 107);
    Ok(())
}

/// Type 5: Static and voyage data (424 bits, 420 from some transponders).
fn decode_static_voyage(bits: &Bits, msg: &mut DecodedMessage) -> Result<(), DecodeError> {
    bits.require(msg.msg_type, 420)?;
    msg.name = bits.text(112, 20);
    Ok(())
}

/// Type 18: Class B position report (168 bits).
fn decode_class_b(bits: &Bits, msg: &mut DecodedMessage) -> Result<(), DecodeError> {
    bits.require(msg.msg_type, 168)?;
    msg.speed_kts = speed(bits, 46);
    msg.longitude = longitude(bits, 57);
    msg.latitude = latitude(bits, 85);
    msg.course_deg = course(bits, 112);
    msg.heading_deg = heading(bits, 124);
    Ok(())
}

/// Type 19: Extended Class B report (312 bits).
fn decode_class_b_extended(bits: &Bits, msg: &mut DecodedMessage) -> Result<(), DecodeError> {
    bits.require(msg.msg_type, 312)?;
    decode_class_b(bits, msg)?;
    msg.name = bits.text(143, 20);
    Ok(())
}

/// Type 21: Aid-to-navigation report (272 bits plus optional name extension).
fn decode_aid_to_navigation(bits: &Bits, msg: &mut DecodedMessage) -> Result<(), DecodeError> {
    bits.require(msg.msg_type, 272)?;
    msg.name = bits.text(43, 20);
    msg.longitude = longitude(bits, 164);
    msg.latitude = latitude(bits, 192);
    Ok(())
}

/// Type 24: Static data report. Only part A (160 bits) carries the name.
fn decode_static_report(bits: &Bits, msg: &mut DecodedMessage) -> Result<(), DecodeError> {
    bits.require(msg.msg_type, 160)?;
    if bits.uint(38, 2) == 0 {
        msg.name = bits.text(40, 20);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Top-level decode
// ---------------------------------------------------------------------------

/// Decode an armored payload with the given fill-bit count.
pub fn decode(payload: &str, pad_bits: u8) -> Result<DecodedMessage, DecodeError> {
    let bits = Bits::from_payload(payload, pad_bits)?;
    bits.require(0, 38)?;

    let msg_type = bits.uint(0, 6) as u8;
    let mut msg = DecodedMessage {
        msg_type,
        mmsi: Some(bits.uint(8, 30) as u32),
        ..Default::default()
    };

    match msg_type {
        1..=3 => decode_class_a(&bits, &mut msg)?,
        4 => decode_base_station(&bits, &mut msg)?,
        5 => decode_static_voyage(&bits, &mut msg)?,
        18 => decode_class_b(&bits, &mut msg)?,
        19 => decode_class_b_extended(&bits, &mut msg)?,
        21 => decode_aid_to_navigation(&bits, &mut msg)?,
        24 => decode_static_report(&bits, &mut msg)?,
        other => return Err(DecodeError::Unsupported(other)),
    }

    Ok(msg)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
