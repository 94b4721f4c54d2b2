//! Human-readable rendering of decoded messages for the terminal.

use std::fmt::Write;

use crate::types::DecodedMessage;

pub const ALERT_BEGIN: &str = "#########BEGIN ALERT#########";
pub const ALERT_END: &str = "#########END ALERT#########";

/// Render the identity and position lines of a message.
///
/// Absent fields produce no line. The output always ends with a blank
/// separator line, so an empty message renders as just `"\n"`.
pub fn format_message(msg: &DecodedMessage) -> String {
    let mut out = String::new();
    if let Some(name) = &msg.name {
        let _ = writeln!(out, "Vessel name: {name}");
    }
    if let Some(mmsi) = msg.mmsi {
        let _ = writeln!(out, "MMSI: {mmsi}");
    }
    if let Some((lon, lat)) = msg.position() {
        let _ = writeln!(out, "Latitude: {lat}");
        let _ = writeln!(out, "Longitude: {lon}");
    }
    out.push('\n');
    out
}

/// Render a watchlist hit between BEGIN/END delimiters.
pub fn format_alert(msg: &DecodedMessage) -> String {
    format!("\n{ALERT_BEGIN}\n\n{}{ALERT_END}\n", format_message(msg))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_identity_only() {
        let msg = DecodedMessage {
            msg_type: 5,
            mmsi: Some(123456789),
            name: Some("TESTSHIP".into()),
            ..Default::default()
        };
        let text = format_message(&msg);
        assert_eq!(text, "Vessel name: TESTSHIP\nMMSI: 123456789\n\n");
        assert!(!text.contains("Latitude"));
        assert!(!text.contains("Longitude"));
    }

    #[test]
    fn test_format_position() {
        let msg = DecodedMessage {
            msg_type: 1,
            mmsi: Some(999),
            longitude: Some(-70.5),
            latitude: Some(41.2),
            ..Default::default()
        };
        assert_eq!(
            format_message(&msg),
            "MMSI: 999\nLatitude: 41.2\nLongitude: -70.5\n\n"
        );
    }

    #[test]
    fn test_format_half_position_omitted() {
        let msg = DecodedMessage {
            msg_type: 1,
            latitude: Some(41.2),
            ..Default::default()
        };
        assert_eq!(format_message(&msg), "\n");
    }

    #[test]
    fn test_format_empty_message() {
        assert_eq!(format_message(&DecodedMessage::default()), "\n");
    }

    #[test]
    fn test_format_alert_delimiters() {
        let msg = DecodedMessage {
            msg_type: 5,
            mmsi: Some(123456789),
            name: Some("TESTSHIP".into()),
            ..Default::default()
        };
        let text = format_alert(&msg);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], ALERT_BEGIN);
        assert!(lines.contains(&"Vessel name: TESTSHIP"));
        assert!(lines.contains(&"MMSI: 123456789"));
        assert_eq!(*lines.last().unwrap(), ALERT_END);
    }
}
