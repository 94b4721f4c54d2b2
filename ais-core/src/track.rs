//! Timestamped position track for the whole run.
//!
//! Pure logic: placemarks are appended in observation order and never
//! modified. Serialization lives in `kml`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::types::DecodedMessage;

/// One observed vessel position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placemark {
    /// MMSI as a decimal string
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Time of processing, not any time carried in the message
    pub timestamp: DateTime<Utc>,
}

impl Placemark {
    /// ISO-8601 UTC with a trailing `Z`.
    pub fn when(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// `longitude,latitude`, longitude first, no space.
    pub fn coordinates(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

/// Ordered placemarks collected during one run.
#[derive(Debug, Clone)]
pub struct TrackCollection {
    started_at: DateTime<Utc>,
    placemarks: Vec<Placemark>,
}

impl TrackCollection {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        TrackCollection {
            started_at,
            placemarks: Vec::new(),
        }
    }

    /// Append a placemark if the message carries an MMSI and a full position.
    ///
    /// Returns true when a placemark was added.
    pub fn record(&mut self, msg: &DecodedMessage, now: DateTime<Utc>) -> bool {
        let (mmsi, (longitude, latitude)) = match (msg.mmsi, msg.position()) {
            (Some(mmsi), Some(pos)) => (mmsi, pos),
            _ => return false,
        };
        self.placemarks.push(Placemark {
            id: mmsi.to_string(),
            longitude,
            latitude,
            timestamp: now,
        });
        true
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn placemarks(&self) -> &[Placemark] {
        &self.placemarks
    }

    pub fn len(&self) -> usize {
        self.placemarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placemarks.is_empty()
    }
}

/// Free-function form of `TrackCollection::record`.
pub fn record(msg: &DecodedMessage, collection: &mut TrackCollection, now: DateTime<Utc>) -> bool {
    collection.record(msg, now)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 7, 12, 14, 30, 5).unwrap()
    }

    fn position(mmsi: Option<u32>, lon: Option<f64>, lat: Option<f64>) -> DecodedMessage {
        DecodedMessage {
            msg_type: 1,
            mmsi,
            longitude: lon,
            latitude: lat,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_full_position() {
        let mut track = TrackCollection::new(t0());
        let before = Utc::now();
        assert!(track.record(&position(Some(999), Some(-70.5), Some(41.2)), Utc::now()));

        assert_eq!(track.len(), 1);
        let pm = &track.placemarks()[0];
        assert_eq!(pm.id, "999");
        assert_eq!(pm.longitude, -70.5);
        assert_eq!(pm.latitude, 41.2);
        assert!(pm.timestamp >= before);
        assert!(pm.when().ends_with('Z'));
    }

    #[test]
    fn test_record_requires_all_fields() {
        let mut track = TrackCollection::new(t0());
        assert!(!track.record(&position(None, Some(-70.5), Some(41.2)), t0()));
        assert!(!track.record(&position(Some(1), None, Some(41.2)), t0()));
        assert!(!track.record(&position(Some(1), Some(-70.5), None), t0()));
        assert!(!record(&DecodedMessage::default(), &mut track, t0()));
        assert!(track.is_empty());
    }

    #[test]
    fn test_record_preserves_order() {
        let mut track = TrackCollection::new(t0());
        for mmsi in [3, 1, 2] {
            record(&position(Some(mmsi), Some(0.0), Some(0.0)), &mut track, t0());
        }
        let ids: Vec<&str> = track.placemarks().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_placemark_formatting() {
        let pm = Placemark {
            id: "999".into(),
            longitude: -70.5,
            latitude: 41.2,
            timestamp: t0(),
        };
        assert_eq!(pm.coordinates(), "-70.5,41.2");
        assert_eq!(pm.when(), "2016-07-12T14:30:05.000000Z");
    }
}
