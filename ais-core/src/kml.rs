//! KML export of a `TrackCollection`.
//!
//! One `<Folder>` holds every placemark, in the order observed:
//!
//! ```text
//! <Placemark>
//!   <name>366053209</name>
//!   <Point><coordinates>-122.34,37.80</coordinates></Point>
//!   <TimeStamp><when>2016-07-12T14:30:05.000000Z</when></TimeStamp>
//! </Placemark>
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::track::TrackCollection;
use crate::types::{AisError, Result};

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

struct KmlWriter {
    inner: Writer<Vec<u8>>,
}

impl KmlWriter {
    fn new() -> Self {
        KmlWriter {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .map_err(|e| AisError::Export(e.to_string()))
    }

    fn start(&mut self, tag: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(tag)))
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    /// `<tag>text</tag>` with the text escaped.
    fn text_element(&mut self, tag: &str, text: &str) -> Result<()> {
        self.start(tag)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).map_err(|e| AisError::Export(e.to_string()))
    }
}

/// Serialize the track as a KML document with a single named folder.
pub fn to_kml(track: &TrackCollection, folder_name: &str) -> Result<String> {
    let mut w = KmlWriter::new();

    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("kml");
    root.push_attribute(("xmlns", KML_NAMESPACE));
    w.event(Event::Start(root))?;

    w.start("Folder")?;
    w.text_element("name", folder_name)?;
    for pm in track.placemarks() {
        w.start("Placemark")?;
        w.text_element("name", &pm.id)?;
        w.start("Point")?;
        w.text_element("coordinates", &pm.coordinates())?;
        w.end("Point")?;
        w.start("TimeStamp")?;
        w.text_element("when", &pm.when())?;
        w.end("TimeStamp")?;
        w.end("Placemark")?;
    }
    w.end("Folder")?;
    w.end("kml")?;

    let mut doc = w.finish()?;
    doc.push('\n');
    Ok(doc)
}

/// File name derived from the run start, e.g. `ais-watch-20160712T143005Z.kml`.
pub fn export_file_name(started_at: DateTime<Utc>) -> String {
    format!("ais-watch-{}.kml", started_at.format("%Y%m%dT%H%M%SZ"))
}

/// Write the track into `dir` and return the file path.
///
/// The document goes to a temporary sibling first and is renamed into
/// place, so an interrupted write never leaves a truncated `.kml`.
pub fn write_kml(track: &TrackCollection, dir: &Path) -> Result<PathBuf> {
    let folder = format!(
        "ais-watch {}",
        track
            .started_at()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    let doc = to_kml(track, &folder)?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(track.started_at()));
    let tmp = path.with_extension("kml.tmp");
    std::fs::write(&tmp, doc)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
