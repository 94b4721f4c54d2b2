//! ais-core: Pure AIS processing library for ais-watch.
//!
//! No sockets and no child processes. Sentence framing,
//! payload decoding, watchlist matching, and track export live here; the
//! `ais-watch` binary wires them to a live aisdeco feed.

pub mod alert;
pub mod config;
pub mod decode;
pub mod kml;
pub mod sentence;
pub mod track;
pub mod types;
pub mod watchlist;

// Re-export commonly used types at crate root
pub use decode::{MessageDecoder, PayloadDecoder};
pub use sentence::{extract, Reassembler, Sentence};
pub use track::{Placemark, TrackCollection};
pub use types::*;
pub use watchlist::Watchlist;
