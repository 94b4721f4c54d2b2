//! The receive loop: socket lines in, alerts and placemarks out.
//!
//! States run `Connecting -> Running -> Draining -> Stopped`. A single bad
//! record never ends the loop; only an interrupt, end of input, or a
//! socket error does. Draining exports the track exactly once.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use ais_core::alert::{format_alert, format_message};
use ais_core::kml;
use ais_core::{extract, DecodedMessage, MessageDecoder, Reassembler, TrackCollection, Watchlist};

/// How long a socket read blocks before the interrupt flag is rechecked.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Longest line kept while waiting for its newline.
const MAX_RECORD_LEN: usize = 4096;

/// Decode failures between debug-level tallies.
const DECODE_TALLY_EVERY: u64 = 1000;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("cannot connect to decoder at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("decoder closed the connection")]
    Disconnected,
    #[error("socket read failed: {0}")]
    Read(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Connecting,
    Running,
    Draining,
    Stopped,
}

/// Why `run` returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    EndOfInput,
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Not a usable sentence
    Skipped,
    /// Fragment held until the rest of its message arrives
    Buffered,
    DecodeFailed,
    Decoded { alerted: bool, recorded: bool },
}

/// Running counters, reported once at shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub records: u64,
    pub framing_errors: u64,
    pub fragments: u64,
    pub decode_errors: u64,
    pub decoded: u64,
    pub alerts: u64,
    pub placemarks: u64,
}

// ---------------------------------------------------------------------------
// Stream loop
// ---------------------------------------------------------------------------

pub struct StreamLoop<D, W> {
    decoder: D,
    watchlist: Watchlist,
    track: Option<TrackCollection>,
    reassembler: Reassembler,
    out: W,
    verbose: bool,
    json: bool,
    state: LoopState,
    stats: StreamStats,
}

impl<D: MessageDecoder, W: Write> StreamLoop<D, W> {
    /// `track` is `Some` when positions should be recorded for export.
    pub fn new(decoder: D, watchlist: Watchlist, track: Option<TrackCollection>, out: W) -> Self {
        StreamLoop {
            decoder,
            watchlist,
            track,
            reassembler: Reassembler::new(),
            out,
            verbose: false,
            json: false,
            state: LoopState::Connecting,
            stats: StreamStats::default(),
        }
    }

    /// Print every decoded message, not just watchlist hits.
    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    /// Print verbose messages as JSON lines.
    pub fn json(mut self, on: bool) -> Self {
        self.json = on;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn track(&self) -> Option<&TrackCollection> {
        self.track.as_ref()
    }

    fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            info!(from = ?self.state, to = ?state, "stream state");
            self.state = state;
        }
    }

    /// Run one raw record through extract, decode, match, and record.
    pub fn process_record(&mut self, raw: &[u8]) -> RecordOutcome {
        self.stats.records += 1;

        let Some(sentence) = extract(raw) else {
            self.stats.framing_errors += 1;
            return RecordOutcome::Skipped;
        };
        let Some(sentence) = self.reassembler.push(sentence) else {
            self.stats.fragments += 1;
            return RecordOutcome::Buffered;
        };

        let msg = match self.decoder.decode(&sentence.payload, sentence.pad_bits) {
            Ok(m) => m,
            Err(e) => {
                self.stats.decode_errors += 1;
                if self.stats.decode_errors % DECODE_TALLY_EVERY == 0 {
                    debug!(count = self.stats.decode_errors, last = %e, "decode failures");
                }
                return RecordOutcome::DecodeFailed;
            }
        };
        self.stats.decoded += 1;

        if self.verbose {
            let text = self.render(&msg);
            self.emit(&text);
        }

        let recorded = match self.track.as_mut() {
            Some(track) => track.record(&msg, Utc::now()),
            None => false,
        };
        if recorded {
            self.stats.placemarks += 1;
        }

        let alerted = self.watchlist.matches(&msg);
        if alerted {
            self.stats.alerts += 1;
            self.emit(&format_alert(&msg));
        }

        RecordOutcome::Decoded { alerted, recorded }
    }

    fn render(&self, msg: &DecodedMessage) -> String {
        if self.json {
            match serde_json::to_string(msg) {
                Ok(line) => line + "\n",
                Err(_) => format_message(msg),
            }
        } else {
            format_message(msg)
        }
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "failed to write output");
        }
    }

    /// Read newline-delimited records until interrupted or the input ends.
    ///
    /// `stop` is checked between reads and again at end of input, since an
    /// interrupt can also take down the decoder and close the socket. Read
    /// timeouts are not errors: any partial line already received is kept
    /// and completed by the next read. A line longer than `MAX_RECORD_LEN`
    /// is counted as one framing error and skipped through its newline.
    pub fn run<R: BufRead>(
        &mut self,
        mut reader: R,
        stop: &AtomicBool,
    ) -> Result<StopReason, StreamError> {
        self.set_state(LoopState::Running);
        let mut buf = Vec::with_capacity(256);
        let mut discarding = false;

        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(StopReason::Interrupted);
            }

            let limit = (MAX_RECORD_LEN + 1 - buf.len()) as u64;
            match reader.by_ref().take(limit).read_until(b'\n', &mut buf) {
                Ok(0) => {
                    if !buf.is_empty() && !discarding {
                        self.process_record(&buf);
                    }
                    if stop.load(Ordering::SeqCst) {
                        return Ok(StopReason::Interrupted);
                    }
                    return Ok(StopReason::EndOfInput);
                }
                Ok(_) if buf.last() == Some(&b'\n') => {
                    if !discarding {
                        self.process_record(&buf);
                    }
                    discarding = false;
                    buf.clear();
                }
                Ok(_) => {
                    // No newline: either the input ended mid-line (the next
                    // read returns 0) or the line hit the length cap
                    if buf.len() > MAX_RECORD_LEN {
                        if !discarding {
                            self.stats.records += 1;
                            self.stats.framing_errors += 1;
                            discarding = true;
                        }
                        buf.clear();
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(StreamError::Read(e)),
            }
        }
    }

    /// Export the track (if recording) and stop. Safe to call more than once;
    /// only the first call writes.
    pub fn drain(&mut self, export_dir: &Path) -> ais_core::Result<Option<PathBuf>> {
        self.set_state(LoopState::Draining);
        let written = match self.track.take() {
            Some(track) => {
                let path = kml::write_kml(&track, export_dir)?;
                info!(path = %path.display(), placemarks = track.len(), "track exported");
                Some(path)
            }
            None => None,
        };
        self.set_state(LoopState::Stopped);
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Live socket
// ---------------------------------------------------------------------------

/// Open the decoder's TCP feed. No retry: failure here is fatal.
pub fn connect(addr: &str) -> Result<BufReader<TcpStream>, StreamError> {
    let stream = TcpStream::connect(addr).map_err(|source| StreamError::Connect {
        addr: addr.to_string(),
        source,
    })?;
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(StreamError::Read)?;
    info!(%addr, "connected to decoder");
    Ok(BufReader::new(stream))
}

/// Connect and run until interrupted. The socket closing is an error.
pub fn run_live<D: MessageDecoder, W: Write>(
    stream_loop: &mut StreamLoop<D, W>,
    addr: &str,
    stop: &AtomicBool,
) -> Result<(), StreamError> {
    let reader = connect(addr)?;
    match stream_loop.run(reader, stop)? {
        StopReason::Interrupted => Ok(()),
        StopReason::EndOfInput => Err(StreamError::Disconnected),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
