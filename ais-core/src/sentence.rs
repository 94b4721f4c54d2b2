//! Isolate AIS payloads from raw `!AIVDM` records.
//!
//! Responsibilities:
//! - Split one record into comma fields and pick out the payload (field 5)
//! - Parse the pad-bit count from the checksum field (`<pad>*<hex>`)
//! - Carry fragment metadata so multi-sentence messages can be joined
//! - Join fragments back into one payload (`Reassembler`)
//!
//! Extraction is total: every byte sequence maps to a `Sentence` or `None`.

use std::collections::HashMap;

/// Minimum number of comma-delimited fields in a usable record.
const MIN_FIELDS: usize = 6;

/// Index of the armored payload field.
const PAYLOAD_FIELD: usize = 5;

/// Highest legal pad-bit count.
const MAX_PAD_BITS: u8 = 5;

/// Incomplete messages held at once before the buffer is flushed.
const MAX_PENDING: usize = 16;

// ---------------------------------------------------------------------------
// Sentence
// ---------------------------------------------------------------------------

/// Position of a sentence within a multi-sentence message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Total sentences in the message (field 1)
    pub count: u8,
    /// 1-based index of this sentence (field 2)
    pub number: u8,
    /// Sequential message id tying fragments together (field 3)
    pub sequence_id: String,
    /// Radio channel (field 4)
    pub channel: String,
}

/// The decodable part of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Armored payload, exactly as received
    pub payload: String,
    /// Fill bits appended to byte-align the payload (0-5)
    pub pad_bits: u8,
    /// Present only for sentences that are part of a multi-sentence message
    pub fragment: Option<Fragment>,
}

impl Sentence {
    pub fn is_fragment(&self) -> bool {
        self.fragment.is_some()
    }
}

/// Extract payload and pad bits from one raw record.
///
/// Returns `None` for records that are not UTF-8, have fewer than six
/// fields, or have a missing or non-numeric pad digit.
pub fn extract(raw: &[u8]) -> Option<Sentence> {
    let line = std::str::from_utf8(raw).ok()?.trim();
    if line.is_empty() {
        return None;
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let payload = fields[PAYLOAD_FIELD].to_string();
    let pad_bits = parse_pad_bits(fields[fields.len() - 1])?;

    Some(Sentence {
        payload,
        pad_bits,
        fragment: parse_fragment(&fields),
    })
}

/// Pad digit is the last character before `*` in the checksum field.
fn parse_pad_bits(field: &str) -> Option<u8> {
    let (head, _checksum) = field.split_once('*')?;
    let digit = head.chars().last()?.to_digit(10)?;
    let pad = digit as u8;
    if pad > MAX_PAD_BITS {
        return None;
    }
    Some(pad)
}

fn parse_fragment(fields: &[&str]) -> Option<Fragment> {
    let count: u8 = fields[1].trim().parse().ok()?;
    let number: u8 = fields[2].trim().parse().ok()?;
    if count <= 1 || number == 0 || number > count {
        return None;
    }
    Some(Fragment {
        count,
        number,
        sequence_id: fields[3].to_string(),
        channel: fields[4].to_string(),
    })
}

// ---------------------------------------------------------------------------
// Fragment reassembly
// ---------------------------------------------------------------------------

struct Pending {
    count: u8,
    next: u8,
    payload: String,
}

/// Joins multi-sentence messages back into a single payload.
///
/// Fragments must arrive in order; anything out of sequence drops the
/// partial message. Single sentences pass straight through.
#[derive(Default)]
pub struct Reassembler {
    pending: HashMap<(String, String), Pending>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sentence. Returns a complete sentence when one is ready.
    pub fn push(&mut self, sentence: Sentence) -> Option<Sentence> {
        let Some(fragment) = sentence.fragment.clone() else {
            return Some(sentence);
        };
        let key = (fragment.sequence_id.clone(), fragment.channel.clone());

        if fragment.number == 1 {
            if self.pending.len() >= MAX_PENDING {
                self.pending.clear();
            }
            self.pending.insert(
                key,
                Pending {
                    count: fragment.count,
                    next: 2,
                    payload: sentence.payload,
                },
            );
            return None;
        }

        let in_sequence = self
            .pending
            .get(&key)
            .is_some_and(|p| p.count == fragment.count && p.next == fragment.number);
        if !in_sequence {
            self.pending.remove(&key);
            return None;
        }

        if fragment.number == fragment.count {
            let done = self.pending.remove(&key)?;
            return Some(Sentence {
                payload: done.payload + &sentence.payload,
                pad_bits: sentence.pad_bits,
                fragment: None,
            });
        }

        if let Some(p) = self.pending.get_mut(&key) {
            p.payload.push_str(&sentence.payload);
            p.next += 1;
        }
        None
    }

    /// Number of partially received messages.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
