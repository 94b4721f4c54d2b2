//! Vessel watchlist: MMSIs and names that trigger alerts.
//!
//! Built once at startup from inline values and line-delimited files,
//! then read-only for the rest of the run. The two dimensions are
//! independent and ORed; an empty dimension places no constraint and
//! never matches on its own.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::types::{AisError, DecodedMessage, Result};

/// Operator-supplied set of vessels of interest.
#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    mmsis: HashSet<u32>,
    names: HashSet<String>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mmsi(&mut self, mmsi: u32) {
        self.mmsis.insert(mmsi);
    }

    /// Add a vessel name. Surrounding whitespace is dropped; blank names are ignored.
    pub fn add_name(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.names.insert(name.to_string());
        }
    }

    /// Load newline-delimited MMSIs. Blank lines and `#` comments are skipped.
    ///
    /// Returns the number of entries read (before deduplication).
    pub fn load_mmsi_file(&mut self, path: &Path) -> Result<usize> {
        let text = read_list(path)?;
        let mut count = 0;
        for (lineno, entry) in list_entries(&text) {
            let mmsi = entry.parse::<u32>().map_err(|_| {
                AisError::Config(format!(
                    "{}:{}: invalid MMSI {:?}",
                    path.display(),
                    lineno,
                    entry
                ))
            })?;
            self.add_mmsi(mmsi);
            count += 1;
        }
        Ok(count)
    }

    /// Load newline-delimited vessel names. Blank lines and `#` comments are skipped.
    pub fn load_name_file(&mut self, path: &Path) -> Result<usize> {
        let text = read_list(path)?;
        let mut count = 0;
        for (_, entry) in list_entries(&text) {
            self.add_name(entry);
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> bool {
        self.mmsis.is_empty() && self.names.is_empty()
    }

    /// Reject a watchlist with neither dimension set.
    pub fn require_nonempty(self) -> Result<Self> {
        if self.is_empty() {
            return Err(AisError::Config(
                "watchlist is empty: give at least one MMSI or vessel name".into(),
            ));
        }
        Ok(self)
    }

    /// MMSIs in ascending order.
    pub fn mmsis(&self) -> BTreeSet<u32> {
        self.mmsis.iter().copied().collect()
    }

    /// Names in lexical order.
    pub fn names(&self) -> BTreeSet<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    pub fn contains_mmsi(&self, mmsi: u32) -> bool {
        self.mmsis.contains(&mmsi)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// True if the message's MMSI or name is on the list.
    ///
    /// A message missing a field simply can't match on that dimension.
    /// No deduplication: every matching sighting matches again.
    pub fn matches(&self, msg: &DecodedMessage) -> bool {
        let by_mmsi = msg.mmsi.is_some_and(|m| self.contains_mmsi(m));
        let by_name = msg
            .name
            .as_deref()
            .is_some_and(|n| self.contains_name(n));
        by_mmsi || by_name
    }
}

/// Free-function form of `Watchlist::matches`.
pub fn matches(msg: &DecodedMessage, watchlist: &Watchlist) -> bool {
    watchlist.matches(msg)
}

fn read_list(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AisError::Config(format!("cannot read {}: {e}", path.display())))
}

/// Non-empty, non-comment lines with 1-based line numbers.
fn list_entries(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
