//! Terminal tables: the watchlist at startup, run counters at shutdown.

use comfy_table::{Cell, Table};

use ais_core::Watchlist;

use crate::stream::StreamStats;

/// One row per watched MMSI or name.
pub fn watchlist_table(watchlist: &Watchlist) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Watching", "Value"]);
    for mmsi in watchlist.mmsis() {
        table.add_row(vec![Cell::new("MMSI"), Cell::new(mmsi)]);
    }
    for name in watchlist.names() {
        table.add_row(vec![Cell::new("Name"), Cell::new(name)]);
    }
    table
}

pub fn stats_table(stats: &StreamStats) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Records",
        "Malformed",
        "Fragments",
        "Decode errors",
        "Decoded",
        "Alerts",
        "Placemarks",
    ]);
    table.add_row(vec![
        Cell::new(stats.records),
        Cell::new(stats.framing_errors),
        Cell::new(stats.fragments),
        Cell::new(stats.decode_errors),
        Cell::new(stats.decoded),
        Cell::new(stats.alerts),
        Cell::new(stats.placemarks),
    ]);
    table
}
