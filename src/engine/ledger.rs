//! Trade ledger — append-only history of executed decisions.

use std::collections::HashSet;

use crate::types::TradeRecord;

/// In-memory, insertion-ordered record of executed trades.
///
/// Entries are never mutated or removed for the life of the process.
#[derive(Debug, Default)]
pub struct TradeLedger {
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: TradeRecord) {
        self.records.push(record);
    }

    /// All records in insertion order.
    pub fn all(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Number of distinct instruments traded.
    pub fn instruments(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.instrument.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
