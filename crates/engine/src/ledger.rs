//! The ordered key-value store the engine runs against.
//!
//! The distributed-ledger platform executing the engine supplies the real
//! store and guarantees that every write performed during one invocation
//! commits atomically with the rest. [`MemLedger`] is the reference
//! implementation used by the test suite and by embedders without a
//! replicated backend.

use std::collections::BTreeMap;
use std::ops::Bound;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Storage failures, propagated verbatim to the caller and never retried
/// by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid bookmark")]
    InvalidBookmark,
    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// One page of a prefix scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    /// `(key, value)` pairs in key-lexicographic order.
    pub entries: Vec<(String, Vec<u8>)>,
    /// Cursor resuming after the last entry; `None` when the scan is
    /// exhausted. Opaque to callers.
    pub bookmark: Option<String>,
    pub fetched_count: u32,
}

/// Ordered key-value interface consumed by every workflow.
///
/// All operations performed through one `Ledger` handle during a single
/// engine invocation are applied atomically by the platform.
pub trait Ledger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Upsert.
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    fn delete(&mut self, key: &str) -> Result<(), LedgerError>;

    /// Returns every live entry whose key starts with `prefix`, in key
    /// order, `page_size` entries at a time. Passing back the returned
    /// bookmark resumes exactly after the last entry of the previous page;
    /// `page_size = None` returns everything in one page.
    fn scan_prefix(
        &self,
        prefix: &str,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> Result<ScanPage, LedgerError>;
}

fn encode_bookmark(key: &str) -> String {
    STANDARD.encode(key.as_bytes())
}

fn decode_bookmark(bookmark: &str) -> Result<String, LedgerError> {
    let bytes = STANDARD
        .decode(bookmark)
        .map_err(|_| LedgerError::InvalidBookmark)?;
    String::from_utf8(bytes).map_err(|_| LedgerError::InvalidBookmark)
}

/// In-memory [`Ledger`] over an ordered map.
#[derive(Debug, Default, Clone)]
pub struct MemLedger {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Ledger for MemLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), LedgerError> {
        self.entries.remove(key);
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> Result<ScanPage, LedgerError> {
        let start = match bookmark {
            Some(cursor) => {
                let key = decode_bookmark(cursor)?;
                if !key.starts_with(prefix) {
                    return Err(LedgerError::InvalidBookmark);
                }
                key
            }
            None => prefix.to_string(),
        };

        let limit = page_size.map(|n| n as usize);
        let mut entries = Vec::new();
        let mut next = None;

        let range = self
            .entries
            .range::<String, _>((Bound::Included(&start), Bound::Unbounded));
        for (key, value) in range {
            if !key.starts_with(prefix) {
                break;
            }
            if limit.is_some_and(|max| entries.len() >= max) {
                next = Some(encode_bookmark(key));
                break;
            }
            entries.push((key.clone(), value.clone()));
        }

        let fetched_count = entries.len() as u32;
        Ok(ScanPage {
            entries,
            bookmark: next,
            fetched_count,
        })
    }
}
