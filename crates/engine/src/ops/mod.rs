//! Workflow operations.
//!
//! Every public method on [`Engine`] is one logical ledger transaction:
//! the platform applies all of its writes atomically or none of them. Each
//! method performs its validation and precondition reads first and touches
//! the ledger for writing only once everything has been checked, so a
//! conflicting-write retry replays the whole operation from committed
//! state.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::donating::Donating;
use crate::selling::Selling;
use crate::{EngineError, Ledger, ResultEngine, index};

mod accounts;
mod donating;
mod estates;
mod selling;
mod sweep;

/// One page of a list query, with the opaque cursor for the next page.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    /// `None` when there is no further page.
    pub bookmark: Option<String>,
    pub fetched_count: u32,
}

/// The asset-trading state machine, bound to a [`Ledger`].
#[derive(Debug)]
pub struct Engine<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> Engine<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> ResultEngine<Option<T>> {
        match self.ledger.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn require_json<T: DeserializeOwned>(&self, key: &str, what: &str) -> ResultEngine<T> {
        self.read_json(key)?
            .ok_or_else(|| EngineError::KeyNotFound(what.to_string()))
    }

    fn write_json<T: Serialize>(&mut self, key: &str, value: &T) -> ResultEngine<()> {
        let bytes = serde_json::to_vec(value)?;
        self.ledger.put(key, bytes)?;
        Ok(())
    }

    fn scan_json<T: DeserializeOwned>(
        &self,
        prefix: &str,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<T>> {
        let page = self.ledger.scan_prefix(prefix, page_size, bookmark)?;
        let mut records = Vec::with_capacity(page.entries.len());
        for (_, bytes) in &page.entries {
            records.push(serde_json::from_slice(bytes)?);
        }
        Ok(Page {
            records,
            bookmark: page.bookmark,
            fetched_count: page.fetched_count,
        })
    }

    /// Full unpaginated scan, keys included.
    fn scan_raw(&self, prefix: &str) -> ResultEngine<Vec<(String, Vec<u8>)>> {
        let page = self.ledger.scan_prefix(prefix, None, None)?;
        Ok(page.entries)
    }

    /// Writes a key-only index marker.
    fn put_marker(&mut self, key: &str) -> ResultEngine<()> {
        self.ledger.put(key, Vec::new())?;
        Ok(())
    }

    /// Relocates an index marker after a status change.
    fn move_marker(&mut self, stale_key: &str, fresh_key: &str) -> ResultEngine<()> {
        self.ledger.delete(stale_key)?;
        self.ledger.put(fresh_key, Vec::new())?;
        Ok(())
    }

    fn delete_key(&mut self, key: &str) -> ResultEngine<()> {
        self.ledger.delete(key)?;
        Ok(())
    }
}

fn require_filled<'a>(value: &'a str, label: &str) -> ResultEngine<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed)
}

fn account_key(account_id: &str) -> ResultEngine<String> {
    index::key(index::ACCOUNT, &[account_id])
}

fn estate_key(proprietor: &str, real_estate_id: &str) -> ResultEngine<String> {
    index::key(index::ESTATE, &[proprietor, real_estate_id])
}

fn sale_key(seller: &str, object_of_sale: &str) -> ResultEngine<String> {
    index::key(index::SALE, &[seller, object_of_sale])
}

fn donation_key(donor: &str, object_of_donating: &str, grantee: &str) -> ResultEngine<String> {
    index::key(index::DONATION, &[donor, object_of_donating, grantee])
}

/// Marker key locating a selling through its current status; moved in the
/// same transaction as every status change.
fn sale_status_key(selling: &Selling) -> ResultEngine<String> {
    index::key(
        index::SALE_STATUS,
        &[
            selling.status.as_str(),
            &index::time_segment(selling.create_time),
            &selling.seller,
            &selling.object_of_sale,
        ],
    )
}

fn donation_status_key(donating: &Donating) -> ResultEngine<String> {
    index::key(
        index::DONATION_STATUS,
        &[
            donating.status.as_str(),
            &index::time_segment(donating.create_time),
            &donating.donor,
            &donating.object_of_donating,
            &donating.grantee,
        ],
    )
}
