//! Expiry sweep over open sale offers.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::selling::{Selling, SellingStatus};
use crate::{Ledger, ResultEngine};

use super::Engine;

impl<L: Ledger> Engine<L> {
    /// Force-closes every open offer whose validity period has elapsed at
    /// `now`, reusing the regular closing logic (so a paid buyer is
    /// refunded). Returns the offers that were closed.
    ///
    /// `now` is supplied by the caller; the scheduler that decides when to
    /// sweep lives outside the engine, and running the sweep twice over
    /// the same state is harmless.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> ResultEngine<Vec<Selling>> {
        let mut due = Vec::new();
        for status in [SellingStatus::SaleStart, SellingStatus::Delivery] {
            let open = self.selling_list_by_status(status, None, None)?;
            due.extend(
                open.records
                    .into_iter()
                    .filter(|selling| now > selling.deadline()),
            );
        }
        debug!(due = due.len(), "expiry sweep scan finished");

        let mut closed = Vec::with_capacity(due.len());
        for selling in due {
            let closed_offer = self.close_selling(
                &selling.object_of_sale,
                &selling.seller,
                selling.buyer.as_deref(),
                SellingStatus::Expired,
            )?;
            closed.push(closed_offer.selling);
        }
        if !closed.is_empty() {
            info!(closed = closed.len(), "expired offers swept");
        }
        Ok(closed)
    }
}
