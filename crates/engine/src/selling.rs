//! Sale offers and their lifecycle.
//!
//! A `Selling` starts in [`SaleStart`], moves to [`Delivery`] when a buyer
//! accepts (and pays into escrow), and ends exactly once in [`Done`],
//! [`Cancelled`] or [`Expired`]. Offers are never deleted; history stays on
//! the ledger.
//!
//!  [`SaleStart`]: SellingStatus::SaleStart
//!  [`Delivery`]: SellingStatus::Delivery
//!  [`Done`]: SellingStatus::Done
//!  [`Cancelled`]: SellingStatus::Cancelled
//!  [`Expired`]: SellingStatus::Expired

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SellingStatus {
    /// Listed, waiting for a buyer.
    SaleStart,
    /// Bought and paid into escrow, waiting for the seller to confirm.
    Delivery,
    Done,
    Cancelled,
    Expired,
}

impl SellingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SaleStart => "saleStart",
            Self::Delivery => "delivery",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// `true` while a transition out of the status is still possible.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::SaleStart | Self::Delivery)
    }

    /// `true` for the statuses `close_selling` accepts as a target.
    #[must_use]
    pub fn is_closing(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Expired)
    }
}

impl TryFrom<&str> for SellingStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "saleStart" => Ok(Self::SaleStart),
            "delivery" => Ok(Self::Delivery),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(EngineError::Validation(format!(
                "invalid selling status: {other}"
            ))),
        }
    }
}

/// A sale offer, keyed by `(seller, object_of_sale)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selling {
    /// The parcel on offer.
    pub object_of_sale: String,
    pub seller: String,
    /// Empty until a buyer accepts.
    pub buyer: Option<String>,
    pub price: Money,
    /// Validity period in days.
    pub sale_period: u32,
    pub create_time: DateTime<Utc>,
    pub status: SellingStatus,
}

impl Selling {
    /// Instant after which the offer is past due and the sweep force-closes
    /// it.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.create_time + Duration::days(i64::from(self.sale_period))
    }
}

/// Buyer-side snapshot of an accepted offer, keyed by
/// `(buyer, accept_time)`. Updated transactionally alongside the parent
/// `Selling`; a materialized view, not a second source of truth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellingParticipation {
    pub buyer: String,
    pub create_time: DateTime<Utc>,
    pub selling: Selling,
}

/// Result of closing a sale offer: the offer in its terminal status and
/// the parcel as it exists afterwards (transferred on `done`, released
/// otherwise).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedSelling {
    pub selling: Selling,
    pub real_estate: crate::RealEstate,
}
