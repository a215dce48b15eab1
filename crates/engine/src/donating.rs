//! Donation offers: ownership transfer without funds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DonatingStatus {
    /// Offered, waiting for the grantee to accept.
    DonatingStart,
    Done,
    Cancelled,
}

impl DonatingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DonatingStart => "donatingStart",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// `true` for the statuses `close_donating` accepts as a target.
    #[must_use]
    pub fn is_closing(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl TryFrom<&str> for DonatingStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "donatingStart" => Ok(Self::DonatingStart),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid donating status: {other}"
            ))),
        }
    }
}

/// A donation offer, keyed by `(donor, object_of_donating, grantee)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donating {
    pub object_of_donating: String,
    pub donor: String,
    pub grantee: String,
    pub create_time: DateTime<Utc>,
    pub status: DonatingStatus,
}

/// Grantee-side snapshot, keyed by `(grantee, create_time)`. Updated
/// transactionally alongside the parent `Donating`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonatingParticipation {
    pub grantee: String,
    pub create_time: DateTime<Utc>,
    pub donating: Donating,
}

/// Result of closing a donation offer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedDonating {
    pub donating: Donating,
    pub real_estate: crate::RealEstate,
}
