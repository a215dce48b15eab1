//! Account entities and the fixed bootstrap set.

use serde::{Deserialize, Serialize};

use crate::Money;

/// Id of the administrator account created at bootstrap. The administrator
/// registers parcels and never holds funds or property.
pub const ADMIN_ACCOUNT_ID: &str = "admin";

/// The initial account set written once at system bootstrap:
/// the administrator plus five funded proprietors.
pub const BOOTSTRAP_ACCOUNTS: [(&str, &str, i64); 6] = [
    (ADMIN_ACCOUNT_ID, "Administrator", 0),
    ("owner-1", "Owner No.1", 500_000_000),
    ("owner-2", "Owner No.2", 500_000_000),
    ("owner-3", "Owner No.3", 500_000_000),
    ("owner-4", "Owner No.4", 500_000_000),
    ("owner-5", "Owner No.5", 500_000_000),
];

/// A currency-holding account.
///
/// Accounts are created only at bootstrap; the balance is mutated only by
/// the selling workflow (escrow debit on purchase, credit on confirmation,
/// refund on cancellation).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    pub display_name: String,
    pub balance: Money,
}

impl Account {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.account_id == ADMIN_ACCOUNT_ID
    }
}
