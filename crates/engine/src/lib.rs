//! Ownership and trading of real-estate parcels and currency balances on
//! an ordered key-value ledger.
//!
//! The engine is the state machine executed identically by every
//! validating node of the hosting ledger platform: entities, status
//! lifecycles, escrowed fund movement, secondary-index upkeep and the
//! expiry-sweep decision logic. Replication, endorsement, transport and
//! scheduling all live outside; the engine only consumes the [`Ledger`]
//! interface and trusts the platform to commit each operation atomically.

pub use accounts::{ADMIN_ACCOUNT_ID, Account, BOOTSTRAP_ACCOUNTS};
pub use donating::{ClosedDonating, Donating, DonatingParticipation, DonatingStatus};
pub use error::EngineError;
pub use ledger::{Ledger, LedgerError, MemLedger, ScanPage};
pub use money::Money;
pub use ops::{Engine, Page};
pub use real_estate::RealEstate;
pub use selling::{ClosedSelling, Selling, SellingParticipation, SellingStatus};

mod accounts;
pub mod contract;
mod donating;
mod error;
mod index;
mod ledger;
mod money;
mod ops;
mod real_estate;
mod selling;

type ResultEngine<T> = Result<T, EngineError>;
