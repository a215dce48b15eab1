//! Parcel registration and queries.

use tracing::info;

use crate::accounts::Account;
use crate::real_estate::RealEstate;
use crate::{EngineError, Ledger, ResultEngine, index};

use super::{Engine, Page, account_key, estate_key, require_filled};

impl<L: Ledger> Engine<L> {
    /// Registers a new parcel for `proprietor`. Administrator-only: the
    /// operator must be the bootstrap administrator, and property cannot be
    /// registered to the administrator itself.
    pub fn create_real_estate(
        &mut self,
        operator: &str,
        proprietor: &str,
        total_area: f64,
        living_space: f64,
    ) -> ResultEngine<RealEstate> {
        let operator = require_filled(operator, "operator")?;
        let proprietor = require_filled(proprietor, "proprietor")?;
        if operator == proprietor {
            return Err(EngineError::Forbidden(
                "operator and proprietor must differ".to_string(),
            ));
        }
        let estate = RealEstate::new(proprietor, total_area, living_space)?;

        let operator_account: Account = self.require_json(&account_key(operator)?, operator)?;
        if !operator_account.is_admin() {
            return Err(EngineError::Forbidden(
                "only the administrator may register real estate".to_string(),
            ));
        }
        let owner_account: Account = self.require_json(&account_key(proprietor)?, proprietor)?;
        if owner_account.is_admin() {
            return Err(EngineError::Forbidden(
                "real estate cannot be registered to the administrator".to_string(),
            ));
        }

        self.write_json(&estate_key(proprietor, &estate.real_estate_id)?, &estate)?;
        info!(
            proprietor,
            real_estate_id = %estate.real_estate_id,
            "real estate registered"
        );
        Ok(estate)
    }

    /// Looks up a parcel under its current owner.
    pub fn real_estate(&self, proprietor: &str, real_estate_id: &str) -> ResultEngine<RealEstate> {
        let proprietor = require_filled(proprietor, "proprietor")?;
        let real_estate_id = require_filled(real_estate_id, "real estate id")?;
        self.require_json(&estate_key(proprietor, real_estate_id)?, real_estate_id)
    }

    /// Lists parcels, optionally restricted to one owner.
    pub fn real_estate_list(
        &self,
        proprietor: Option<&str>,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<RealEstate>> {
        let prefix = match proprietor {
            Some(owner) => index::key(index::ESTATE, &[require_filled(owner, "proprietor")?])?,
            None => index::key(index::ESTATE, &[])?,
        };
        self.scan_json(&prefix, page_size, bookmark)
    }
}
