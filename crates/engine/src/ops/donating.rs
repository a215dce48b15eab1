//! The donating workflow: ownership transfer without funds.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::accounts::Account;
use crate::donating::{ClosedDonating, Donating, DonatingParticipation, DonatingStatus};
use crate::real_estate::RealEstate;
use crate::{EngineError, Ledger, ResultEngine, index};

use super::{
    Engine, Page, account_key, donation_key, donation_status_key, estate_key, require_filled,
};

impl<L: Ledger> Engine<L> {
    /// Offers a parcel to a grantee, locking it until the grantee accepts
    /// or the offer is cancelled. The grantee-side snapshot is written at
    /// create time, unlike selling where the buyer appears only at accept.
    pub fn create_donating(
        &mut self,
        object_of_donating: &str,
        donor: &str,
        grantee: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<DonatingParticipation> {
        let object_of_donating = require_filled(object_of_donating, "object of donating")?;
        let donor = require_filled(donor, "donor")?;
        let grantee = require_filled(grantee, "grantee")?;
        if donor == grantee {
            return Err(EngineError::Forbidden(
                "donor and grantee must differ".to_string(),
            ));
        }

        let estate_key = estate_key(donor, object_of_donating)?;
        let mut estate: RealEstate = self.require_json(&estate_key, object_of_donating)?;

        let grantee_account: Account = self.require_json(&account_key(grantee)?, grantee)?;
        if grantee_account.is_admin() {
            return Err(EngineError::Forbidden(
                "real estate cannot be donated to the administrator".to_string(),
            ));
        }
        if estate.encumbered {
            return Err(EngineError::Encumbered(object_of_donating.to_string()));
        }

        // A repeated offer to the same grantee overwrites the cancelled one;
        // its status marker goes with it.
        let donation_key = donation_key(donor, object_of_donating, grantee)?;
        let previous: Option<Donating> = self.read_json(&donation_key)?;

        let donating = Donating {
            object_of_donating: object_of_donating.to_string(),
            donor: donor.to_string(),
            grantee: grantee.to_string(),
            create_time: now,
            status: DonatingStatus::DonatingStart,
        };
        let participation = DonatingParticipation {
            grantee: grantee.to_string(),
            create_time: now,
            donating: donating.clone(),
        };
        estate.encumbered = true;

        if let Some(previous) = previous {
            self.delete_key(&donation_status_key(&previous)?)?;
        }
        self.write_json(&donation_key, &donating)?;
        self.write_json(&estate_key, &estate)?;
        self.write_json(
            &index::key(
                index::DONATION_BY_GRANTEE,
                &[grantee, &index::time_segment(now)],
            )?,
            &participation,
        )?;
        self.put_marker(&donation_status_key(&donating)?)?;

        info!(donor, grantee, object_of_donating, "donating opened");
        Ok(participation)
    }

    /// Closes a donation offer with `done` (transfer, parcel re-keyed
    /// under a fresh id) or `cancelled` (parcel released). Legal only
    /// while the offer is still open; no funds move either way.
    pub fn close_donating(
        &mut self,
        object_of_donating: &str,
        donor: &str,
        grantee: &str,
        status: DonatingStatus,
    ) -> ResultEngine<ClosedDonating> {
        if !status.is_closing() {
            return Err(EngineError::Validation(format!(
                "{} is not a closing status",
                status.as_str()
            )));
        }
        let object_of_donating = require_filled(object_of_donating, "object of donating")?;
        let donor = require_filled(donor, "donor")?;
        let grantee = require_filled(grantee, "grantee")?;
        if donor == grantee {
            return Err(EngineError::Forbidden(
                "donor and grantee must differ".to_string(),
            ));
        }

        let estate_key = estate_key(donor, object_of_donating)?;
        let mut estate: RealEstate = self.require_json(&estate_key, object_of_donating)?;
        let donation_key = donation_key(donor, object_of_donating, grantee)?;
        let mut donating: Donating = self.require_json(&donation_key, object_of_donating)?;
        if donating.status != DonatingStatus::DonatingStart {
            return Err(EngineError::WrongStatus(format!(
                "offer is already {}",
                donating.status.as_str()
            )));
        }
        let stale_marker = donation_status_key(&donating)?;

        let (participation_key, mut participation) =
            self.find_open_donation(grantee, object_of_donating, donor)?;

        let real_estate = if status == DonatingStatus::Done {
            let transferred = estate.reissued_to(grantee);
            donating.status = DonatingStatus::Done;
            participation.donating = donating.clone();

            self.write_json(
                &super::estate_key(grantee, &transferred.real_estate_id)?,
                &transferred,
            )?;
            self.delete_key(&estate_key)?;
            transferred
        } else {
            estate.encumbered = false;
            donating.status = DonatingStatus::Cancelled;
            participation.donating = donating.clone();

            self.write_json(&estate_key, &estate)?;
            estate
        };
        self.write_json(&donation_key, &donating)?;
        self.write_json(&participation_key, &participation)?;
        self.move_marker(&stale_marker, &donation_status_key(&donating)?)?;

        info!(
            donor,
            grantee,
            object_of_donating,
            status = status.as_str(),
            "donating closed"
        );
        Ok(ClosedDonating {
            donating,
            real_estate,
        })
    }

    /// Lists donation offers, optionally restricted to one donor.
    pub fn donating_list(
        &self,
        donor: Option<&str>,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<Donating>> {
        let prefix = match donor {
            Some(donor) => index::key(index::DONATION, &[require_filled(donor, "donor")?])?,
            None => index::key(index::DONATION, &[])?,
        };
        self.scan_json(&prefix, page_size, bookmark)
    }

    /// Lists the offers made to a grantee.
    pub fn donating_list_by_grantee(
        &self,
        grantee: &str,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<DonatingParticipation>> {
        let grantee = require_filled(grantee, "grantee")?;
        self.scan_json(
            &index::key(index::DONATION_BY_GRANTEE, &[grantee])?,
            page_size,
            bookmark,
        )
    }

    /// Lists donation offers currently in `status`, resolved through the
    /// status index in creation order.
    pub fn donating_list_by_status(
        &self,
        status: DonatingStatus,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<Donating>> {
        let prefix = index::key(index::DONATION_STATUS, &[status.as_str()])?;
        let page = self.ledger.scan_prefix(&prefix, page_size, bookmark)?;

        let mut records = Vec::with_capacity(page.entries.len());
        for (marker_key, _) in &page.entries {
            let (_, attrs) = index::split(marker_key)?;
            let [_, _, donor, object_of_donating, grantee] = attrs.as_slice() else {
                return Err(EngineError::Serialization(format!(
                    "malformed status index key: {marker_key:?}"
                )));
            };
            records.push(self.require_json(
                &donation_key(donor, object_of_donating, grantee)?,
                object_of_donating,
            )?);
        }
        Ok(Page {
            records,
            bookmark: page.bookmark,
            fetched_count: page.fetched_count,
        })
    }

    fn find_open_donation(
        &self,
        grantee: &str,
        object_of_donating: &str,
        donor: &str,
    ) -> ResultEngine<(String, DonatingParticipation)> {
        let prefix = index::key(index::DONATION_BY_GRANTEE, &[grantee])?;
        for (key, bytes) in self.scan_raw(&prefix)? {
            let participation: DonatingParticipation = serde_json::from_slice(&bytes)?;
            if participation.donating.object_of_donating == object_of_donating
                && participation.donating.donor == donor
                && participation.donating.status == DonatingStatus::DonatingStart
            {
                return Ok((key, participation));
            }
        }
        Err(EngineError::KeyNotFound(format!(
            "participation of {grantee} in {object_of_donating}"
        )))
    }
}
