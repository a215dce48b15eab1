//! The selling workflow: offer, escrowed purchase, settlement.
//!
//! The buyer pays at acceptance time; the funds live in the ledger's own
//! balance field until the seller confirms (credit) or the offer is
//! cancelled or expires (refund). There is no separate escrow account.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::accounts::Account;
use crate::real_estate::RealEstate;
use crate::selling::{ClosedSelling, Selling, SellingParticipation, SellingStatus};
use crate::{EngineError, Ledger, Money, ResultEngine, index};

use super::{Engine, Page, account_key, estate_key, require_filled, sale_key, sale_status_key};

impl<L: Ledger> Engine<L> {
    /// Opens a sale offer for a parcel the seller owns, locking the parcel
    /// until the offer reaches a terminal status.
    pub fn create_selling(
        &mut self,
        object_of_sale: &str,
        seller: &str,
        price: Money,
        sale_period: u32,
        now: DateTime<Utc>,
    ) -> ResultEngine<Selling> {
        let object_of_sale = require_filled(object_of_sale, "object of sale")?;
        let seller = require_filled(seller, "seller")?;
        if !price.is_positive() {
            return Err(EngineError::Validation(
                "price must be greater than zero".to_string(),
            ));
        }
        if sale_period == 0 {
            return Err(EngineError::Validation(
                "sale period must be at least one day".to_string(),
            ));
        }

        let estate_key = estate_key(seller, object_of_sale)?;
        let mut estate: RealEstate = self.require_json(&estate_key, object_of_sale)?;
        if estate.encumbered {
            return Err(EngineError::Encumbered(object_of_sale.to_string()));
        }

        // Re-listing a parcel whose previous offer ended without a transfer
        // overwrites that offer; its status marker goes with it.
        let sale_key = sale_key(seller, object_of_sale)?;
        let previous: Option<Selling> = self.read_json(&sale_key)?;

        let selling = Selling {
            object_of_sale: object_of_sale.to_string(),
            seller: seller.to_string(),
            buyer: None,
            price,
            sale_period,
            create_time: now,
            status: SellingStatus::SaleStart,
        };
        estate.encumbered = true;

        if let Some(previous) = previous {
            self.delete_key(&sale_status_key(&previous)?)?;
        }
        self.write_json(&sale_key, &selling)?;
        self.write_json(&estate_key, &estate)?;
        self.put_marker(&sale_status_key(&selling)?)?;

        info!(seller, object_of_sale, price = %price, "selling opened");
        Ok(selling)
    }

    /// Buys an open offer: records the buyer, debits the price into escrow
    /// and writes the buyer-side participation snapshot.
    pub fn accept_selling(
        &mut self,
        object_of_sale: &str,
        seller: &str,
        buyer: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<SellingParticipation> {
        let object_of_sale = require_filled(object_of_sale, "object of sale")?;
        let seller = require_filled(seller, "seller")?;
        let buyer = require_filled(buyer, "buyer")?;
        if seller == buyer {
            return Err(EngineError::Forbidden(
                "buyer and seller must differ".to_string(),
            ));
        }

        let _estate: RealEstate =
            self.require_json(&estate_key(seller, object_of_sale)?, object_of_sale)?;
        let sale_key = sale_key(seller, object_of_sale)?;
        let mut selling: Selling = self.require_json(&sale_key, object_of_sale)?;
        if selling.status != SellingStatus::SaleStart {
            return Err(EngineError::WrongStatus(format!(
                "offer for {object_of_sale} is {}",
                selling.status.as_str()
            )));
        }

        let buyer_key = account_key(buyer)?;
        let mut buyer_account: Account = self.require_json(&buyer_key, buyer)?;
        if buyer_account.is_admin() {
            return Err(EngineError::Forbidden(
                "the administrator cannot buy real estate".to_string(),
            ));
        }
        if buyer_account.balance < selling.price {
            return Err(EngineError::InsufficientFunds(format!(
                "balance {} is below price {}",
                buyer_account.balance, selling.price
            )));
        }

        let stale_marker = sale_status_key(&selling)?;
        selling.buyer = Some(buyer.to_string());
        selling.status = SellingStatus::Delivery;
        let participation = SellingParticipation {
            buyer: buyer.to_string(),
            create_time: now,
            selling: selling.clone(),
        };
        buyer_account.balance -= selling.price;

        self.write_json(&sale_key, &selling)?;
        self.write_json(
            &index::key(index::SALE_BY_BUYER, &[buyer, &index::time_segment(now)])?,
            &participation,
        )?;
        self.write_json(&buyer_key, &buyer_account)?;
        self.move_marker(&stale_marker, &sale_status_key(&selling)?)?;

        info!(seller, buyer, object_of_sale, price = %selling.price, "selling accepted");
        Ok(participation)
    }

    /// Closes an offer with `done`, `cancelled` or `expired`.
    ///
    /// `done` settles a delivery-stage offer: the seller is credited, the
    /// parcel transfers to the buyer under a fresh id and the old record is
    /// deleted. `cancelled`/`expired` release the parcel; a buyer who had
    /// already paid is refunded. Transitions are one-shot: an offer already
    /// in a terminal status cannot be closed again.
    pub fn close_selling(
        &mut self,
        object_of_sale: &str,
        seller: &str,
        buyer: Option<&str>,
        status: SellingStatus,
    ) -> ResultEngine<ClosedSelling> {
        if !status.is_closing() {
            return Err(EngineError::Validation(format!(
                "{} is not a closing status",
                status.as_str()
            )));
        }
        let object_of_sale = require_filled(object_of_sale, "object of sale")?;
        let seller = require_filled(seller, "seller")?;
        let buyer = match buyer {
            Some(id) => {
                let id = require_filled(id, "buyer")?;
                if id == seller {
                    return Err(EngineError::Forbidden(
                        "buyer and seller must differ".to_string(),
                    ));
                }
                Some(id)
            }
            None => None,
        };

        let estate_key = estate_key(seller, object_of_sale)?;
        let mut estate: RealEstate = self.require_json(&estate_key, object_of_sale)?;
        let sale_key = sale_key(seller, object_of_sale)?;
        let mut selling: Selling = self.require_json(&sale_key, object_of_sale)?;
        let stale_marker = sale_status_key(&selling)?;

        match selling.status {
            SellingStatus::SaleStart => {
                if status == SellingStatus::Done {
                    return Err(EngineError::WrongStatus(
                        "only a delivery-stage offer can be completed".to_string(),
                    ));
                }
                estate.encumbered = false;
                selling.status = status;

                self.write_json(&estate_key, &estate)?;
                self.write_json(&sale_key, &selling)?;
                self.move_marker(&stale_marker, &sale_status_key(&selling)?)?;

                info!(seller, object_of_sale, status = status.as_str(), "selling closed");
                Ok(ClosedSelling {
                    selling,
                    real_estate: estate,
                })
            }
            SellingStatus::Delivery => {
                let recorded = selling.buyer.clone().ok_or_else(|| {
                    EngineError::WrongStatus("delivery-stage offer has no buyer".to_string())
                })?;
                let buyer = buyer.ok_or_else(|| {
                    EngineError::Validation(
                        "buyer is required to close a delivery-stage offer".to_string(),
                    )
                })?;
                if buyer != recorded {
                    return Err(EngineError::Forbidden(format!(
                        "{buyer} is not the buyer of this offer"
                    )));
                }

                let (participation_key, mut participation) =
                    self.find_open_participation(&recorded, object_of_sale, seller)?;

                if status == SellingStatus::Done {
                    let seller_key = account_key(seller)?;
                    let mut seller_account: Account = self.require_json(&seller_key, seller)?;
                    seller_account.balance += selling.price;

                    let transferred = estate.reissued_to(&recorded);
                    selling.status = SellingStatus::Done;
                    participation.selling = selling.clone();

                    self.write_json(&seller_key, &seller_account)?;
                    self.write_json(
                        &super::estate_key(&recorded, &transferred.real_estate_id)?,
                        &transferred,
                    )?;
                    self.delete_key(&estate_key)?;
                    self.write_json(&sale_key, &selling)?;
                    self.write_json(&participation_key, &participation)?;
                    self.move_marker(&stale_marker, &sale_status_key(&selling)?)?;

                    info!(
                        seller,
                        buyer,
                        object_of_sale,
                        new_id = %transferred.real_estate_id,
                        "selling completed"
                    );
                    Ok(ClosedSelling {
                        selling,
                        real_estate: transferred,
                    })
                } else {
                    let buyer_key = account_key(&recorded)?;
                    let mut buyer_account: Account = self.require_json(&buyer_key, &recorded)?;
                    buyer_account.balance += selling.price;

                    estate.encumbered = false;
                    selling.status = status;
                    participation.selling = selling.clone();

                    self.write_json(&buyer_key, &buyer_account)?;
                    self.write_json(&estate_key, &estate)?;
                    self.write_json(&sale_key, &selling)?;
                    self.write_json(&participation_key, &participation)?;
                    self.move_marker(&stale_marker, &sale_status_key(&selling)?)?;

                    info!(
                        seller,
                        buyer,
                        object_of_sale,
                        status = status.as_str(),
                        "selling closed with refund"
                    );
                    Ok(ClosedSelling {
                        selling,
                        real_estate: estate,
                    })
                }
            }
            _ => Err(EngineError::WrongStatus(format!(
                "offer is already {}",
                selling.status.as_str()
            ))),
        }
    }

    /// Lists offers, optionally restricted to one seller.
    pub fn selling_list(
        &self,
        seller: Option<&str>,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<Selling>> {
        let prefix = match seller {
            Some(seller) => index::key(index::SALE, &[require_filled(seller, "seller")?])?,
            None => index::key(index::SALE, &[])?,
        };
        self.scan_json(&prefix, page_size, bookmark)
    }

    /// Lists the offers a buyer participates in.
    pub fn selling_list_by_buyer(
        &self,
        buyer: &str,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<SellingParticipation>> {
        let buyer = require_filled(buyer, "buyer")?;
        self.scan_json(
            &index::key(index::SALE_BY_BUYER, &[buyer])?,
            page_size,
            bookmark,
        )
    }

    /// Lists offers currently in `status`, resolved through the status
    /// index in creation order.
    pub fn selling_list_by_status(
        &self,
        status: SellingStatus,
        page_size: Option<u32>,
        bookmark: Option<&str>,
    ) -> ResultEngine<Page<Selling>> {
        let prefix = index::key(index::SALE_STATUS, &[status.as_str()])?;
        let page = self.ledger.scan_prefix(&prefix, page_size, bookmark)?;

        let mut records = Vec::with_capacity(page.entries.len());
        for (marker_key, _) in &page.entries {
            let (_, attrs) = index::split(marker_key)?;
            let [_, _, seller, object_of_sale] = attrs.as_slice() else {
                return Err(EngineError::Serialization(format!(
                    "malformed status index key: {marker_key:?}"
                )));
            };
            records.push(self.require_json(&sale_key(seller, object_of_sale)?, object_of_sale)?);
        }
        Ok(Page {
            records,
            bookmark: page.bookmark,
            fetched_count: page.fetched_count,
        })
    }

    /// Finds the buyer-side snapshot of a delivery-stage offer. The
    /// snapshot key embeds the accept timestamp, which close arguments do
    /// not carry, so the buyer's prefix is scanned instead.
    fn find_open_participation(
        &self,
        buyer: &str,
        object_of_sale: &str,
        seller: &str,
    ) -> ResultEngine<(String, SellingParticipation)> {
        let prefix = index::key(index::SALE_BY_BUYER, &[buyer])?;
        for (key, bytes) in self.scan_raw(&prefix)? {
            let participation: SellingParticipation = serde_json::from_slice(&bytes)?;
            if participation.selling.object_of_sale == object_of_sale
                && participation.selling.seller == seller
                && participation.selling.status == SellingStatus::Delivery
            {
                return Ok((key, participation));
            }
        }
        Err(EngineError::KeyNotFound(format!(
            "participation of {buyer} in {object_of_sale}"
        )))
    }
}
