use chrono::{DateTime, TimeZone, Utc};

use engine::{
    ADMIN_ACCOUNT_ID, DonatingStatus, Engine, EngineError, MemLedger, Money, SellingStatus,
};

const OWNER_BALANCE: i64 = 500_000_000;

fn engine() -> Engine<MemLedger> {
    let mut engine = Engine::new(MemLedger::new());
    engine.bootstrap().unwrap();
    engine
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, day, 12, 0, 0).unwrap()
}

fn register_parcel(engine: &mut Engine<MemLedger>, owner: &str) -> String {
    engine
        .create_real_estate(ADMIN_ACCOUNT_ID, owner, 80.0, 60.0)
        .unwrap()
        .real_estate_id
}

fn balance(engine: &Engine<MemLedger>, account_id: &str) -> Money {
    engine.account(account_id).unwrap().balance
}

#[test]
fn bootstrap_creates_admin_and_funded_owners() {
    let engine = engine();

    let accounts = engine.account_list(None, None).unwrap();
    assert_eq!(accounts.records.len(), 6);

    let admin = engine.account(ADMIN_ACCOUNT_ID).unwrap();
    assert!(admin.is_admin());
    assert_eq!(admin.balance, Money::ZERO);
    assert_eq!(balance(&engine, "owner-1"), Money::new(OWNER_BALANCE));
}

#[test]
fn bootstrap_twice_fails() {
    let mut engine = engine();
    let err = engine.bootstrap().unwrap_err();
    assert_eq!(err, EngineError::ExistingKey(ADMIN_ACCOUNT_ID.to_string()));
}

#[test]
fn only_admin_registers_real_estate() {
    let mut engine = engine();

    let err = engine
        .create_real_estate("owner-1", "owner-2", 80.0, 60.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .create_real_estate(ADMIN_ACCOUNT_ID, ADMIN_ACCOUNT_ID, 80.0, 60.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .create_real_estate(ADMIN_ACCOUNT_ID, "owner-1", 60.0, 80.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn full_sale_transfers_parcel_and_funds() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    let selling = engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    assert_eq!(selling.status, SellingStatus::SaleStart);
    assert!(engine.real_estate("owner-1", &parcel).unwrap().encumbered);

    let participation = engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap();
    assert_eq!(participation.selling.status, SellingStatus::Delivery);
    assert_eq!(participation.selling.buyer.as_deref(), Some("owner-2"));
    assert_eq!(
        balance(&engine, "owner-2"),
        Money::new(OWNER_BALANCE - 10_000)
    );
    // Escrowed: the seller has not been paid yet.
    assert_eq!(balance(&engine, "owner-1"), Money::new(OWNER_BALANCE));

    let closed = engine
        .close_selling(&parcel, "owner-1", Some("owner-2"), SellingStatus::Done)
        .unwrap();
    assert_eq!(closed.selling.status, SellingStatus::Done);
    assert_eq!(
        balance(&engine, "owner-1"),
        Money::new(OWNER_BALANCE + 10_000)
    );
    assert_eq!(
        balance(&engine, "owner-2"),
        Money::new(OWNER_BALANCE - 10_000)
    );

    // The old record is gone; exactly one parcel exists under the buyer,
    // re-keyed with a fresh id and released.
    let err = engine.real_estate("owner-1", &parcel).unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound(parcel.clone()));
    let transferred = engine
        .real_estate_list(Some("owner-2"), None, None)
        .unwrap();
    assert_eq!(transferred.records.len(), 1);
    let parcel_after = &transferred.records[0];
    assert_ne!(parcel_after.real_estate_id, parcel);
    assert!(!parcel_after.encumbered);
    assert_eq!(parcel_after.proprietor, "owner-2");
    assert_eq!(closed.real_estate, *parcel_after);

    // The buyer-side snapshot followed the offer into its terminal status.
    let snapshots = engine.selling_list_by_buyer("owner-2", None, None).unwrap();
    assert_eq!(snapshots.records.len(), 1);
    assert_eq!(snapshots.records[0].selling.status, SellingStatus::Done);
}

#[test]
fn cancel_after_acceptance_refunds_buyer() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap();

    let closed = engine
        .close_selling(&parcel, "owner-1", Some("owner-2"), SellingStatus::Cancelled)
        .unwrap();
    assert_eq!(closed.selling.status, SellingStatus::Cancelled);
    assert_eq!(balance(&engine, "owner-2"), Money::new(OWNER_BALANCE));
    assert_eq!(balance(&engine, "owner-1"), Money::new(OWNER_BALANCE));

    let parcel_after = engine.real_estate("owner-1", &parcel).unwrap();
    assert!(!parcel_after.encumbered);
    assert_eq!(parcel_after.real_estate_id, parcel);
}

#[test]
fn cancel_open_offer_releases_parcel_without_fund_movement() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    let closed = engine
        .close_selling(&parcel, "owner-1", None, SellingStatus::Cancelled)
        .unwrap();
    assert_eq!(closed.selling.status, SellingStatus::Cancelled);
    assert!(!engine.real_estate("owner-1", &parcel).unwrap().encumbered);
    assert_eq!(balance(&engine, "owner-1"), Money::new(OWNER_BALANCE));
}

#[test]
fn close_is_one_shot() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap();
    engine
        .close_selling(&parcel, "owner-1", Some("owner-2"), SellingStatus::Cancelled)
        .unwrap();

    for status in [
        SellingStatus::Done,
        SellingStatus::Cancelled,
        SellingStatus::Expired,
    ] {
        let err = engine
            .close_selling(&parcel, "owner-1", Some("owner-2"), status)
            .unwrap_err();
        assert!(matches!(err, EngineError::WrongStatus(_)), "{status:?}");
    }
}

#[test]
fn completed_sale_cannot_be_closed_again() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap();
    engine
        .close_selling(&parcel, "owner-1", Some("owner-2"), SellingStatus::Done)
        .unwrap();

    // The parcel moved with the buyer, so the old (seller, id) address no
    // longer resolves.
    let err = engine
        .close_selling(&parcel, "owner-1", Some("owner-2"), SellingStatus::Done)
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound(parcel.clone()));
}

#[test]
fn done_requires_delivery_stage() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    let err = engine
        .close_selling(&parcel, "owner-1", None, SellingStatus::Done)
        .unwrap_err();
    assert!(matches!(err, EngineError::WrongStatus(_)));
}

#[test]
fn closing_with_the_wrong_buyer_fails() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap();

    let err = engine
        .close_selling(&parcel, "owner-1", Some("owner-3"), SellingStatus::Done)
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[test]
fn encumbered_parcel_rejects_new_offers() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();

    let err = engine
        .create_selling(&parcel, "owner-1", Money::new(20_000), 30, at(2))
        .unwrap_err();
    assert_eq!(err, EngineError::Encumbered(parcel.clone()));

    let err = engine
        .create_donating(&parcel, "owner-1", "owner-3", at(2))
        .unwrap_err();
    assert_eq!(err, EngineError::Encumbered(parcel.clone()));
}

#[test]
fn accept_guards_buyer_preconditions() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");
    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();

    let err = engine
        .accept_selling(&parcel, "owner-1", "owner-1", at(2))
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .accept_selling(&parcel, "owner-1", ADMIN_ACCOUNT_ID, at(2))
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .accept_selling(&parcel, "owner-1", "nobody", at(2))
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("nobody".to_string()));

    // A second buyer cannot accept a delivery-stage offer.
    engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap();
    let err = engine
        .accept_selling(&parcel, "owner-1", "owner-3", at(3))
        .unwrap_err();
    assert!(matches!(err, EngineError::WrongStatus(_)));
}

#[test]
fn accept_requires_sufficient_balance() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");
    engine
        .create_selling(&parcel, "owner-1", Money::new(OWNER_BALANCE + 1), 30, at(1))
        .unwrap();

    let err = engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(balance(&engine, "owner-2"), Money::new(OWNER_BALANCE));
}

#[test]
fn create_selling_requires_ownership_and_valid_arguments() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    let err = engine
        .create_selling(&parcel, "owner-2", Money::new(10_000), 30, at(1))
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound(parcel.clone()));

    let err = engine
        .create_selling("", "owner-1", Money::new(10_000), 30, at(1))
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_selling(&parcel, "owner-1", Money::ZERO, 30, at(1))
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 0, at(1))
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn donation_transfers_parcel_without_funds() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    let participation = engine
        .create_donating(&parcel, "owner-1", "owner-3", at(1))
        .unwrap();
    assert_eq!(
        participation.donating.status,
        DonatingStatus::DonatingStart
    );
    assert!(engine.real_estate("owner-1", &parcel).unwrap().encumbered);

    let closed = engine
        .close_donating(&parcel, "owner-1", "owner-3", DonatingStatus::Done)
        .unwrap();
    assert_eq!(closed.donating.status, DonatingStatus::Done);

    let err = engine.real_estate("owner-1", &parcel).unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound(parcel.clone()));
    let transferred = engine
        .real_estate_list(Some("owner-3"), None, None)
        .unwrap();
    assert_eq!(transferred.records.len(), 1);
    assert_ne!(transferred.records[0].real_estate_id, parcel);
    assert!(!transferred.records[0].encumbered);

    // No funds moved.
    assert_eq!(balance(&engine, "owner-1"), Money::new(OWNER_BALANCE));
    assert_eq!(balance(&engine, "owner-3"), Money::new(OWNER_BALANCE));

    let snapshots = engine
        .donating_list_by_grantee("owner-3", None, None)
        .unwrap();
    assert_eq!(snapshots.records.len(), 1);
    assert_eq!(snapshots.records[0].donating.status, DonatingStatus::Done);
}

#[test]
fn donation_to_admin_fails() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    let err = engine
        .create_donating(&parcel, "owner-1", ADMIN_ACCOUNT_ID, at(1))
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[test]
fn donation_to_self_fails() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    let err = engine
        .create_donating(&parcel, "owner-1", "owner-1", at(1))
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[test]
fn donation_cancel_keeps_ownership() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_donating(&parcel, "owner-1", "owner-3", at(1))
        .unwrap();
    let closed = engine
        .close_donating(&parcel, "owner-1", "owner-3", DonatingStatus::Cancelled)
        .unwrap();
    assert_eq!(closed.donating.status, DonatingStatus::Cancelled);

    let parcel_after = engine.real_estate("owner-1", &parcel).unwrap();
    assert!(!parcel_after.encumbered);
    assert_eq!(parcel_after.real_estate_id, parcel);
}

#[test]
fn donation_close_is_one_shot() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_donating(&parcel, "owner-1", "owner-3", at(1))
        .unwrap();
    engine
        .close_donating(&parcel, "owner-1", "owner-3", DonatingStatus::Cancelled)
        .unwrap();
    let err = engine
        .close_donating(&parcel, "owner-1", "owner-3", DonatingStatus::Done)
        .unwrap_err();
    assert!(matches!(err, EngineError::WrongStatus(_)));
}

#[test]
fn sweep_expires_overdue_offers_and_refunds_escrow() {
    let mut engine = engine();
    let short = register_parcel(&mut engine, "owner-1");
    let long = register_parcel(&mut engine, "owner-4");

    engine
        .create_selling(&short, "owner-1", Money::new(10_000), 2, at(1))
        .unwrap();
    engine
        .accept_selling(&short, "owner-1", "owner-2", at(2))
        .unwrap();
    engine
        .create_selling(&long, "owner-4", Money::new(10_000), 30, at(1))
        .unwrap();

    // Nothing is due yet.
    assert!(engine.sweep_expired(at(2)).unwrap().is_empty());

    let closed = engine.sweep_expired(at(10)).unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].object_of_sale, short);
    assert_eq!(closed[0].status, SellingStatus::Expired);

    // The paid buyer got the escrow back and the parcel was released.
    assert_eq!(balance(&engine, "owner-2"), Money::new(OWNER_BALANCE));
    assert!(!engine.real_estate("owner-1", &short).unwrap().encumbered);

    // The longer offer is still open.
    let open = engine
        .selling_list_by_status(SellingStatus::SaleStart, None, None)
        .unwrap();
    assert_eq!(open.records.len(), 1);
    assert_eq!(open.records[0].object_of_sale, long);

    // A second sweep over the same state finds nothing new.
    assert!(engine.sweep_expired(at(10)).unwrap().is_empty());
}

#[test]
fn status_index_follows_every_transition() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    let open = engine
        .selling_list_by_status(SellingStatus::SaleStart, None, None)
        .unwrap();
    assert_eq!(open.records.len(), 1);

    engine
        .accept_selling(&parcel, "owner-1", "owner-2", at(2))
        .unwrap();
    assert!(
        engine
            .selling_list_by_status(SellingStatus::SaleStart, None, None)
            .unwrap()
            .records
            .is_empty()
    );
    assert_eq!(
        engine
            .selling_list_by_status(SellingStatus::Delivery, None, None)
            .unwrap()
            .records
            .len(),
        1
    );

    engine
        .close_selling(&parcel, "owner-1", Some("owner-2"), SellingStatus::Done)
        .unwrap();
    assert!(
        engine
            .selling_list_by_status(SellingStatus::Delivery, None, None)
            .unwrap()
            .records
            .is_empty()
    );
    assert_eq!(
        engine
            .selling_list_by_status(SellingStatus::Done, None, None)
            .unwrap()
            .records
            .len(),
        1
    );
}

#[test]
fn relisting_replaces_the_cancelled_offer_and_its_index_entry() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_selling(&parcel, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    engine
        .close_selling(&parcel, "owner-1", None, SellingStatus::Cancelled)
        .unwrap();

    // The parcel kept its id, so the new offer lands on the same key.
    let relisted = engine
        .create_selling(&parcel, "owner-1", Money::new(20_000), 30, at(5))
        .unwrap();
    assert_eq!(relisted.price, Money::new(20_000));

    let cancelled = engine
        .selling_list_by_status(SellingStatus::Cancelled, None, None)
        .unwrap();
    assert!(cancelled.records.is_empty());
    let open = engine
        .selling_list_by_status(SellingStatus::SaleStart, None, None)
        .unwrap();
    assert_eq!(open.records.len(), 1);
    assert_eq!(open.records[0].price, Money::new(20_000));
}

#[test]
fn repeated_donation_offer_replaces_its_index_entry() {
    let mut engine = engine();
    let parcel = register_parcel(&mut engine, "owner-1");

    engine
        .create_donating(&parcel, "owner-1", "owner-3", at(1))
        .unwrap();
    engine
        .close_donating(&parcel, "owner-1", "owner-3", DonatingStatus::Cancelled)
        .unwrap();
    engine
        .create_donating(&parcel, "owner-1", "owner-3", at(5))
        .unwrap();

    let cancelled = engine
        .donating_list_by_status(DonatingStatus::Cancelled, None, None)
        .unwrap();
    assert!(cancelled.records.is_empty());
    let open = engine
        .donating_list_by_status(DonatingStatus::DonatingStart, None, None)
        .unwrap();
    assert_eq!(open.records.len(), 1);
    assert_eq!(open.records[0].create_time, at(5));
}

#[test]
fn seller_and_buyer_filtered_queries() {
    let mut engine = engine();
    let first = register_parcel(&mut engine, "owner-1");
    let second = register_parcel(&mut engine, "owner-4");

    engine
        .create_selling(&first, "owner-1", Money::new(10_000), 30, at(1))
        .unwrap();
    engine
        .create_selling(&second, "owner-4", Money::new(20_000), 30, at(1))
        .unwrap();
    engine
        .accept_selling(&second, "owner-4", "owner-2", at(2))
        .unwrap();

    assert_eq!(
        engine
            .selling_list(Some("owner-1"), None, None)
            .unwrap()
            .records
            .len(),
        1
    );
    assert_eq!(engine.selling_list(None, None, None).unwrap().records.len(), 2);

    let by_buyer = engine.selling_list_by_buyer("owner-2", None, None).unwrap();
    assert_eq!(by_buyer.records.len(), 1);
    assert_eq!(by_buyer.records[0].selling.object_of_sale, second);
    assert!(
        engine
            .selling_list_by_buyer("owner-5", None, None)
            .unwrap()
            .records
            .is_empty()
    );
}
