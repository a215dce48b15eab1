//! By-name invocation surface.
//!
//! The gateway submitting transactions calls [`invoke`] with a function
//! name and an ordered list of string arguments, the way the hosting
//! ledger platform delivers them. Numeric arguments arrive as
//! decimal-formatted strings; malformed input is a validation failure,
//! never a crash. An empty string marks an omitted optional argument
//! (list filters, page size, bookmark).
//!
//! `now` is the transaction timestamp assigned by the platform, so every
//! validating node executes with the same instant.
//!
//! On success the affected record(s) are returned as a JSON payload; on
//! failure the [`EngineError`] carries a descriptive message and nothing
//! was written.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::donating::DonatingStatus;
use crate::selling::SellingStatus;
use crate::{Engine, EngineError, Ledger, Money, ResultEngine};

/// Dispatches one invocation to the matching [`Engine`] operation.
pub fn invoke<L: Ledger>(
    engine: &mut Engine<L>,
    function: &str,
    args: &[String],
    now: DateTime<Utc>,
) -> ResultEngine<Vec<u8>> {
    match function {
        "queryAccount" => {
            let [account_id] = fixed(args)?;
            payload(&engine.account(account_id)?)
        }
        "queryAccountList" => {
            let [page_size, bookmark] = fixed(args)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.account_list(page_size, bookmark)?)
        }
        "createRealEstate" => {
            let [operator, proprietor, total_area, living_space] = fixed(args)?;
            payload(&engine.create_real_estate(
                operator,
                proprietor,
                area(total_area)?,
                area(living_space)?,
            )?)
        }
        "queryRealEstate" => {
            let [proprietor, real_estate_id] = fixed(args)?;
            payload(&engine.real_estate(proprietor, real_estate_id)?)
        }
        "queryRealEstateList" => {
            let [proprietor, page_size, bookmark] = fixed(args)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.real_estate_list(opt(proprietor), page_size, bookmark)?)
        }
        "createSelling" => {
            let [object_of_sale, seller, price, sale_period] = fixed(args)?;
            let price: Money = price.parse()?;
            payload(&engine.create_selling(object_of_sale, seller, price, days(sale_period)?, now)?)
        }
        "acceptSelling" => {
            let [object_of_sale, seller, buyer] = fixed(args)?;
            payload(&engine.accept_selling(object_of_sale, seller, buyer, now)?)
        }
        "closeSelling" => {
            let [object_of_sale, seller, buyer, status] = fixed(args)?;
            let status = SellingStatus::try_from(status)?;
            payload(&engine.close_selling(object_of_sale, seller, opt(buyer), status)?)
        }
        "querySellingList" => {
            let [seller, page_size, bookmark] = fixed(args)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.selling_list(opt(seller), page_size, bookmark)?)
        }
        "querySellingListByBuyer" => {
            let [buyer, page_size, bookmark] = fixed(args)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.selling_list_by_buyer(buyer, page_size, bookmark)?)
        }
        "querySellingListByStatus" => {
            let [status, page_size, bookmark] = fixed(args)?;
            let status = SellingStatus::try_from(status)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.selling_list_by_status(status, page_size, bookmark)?)
        }
        "createDonating" => {
            let [object_of_donating, donor, grantee] = fixed(args)?;
            payload(&engine.create_donating(object_of_donating, donor, grantee, now)?)
        }
        "closeDonating" => {
            let [object_of_donating, donor, grantee, status] = fixed(args)?;
            let status = DonatingStatus::try_from(status)?;
            payload(&engine.close_donating(object_of_donating, donor, grantee, status)?)
        }
        "queryDonatingList" => {
            let [donor, page_size, bookmark] = fixed(args)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.donating_list(opt(donor), page_size, bookmark)?)
        }
        "queryDonatingListByGrantee" => {
            let [grantee, page_size, bookmark] = fixed(args)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.donating_list_by_grantee(grantee, page_size, bookmark)?)
        }
        "queryDonatingListByStatus" => {
            let [status, page_size, bookmark] = fixed(args)?;
            let status = DonatingStatus::try_from(status)?;
            let (page_size, bookmark) = page_args(page_size, bookmark)?;
            payload(&engine.donating_list_by_status(status, page_size, bookmark)?)
        }
        "sweepExpired" => {
            let [] = fixed(args)?;
            payload(&engine.sweep_expired(now)?)
        }
        other => Err(EngineError::Validation(format!(
            "unknown function: {other}"
        ))),
    }
}

fn fixed<const N: usize>(args: &[String]) -> ResultEngine<[&str; N]> {
    if args.len() != N {
        return Err(EngineError::Validation(format!(
            "expected {N} arguments, got {}",
            args.len()
        )));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

fn opt(arg: &str) -> Option<&str> {
    let trimmed = arg.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn page_args<'a>(
    page_size: &str,
    bookmark: &'a str,
) -> ResultEngine<(Option<u32>, Option<&'a str>)> {
    let page_size = match opt(page_size) {
        None => None,
        Some(value) => Some(value.parse::<u32>().map_err(|_| {
            EngineError::Validation(format!("invalid page size: {value}"))
        })?),
    };
    Ok((page_size, opt(bookmark)))
}

fn area(value: &str) -> ResultEngine<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| EngineError::Validation(format!("invalid area: {value}")))
}

fn days(value: &str) -> ResultEngine<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| EngineError::Validation(format!("invalid sale period: {value}")))
}

fn payload<T: Serialize>(value: &T) -> ResultEngine<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}
