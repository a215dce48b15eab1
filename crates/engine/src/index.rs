//! Structured-key layer over the flat ledger namespace.
//!
//! Every entity is addressed by a composite key: the entity namespace
//! followed by its partition attributes, each segment terminated by a
//! delimiter that cannot occur inside an attribute. A key built from a
//! strict prefix of the attribute tuple is therefore a valid scan prefix
//! that can never match an unrelated longer attribute.
//!
//! Writers must build every key through this module; prefix scans are only
//! complete as long as no key bypasses it.

use chrono::{DateTime, Utc};

use crate::{EngineError, ResultEngine};

/// Segment terminator. U+0000 sorts below every attribute byte, so prefix
/// order equals attribute-tuple order.
const DELIMITER: char = '\u{0}';

pub(crate) const ACCOUNT: &str = "account";
pub(crate) const ESTATE: &str = "estate";
pub(crate) const SALE: &str = "sale";
pub(crate) const SALE_BY_BUYER: &str = "saleByBuyer";
pub(crate) const SALE_STATUS: &str = "saleStatus";
pub(crate) const DONATION: &str = "donation";
pub(crate) const DONATION_BY_GRANTEE: &str = "donationByGrantee";
pub(crate) const DONATION_STATUS: &str = "donationStatus";

/// Builds a composite key (or, with fewer attributes than the entity's
/// full tuple, a scan prefix).
pub(crate) fn key(namespace: &str, attrs: &[&str]) -> ResultEngine<String> {
    let mut out = String::with_capacity(namespace.len() + 1);
    push_segment(&mut out, namespace, "namespace")?;
    for attr in attrs {
        push_segment(&mut out, attr, "key attribute")?;
    }
    Ok(out)
}

fn push_segment(out: &mut String, segment: &str, label: &str) -> ResultEngine<()> {
    if segment.is_empty() {
        return Err(EngineError::Validation(format!("empty {label}")));
    }
    if segment.contains(DELIMITER) {
        return Err(EngineError::Validation(format!(
            "{label} contains the key delimiter"
        )));
    }
    out.push_str(segment);
    out.push(DELIMITER);
    Ok(())
}

/// Splits a composite key back into its namespace and attributes.
pub(crate) fn split(key: &str) -> ResultEngine<(&str, Vec<&str>)> {
    let mut segments = key.split(DELIMITER);
    let namespace = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::Validation("malformed composite key".to_string()))?;
    let attrs: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    Ok((namespace, attrs))
}

/// Timestamp as a fixed-width key segment, so key order is chronological.
pub(crate) fn time_segment(at: DateTime<Utc>) -> String {
    let nanos = at.timestamp_nanos_opt().unwrap_or_default().max(0);
    format!("{nanos:020}")
}
