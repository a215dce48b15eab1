//! The `RealEstate` parcel entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// A registered parcel.
///
/// The storage key always reflects the current owner, so the record is
/// re-keyed (and the id regenerated) on every completed transfer. While
/// `encumbered` is set the parcel is committed to an in-progress offer and
/// no new offer may reference it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealEstate {
    pub real_estate_id: String,
    /// Owning account id.
    pub proprietor: String,
    pub encumbered: bool,
    pub total_area: f64,
    pub living_space: f64,
}

impl RealEstate {
    /// Registers a new parcel with a fresh id.
    pub fn new(proprietor: &str, total_area: f64, living_space: f64) -> ResultEngine<Self> {
        if !(total_area > 0.0) || !(living_space > 0.0) {
            return Err(EngineError::Validation(
                "areas must be greater than zero".to_string(),
            ));
        }
        if living_space > total_area {
            return Err(EngineError::Validation(
                "living space exceeds total area".to_string(),
            ));
        }
        Ok(Self {
            real_estate_id: Uuid::new_v4().to_string(),
            proprietor: proprietor.to_string(),
            encumbered: false,
            total_area,
            living_space,
        })
    }

    /// The parcel as it exists after a completed transfer: new owner,
    /// fresh id, encumbrance cleared.
    #[must_use]
    pub fn reissued_to(&self, proprietor: &str) -> Self {
        Self {
            real_estate_id: Uuid::new_v4().to_string(),
            proprietor: proprietor.to_string(),
            encumbered: false,
            total_area: self.total_area,
            living_space: self.living_space,
        }
    }
}
