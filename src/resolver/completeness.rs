//! Acceptance gate for extracted records

use crate::record::{PartialRecord, ResolvedRecord};

/// Name reported by a detail page that has no recognizable title
pub const UNKNOWN_NAME: &str = "Unknown";

/// Placeholder some catalogs show in the price row
pub const PRICE_UNAVAILABLE: &str = "Price not available";

/// Whether a record is good enough to stop the strategy chain
///
/// It needs a real name plus either an announce date or an actual price.
pub fn is_complete(record: &PartialRecord) -> bool {
    has_required_fields(&record.device_name, &record.announced_date, &record.price)
}

impl ResolvedRecord {
    /// Same gate as [`is_complete`], applied after gap filling
    pub fn is_complete(&self) -> bool {
        has_required_fields(&self.device_name, &self.announced_date, &self.price)
    }
}

fn has_required_fields(name: &str, announced_date: &str, price: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || name == UNKNOWN_NAME {
        return false;
    }

    !announced_date.trim().is_empty() || has_price(price)
}

pub(crate) fn has_price(price: &str) -> bool {
    let price = price.trim();
    !price.is_empty() && price != PRICE_UNAVAILABLE
}
