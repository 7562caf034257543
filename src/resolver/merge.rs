//! Gap filling from supplementary records

use super::completeness::has_price;
use crate::record::{PartialRecord, ResolvedRecord};

/// Fills empty fields of an accepted record from a supplementary one
///
/// Only `announced_date` and `price` are filled, each tagged with the
/// supplement's source. A populated field is never overwritten.
///
/// # Returns
///
/// `true` if any field was filled.
pub fn fill_gaps(record: &mut ResolvedRecord, supplement: &PartialRecord) -> bool {
    let mut filled = false;

    let date = supplement.announced_date.trim();
    if record.announced_date.trim().is_empty() && !date.is_empty() {
        record.announced_date = date.to_string();
        record.announced_date_source = supplement.source.clone();
        filled = true;
    }

    if !has_price(&record.price) && has_price(&supplement.price) {
        record.price = supplement.price.trim().to_string();
        record.price_source = supplement.source.clone();
        filled = true;
    }

    filled
}
