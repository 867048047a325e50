use chrono::NaiveDate;

use crate::limits::MAX_STAY_NIGHTS;
use crate::model::{Money, Quote};

use super::EngineError;

/// Price a stay from `start` (check-in) to `end` (checkout).
///
/// Nights are counted on calendar dates, so a stay never gains or loses a
/// night to timezone offsets or DST.
pub fn quote(nightly_rate: Money, start: NaiveDate, end: NaiveDate) -> Result<Quote, EngineError> {
    let nights = (end - start).num_days();
    if nights < 1 {
        return Err(EngineError::InvalidInterval { start, end });
    }
    if nights > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    let total_price = nightly_rate
        .checked_mul(nights as Money)
        .ok_or(EngineError::LimitExceeded("total price overflows"))?;
    Ok(Quote { nights, total_price })
}
