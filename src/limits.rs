/// Reservations kept per room, across all statuses.
pub const MAX_RESERVATIONS_PER_ROOM: usize = 100_000;

/// Longest bookable stay. Guards the price multiplication and the
/// booked-dates expansion rather than a business rule.
pub const MAX_STAY_NIGHTS: i64 = 3_650;

/// Dates outside this range are rejected as malformed.
pub const MIN_VALID_YEAR: i32 = 2000;
pub const MAX_VALID_YEAR: i32 = 2200;

/// Stay dates accepted in request bodies and query strings.
pub const MAX_DATE_INPUT_LEN: usize = 64;
