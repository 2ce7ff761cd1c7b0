//! Validation for anonymous (no booking id yet) pricing requests.
//!
//! Collects every failing field, not just the first, so callers and logs can
//! report all problems at once. Booking-id based fetches skip this entirely:
//! the backend is authoritative once a booking exists.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{LocationType, QuotePayloadBase};

static BOOKING_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid booking date regex"));
static START_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid start time regex"));

/// Outcome of validating a [`QuotePayloadBase`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteValidation {
    pub valid: bool,
    /// Failing fields, in payload declaration order
    pub missing_keys: Vec<&'static str>,
}

/// Check that a payload has everything an anonymous pricing request needs.
pub fn validate_quote_payload(payload: &QuotePayloadBase) -> QuoteValidation {
    let mut missing_keys = Vec::new();

    if payload.instructor_id.trim().is_empty() {
        missing_keys.push("instructor_id");
    }
    if payload.instructor_service_id.trim().is_empty() {
        missing_keys.push("instructor_service_id");
    }
    if !BOOKING_DATE_RE.is_match(&payload.booking_date) {
        missing_keys.push("booking_date");
    }
    if !START_TIME_RE.is_match(&payload.start_time) {
        missing_keys.push("start_time");
    }
    if payload.selected_duration <= 0 {
        missing_keys.push("selected_duration");
    }
    if LocationType::from_str(payload.location_type.trim()).is_err() {
        missing_keys.push("location_type");
    }
    if payload.meeting_location.trim().is_empty() {
        missing_keys.push("meeting_location");
    }

    QuoteValidation {
        valid: missing_keys.is_empty(),
        missing_keys,
    }
}
