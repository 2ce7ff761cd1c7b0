use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Backend-computed price breakdown for a booking or anonymous quote.
///
/// Replaced wholesale on every successful fetch, never mutated in place.
/// `student_pay_cents` reflects the backend formula
/// (`base + student_fee - credit_applied`); the controller only relays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPreview {
    pub base_price_cents: i64,
    pub student_fee_cents: i64,
    pub instructor_commission_cents: i64,
    /// Credit the backend actually accepted. Authoritative: the UI must treat
    /// this, not its requested value, as ground truth.
    pub credit_applied_cents: i64,
    pub student_pay_cents: i64,
    pub application_fee_cents: i64,
    pub top_up_transfer_cents: i64,
    pub instructor_tier_pct: Option<f64>,
    /// Display-only breakdown rows, order-preserving.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// A single display row of the price breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub label: String,
    pub amount_cents: i64,
}

/// Where the lesson takes place
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LocationType {
    StudentLocation,
    InstructorLocation,
    Online,
    NeutralLocation,
}

/// Identity of "what is being priced" when no persisted booking exists yet.
///
/// `location_type` stays a free-form string here; `quote_validator` checks
/// membership against [`LocationType`] before the payload may reach the
/// anonymous quote endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayloadBase {
    pub instructor_id: String,
    pub instructor_service_id: String,
    /// `YYYY-MM-DD`
    pub booking_date: String,
    /// `HH:MM`, 24-hour
    pub start_time: String,
    /// Minutes, strictly positive
    pub selected_duration: i64,
    pub location_type: String,
    pub meeting_location: String,
}

/// Full anonymous pricing request: the quote identity plus the credit to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    #[serde(flatten)]
    pub base: QuotePayloadBase,
    pub applied_credit_cents: i64,
}

/// The user's last credit choice, persisted under a derived cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCreditDecision {
    pub last_credit_cents: i64,
    /// True iff the user deliberately reduced credit to zero. Distinguishes
    /// "never had credit" and "backend reset it" from "user chose zero".
    pub explicitly_removed: bool,
}

/// Why a preview refresh was requested.
///
/// Selects carry-forward and loading-suppression policy only; the cause of a
/// refresh never changes what the backend computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum PreviewCause {
    DateTimeOnly,
    DurationChange,
    CreditChange,
}

/// Snapshot of the controller's reactive fields, published on every change
#[derive(Debug, Clone, Default)]
pub struct PreviewState {
    pub preview: Option<PricingPreview>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_applied_credit_cents: i64,
    pub booking_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_preview_wire_names_are_camel_case() {
        let json = serde_json::json!({
            "basePriceCents": 10_000,
            "studentFeeCents": 1_500,
            "instructorCommissionCents": 2_000,
            "creditAppliedCents": 4_500,
            "studentPayCents": 7_000,
            "applicationFeeCents": 500,
            "topUpTransferCents": 0,
            "instructorTierPct": null,
            "lineItems": [{"label": "Lesson", "amountCents": 10_000}]
        });

        let preview: PricingPreview = serde_json::from_value(json).unwrap();
        assert_eq!(preview.credit_applied_cents, 4_500);
        assert_eq!(preview.line_items[0].label, "Lesson");
    }

    #[test]
    fn test_preview_line_items_default_to_empty() {
        let json = serde_json::json!({
            "basePriceCents": 1,
            "studentFeeCents": 0,
            "instructorCommissionCents": 0,
            "creditAppliedCents": 0,
            "studentPayCents": 1,
            "applicationFeeCents": 0,
            "topUpTransferCents": 0,
            "instructorTierPct": null
        });

        let preview: PricingPreview = serde_json::from_value(json).unwrap();
        assert!(preview.line_items.is_empty());
    }

    #[test]
    fn test_quote_payload_flattens_base() {
        let payload = QuotePayload {
            base: QuotePayloadBase {
                instructor_id: "i-1".to_string(),
                instructor_service_id: "s-1".to_string(),
                booking_date: "2026-09-14".to_string(),
                start_time: "10:30".to_string(),
                selected_duration: 60,
                location_type: "online".to_string(),
                meeting_location: "Zoom".to_string(),
            },
            applied_credit_cents: 4_500,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["instructorId"], "i-1");
        assert_eq!(value["appliedCreditCents"], 4_500);
        assert!(value.get("base").is_none());
    }

    #[test]
    fn test_location_type_parses_case_insensitively() {
        assert_eq!(
            LocationType::from_str("Student_Location").unwrap(),
            LocationType::StudentLocation
        );
        assert_eq!(
            LocationType::from_str("ONLINE").unwrap(),
            LocationType::Online
        );
        assert!(LocationType::from_str("somewhere").is_err());
    }

    #[test]
    fn test_preview_cause_display_is_kebab_case() {
        assert_eq!(PreviewCause::DateTimeOnly.to_string(), "date-time-only");
        assert_eq!(PreviewCause::DurationChange.to_string(), "duration-change");
        assert_eq!(PreviewCause::CreditChange.to_string(), "credit-change");
    }
}
