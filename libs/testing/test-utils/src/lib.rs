//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the checkout domain:
//! - `TestDataBuilder`: Deterministic test data generation
//! - Checkout builders: quote payloads and pricing previews with
//!   backend-consistent totals
//!
//! # Usage
//!
//! ```rust
//! use test_utils::TestDataBuilder;
//!
//! let builder = TestDataBuilder::from_test_name("my_test");
//! let booking_id = builder.booking_id();
//! let payload = builder.quote_payload_base();
//! ```

use domain_checkout::models::{LineItem, PricingPreview, QuotePayloadBase};
use uuid::Uuid;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a deterministic UUID from the seed
    pub fn uuid(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Generate a unique booking ID for testing
    pub fn booking_id(&self) -> String {
        format!("booking-{}", self.uuid())
    }

    /// Generate a unique name for testing
    ///
    /// # Arguments
    ///
    /// * `prefix` - The type of resource (e.g., "instructor", "service")
    /// * `suffix` - A unique identifier within the test (e.g., "main", "alt")
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// A complete, valid quote payload base for anonymous pricing requests
    pub fn quote_payload_base(&self) -> QuotePayloadBase {
        QuotePayloadBase {
            instructor_id: self.name("instructor", "main"),
            instructor_service_id: self.name("service", "main"),
            booking_date: "2026-09-14".to_string(),
            start_time: "10:30".to_string(),
            selected_duration: 60,
            location_type: "online".to_string(),
            meeting_location: "Zoom".to_string(),
        }
    }

    /// A pricing preview whose `student_pay_cents` is consistent with the
    /// backend formula `base + student_fee - credit_applied`.
    pub fn preview_with_credit(&self, credit_applied_cents: i64) -> PricingPreview {
        let base_price_cents = 10_000;
        let student_fee_cents = 1_500;
        PricingPreview {
            base_price_cents,
            student_fee_cents,
            instructor_commission_cents: 2_000,
            credit_applied_cents,
            student_pay_cents: base_price_cents + student_fee_cents - credit_applied_cents,
            application_fee_cents: 500,
            top_up_transfer_cents: 0,
            instructor_tier_pct: Some(80.0),
            line_items: vec![
                LineItem {
                    label: "Lesson".to_string(),
                    amount_cents: base_price_cents,
                },
                LineItem {
                    label: "Student fee".to_string(),
                    amount_cents: student_fee_cents,
                },
            ],
        }
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.booking_id(), builder2.booking_id());
        assert_eq!(
            builder1.name("instructor", "test"),
            builder2.name("instructor", "test")
        );
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.booking_id(), builder2.booking_id());
    }

    #[test]
    fn test_preview_totals_consistent() {
        let builder = TestDataBuilder::from_test_name("totals");
        let preview = builder.preview_with_credit(4_500);

        assert_eq!(
            preview.student_pay_cents,
            preview.base_price_cents + preview.student_fee_cents - preview.credit_applied_cents
        );
    }
}
