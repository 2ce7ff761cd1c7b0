//! Checkout Domain
//!
//! Pricing-preview reconciliation for the booking checkout flow: keeps the
//! displayed price quote consistent with a mutable booking draft while the
//! user applies or removes stored credit, against a backend that must be
//! re-asked whenever relevant inputs change.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  Controller  │  ← request orchestration, cancellation tracks, credit policy
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │   Fetcher    │  ← pricing backend access (trait + reqwest implementation)
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │    Models    │  ← previews, quote payloads, stored decisions
//! └──────────────┘
//! ```
//!
//! The controller never recomputes prices locally; it relays what the
//! backend returns and owns only the bookkeeping around asking it.

pub mod controller;
pub mod decision_store;
pub mod error;
pub mod models;
pub mod pricing_client;
pub mod provider;
pub mod quote_validator;
pub mod stable_json;

// Re-export commonly used types
pub use controller::{
    ApplyCreditOptions, ControllerConfig, PreviewRequestOptions, PricingPreviewController,
    QuoteResolver,
};
pub use decision_store::{
    decision_key, read_decision, remove_decision, write_decision, DecisionStore,
    InMemoryDecisionStore,
};
pub use error::{CheckoutError, CheckoutResult, PreviewFetchError, PREVIEW_FETCH_FALLBACK};
pub use models::{
    LineItem, LocationType, PreviewCause, PreviewState, PricingPreview, QuotePayload,
    QuotePayloadBase, StoredCreditDecision,
};
pub use pricing_client::{HttpPricingClient, PricingPreviewFetcher};
pub use provider::CheckoutSession;
pub use quote_validator::{validate_quote_payload, QuoteValidation};
pub use stable_json::{stable_serialize, stable_string};
