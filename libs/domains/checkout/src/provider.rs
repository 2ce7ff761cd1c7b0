//! Session-scoped wiring for the pricing-preview controller.
//!
//! One controller instance exists per checkout session; everything below it
//! receives the shared handle through the session. The accessor comes in an
//! optional form (components that render with or without an active checkout)
//! and a requiring form that flags use outside a session as a wiring bug.

use std::sync::Arc;

use crate::controller::{ControllerConfig, PricingPreviewController};
use crate::decision_store::DecisionStore;
use crate::error::{CheckoutError, CheckoutResult};
use crate::pricing_client::PricingPreviewFetcher;

/// Owns the pricing-preview controller for one checkout session
pub struct CheckoutSession<F: PricingPreviewFetcher, S: DecisionStore> {
    pricing_preview: Arc<PricingPreviewController<F, S>>,
}

impl<F: PricingPreviewFetcher, S: DecisionStore> CheckoutSession<F, S> {
    pub fn new(fetcher: F, store: S, config: ControllerConfig) -> Self {
        Self {
            pricing_preview: Arc::new(PricingPreviewController::new(fetcher, store, config)),
        }
    }

    /// The session's controller handle
    pub fn pricing_preview(&self) -> Arc<PricingPreviewController<F, S>> {
        Arc::clone(&self.pricing_preview)
    }

    /// Optional accessor: `None` when no session is active
    pub fn try_pricing_preview(
        session: Option<&Self>,
    ) -> Option<Arc<PricingPreviewController<F, S>>> {
        session.map(Self::pricing_preview)
    }

    /// Requiring accessor: using this outside a session is a programmer error
    pub fn require_pricing_preview(
        session: Option<&Self>,
    ) -> CheckoutResult<Arc<PricingPreviewController<F, S>>> {
        Self::try_pricing_preview(session).ok_or(CheckoutError::MissingProvider)
    }
}
