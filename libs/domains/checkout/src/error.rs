use thiserror::Error;

/// Result type for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Fixed user-facing message for failures without a structured detail
pub const PREVIEW_FETCH_FALLBACK: &str = "Unable to load pricing preview. Please try again.";

/// Errors that can occur in the checkout domain
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// A pricing fetch genuinely failed; the message is already user-facing
    #[error("{0}")]
    PreviewFetch(String),

    /// The pricing-preview accessor was used outside a checkout session.
    /// This is a wiring bug in the caller, not a runtime condition.
    #[error("Pricing preview accessor used outside a checkout session")]
    MissingProvider,
}

/// Errors surfaced by a [`crate::pricing_client::PricingPreviewFetcher`]
#[derive(Debug, Clone, Error)]
pub enum PreviewFetchError {
    /// Structured rejection from the pricing backend (validation failures,
    /// business-rule rejections such as a credit limit)
    #[error("Pricing API rejected the request: {detail}")]
    ApiProblem { detail: String, status: Option<u16> },

    /// Network-level or otherwise unstructured failure
    #[error("Pricing request failed: {0}")]
    Transport(String),
}

impl PreviewFetchError {
    /// The message shown to the user: the backend's `detail` when the error
    /// carries one, the fixed fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            PreviewFetchError::ApiProblem { detail, .. } => detail.clone(),
            PreviewFetchError::Transport(_) => PREVIEW_FETCH_FALLBACK.to_string(),
        }
    }
}
