//! Pricing-preview controller
//!
//! The orchestrator that keeps a displayed price quote consistent with a
//! mutable booking draft while the user applies or removes credit.
//!
//! ```text
//! ┌────────────────────┐   request_pricing_preview / apply_credit
//! │     Checkout UI    │ ─────────────────────────────────────────┐
//! └─────────▲──────────┘                                          │
//!           │ watch<PreviewState>                                 │
//! ┌─────────┴──────────┐        ┌──────────────────┐     ┌────────▼────────┐
//! │ PreviewState       │ ◄───── │  Controller       │ ──► │ PricingFetcher  │
//! │ preview/loading/…  │        │  init + commit    │     │ (booking/quote) │
//! └────────────────────┘        │  abort tracks     │     └─────────────────┘
//!                               └────────┬─────────┘
//!                                        │ persist credit decision
//!                               ┌────────▼─────────┐
//!                               │  DecisionStore   │
//!                               └──────────────────┘
//! ```
//!
//! Concurrency model: requests run on two independent last-writer-wins
//! tracks (init and commit). Starting a request on a track aborts any prior
//! request on that track; a settled request whose epoch no longer matches
//! the track discards its result. Bookkeeping lives behind a `std::sync::Mutex`
//! that is never held across an await point.

use std::sync::{Arc, Mutex};

use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::decision_store::{decision_key, read_decision, write_decision, DecisionStore};
use crate::error::{CheckoutError, CheckoutResult, PreviewFetchError};
use crate::models::{
    PreviewCause, PreviewState, PricingPreview, QuotePayload, QuotePayloadBase,
    StoredCreditDecision,
};
use crate::pricing_client::PricingPreviewFetcher;
use crate::quote_validator::validate_quote_payload;

/// Callback that resolves the current quote payload from a draft in progress
pub type QuoteResolver = dyn Fn() -> Option<QuotePayloadBase> + Send + Sync;

/// Options for [`PricingPreviewController::request_pricing_preview`]
#[derive(Default)]
pub struct PreviewRequestOptions {
    /// Caller-supplied cache key, overriding derivation from the draft
    pub key: Option<String>,
    /// Why the refresh was requested; selects carry-forward and loading policy
    pub cause: Option<PreviewCause>,
}

/// Options for [`PricingPreviewController::apply_credit`]
#[derive(Default)]
pub struct ApplyCreditOptions {
    /// Return the cached preview when the normalized value already matches it
    pub skip_if_unchanged: bool,
    /// Do not toggle the loading indicator for this commit
    pub suppress_loading: bool,
}

/// Initial wiring for a controller instance
#[derive(Default)]
pub struct ControllerConfig {
    pub booking_id: Option<String>,
    pub quote_payload: Option<QuotePayloadBase>,
    pub quote_resolver: Option<Box<QuoteResolver>>,
}

/// One cancellation lineage: at most one live abort handle, plus an epoch so
/// a settled request can detect it has been superseded.
#[derive(Default)]
struct Track {
    abort: Option<AbortHandle>,
    epoch: u64,
}

impl Track {
    /// Abort any in-flight request and hand out the registration for the next.
    fn begin(&mut self) -> (AbortRegistration, u64) {
        if let Some(handle) = self.abort.take() {
            handle.abort();
        }
        self.epoch += 1;
        let (handle, registration) = AbortHandle::new_pair();
        self.abort = Some(handle);
        (registration, self.epoch)
    }

    /// Release the handle if `epoch` is still current; returns whether the
    /// finishing request is the track's current one.
    fn finish(&mut self, epoch: u64) -> bool {
        if self.epoch == epoch {
            self.abort = None;
            true
        } else {
            false
        }
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.abort.take() {
            handle.abort();
        }
        self.epoch += 1;
    }
}

struct Inner {
    booking_id: Option<String>,
    quote_payload: Option<QuotePayloadBase>,
    preview: Option<PricingPreview>,
    error: Option<String>,
    active_requests: u32,
    last_applied_credit_cents: i64,
    last_init_key: Option<String>,
    pending_commit_cents: Option<i64>,
    init_track: Track,
    commit_track: Track,
}

/// What a fetch resolved to
enum FetchOutcome {
    Fetched(PricingPreview),
    /// The draft is not priceable yet (no identity, or invalid quote payload).
    /// A soft no-op, not a failure.
    NotReady,
}

/// The checkout pricing-preview state machine.
///
/// Single-writer over its reactive fields; consumers read snapshots or
/// subscribe to the watch channel.
pub struct PricingPreviewController<F: PricingPreviewFetcher, S: DecisionStore> {
    fetcher: Arc<F>,
    store: Arc<S>,
    quote_resolver: Option<Box<QuoteResolver>>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<PreviewState>,
    /// Bumped whenever a commit settles, waking dedup waiters
    commit_settled: watch::Sender<u64>,
}

impl<F: PricingPreviewFetcher, S: DecisionStore> std::fmt::Debug
    for PricingPreviewController<F, S>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingPreviewController")
            .finish_non_exhaustive()
    }
}

impl<F: PricingPreviewFetcher, S: DecisionStore> PricingPreviewController<F, S> {
    pub fn new(fetcher: F, store: S, config: ControllerConfig) -> Self {
        let inner = Inner {
            booking_id: config.booking_id.clone(),
            quote_payload: config.quote_payload,
            preview: None,
            error: None,
            active_requests: 0,
            last_applied_credit_cents: 0,
            last_init_key: None,
            pending_commit_cents: None,
            init_track: Track::default(),
            commit_track: Track::default(),
        };
        let (state_tx, _) = watch::channel(PreviewState {
            booking_id: config.booking_id,
            ..PreviewState::default()
        });
        let (commit_settled, _) = watch::channel(0);

        Self {
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
            quote_resolver: config.quote_resolver,
            inner: Mutex::new(inner),
            state_tx,
            commit_settled,
        }
    }

    /// Current preview snapshot
    pub fn preview(&self) -> Option<PricingPreview> {
        self.lock().preview.clone()
    }

    /// True while any non-suppressed request is in flight
    pub fn loading(&self) -> bool {
        self.lock().active_requests > 0
    }

    /// Last user-facing fetch error, cleared by the next successful fetch
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Credit amount the backend last confirmed as applied
    pub fn last_applied_credit_cents(&self) -> i64 {
        self.lock().last_applied_credit_cents
    }

    pub fn booking_id(&self) -> Option<String> {
        self.lock().booking_id.clone()
    }

    /// Subscribe to state snapshots; the receiver sees every published change
    pub fn subscribe(&self) -> watch::Receiver<PreviewState> {
        self.state_tx.subscribe()
    }

    /// Assign or clear the booking id, reconciling the preview when the
    /// identity key moves (e.g. a draft became a persisted booking).
    pub async fn set_booking_id(&self, booking_id: Option<String>) {
        let changed = {
            let mut inner = self.lock();
            if inner.booking_id == booking_id {
                false
            } else {
                inner.booking_id = booking_id;
                self.publish(&inner);
                true
            }
        };
        if changed {
            self.request_pricing_preview(PreviewRequestOptions::default())
                .await;
        }
    }

    /// Replace the quote payload, reconciling the preview when the identity
    /// key moves. Callers that want carry-forward or loading suppression for
    /// a specific edit call [`Self::request_pricing_preview`] with a cause
    /// instead; this baseline path covers everything else.
    pub async fn set_quote_payload(&self, quote_payload: Option<QuotePayloadBase>) {
        let changed = {
            let mut inner = self.lock();
            if inner.quote_payload == quote_payload {
                false
            } else {
                inner.quote_payload = quote_payload;
                true
            }
        };
        if changed {
            self.request_pricing_preview(PreviewRequestOptions::default())
                .await;
        }
    }

    /// Read the persisted credit decision for the current identity key.
    ///
    /// Never substituted automatically; callers decide whether to seed the
    /// credit slider from it.
    pub fn stored_credit_decision(&self) -> Option<StoredCreditDecision> {
        let key = {
            let inner = self.lock();
            self.derive_key(&inner)?
        };
        read_decision(self.store.as_ref(), &key)
    }

    /// Drop the persisted credit decision for the current identity key
    pub fn clear_stored_decision(&self) {
        let key = {
            let inner = self.lock();
            self.derive_key(&inner)
        };
        if let Some(key) = key {
            self.store.remove(&key);
        }
    }

    /// Refresh the preview for the current draft.
    ///
    /// Never fails: a genuine fetch error lands in [`Self::error`] and the
    /// last good preview stays visible. Returns the preview that is current
    /// once this call settles.
    pub async fn request_pricing_preview(
        &self,
        options: PreviewRequestOptions,
    ) -> Option<PricingPreview> {
        let (registration, epoch, counted, credit_cents) = {
            let mut inner = self.lock();
            let key = options.key.or_else(|| self.derive_key(&inner));

            // Idempotent re-subscription: same identity, no cause, preview
            // already on hand.
            if options.cause.is_none() && key == inner.last_init_key && inner.preview.is_some() {
                return inner.preview.clone();
            }
            inner.last_init_key = key;

            // Carry-forward: date/time and duration edits don't invalidate
            // the user's credit choice; anything else re-decides it fresh.
            let credit_cents = match options.cause {
                Some(PreviewCause::DateTimeOnly) | Some(PreviewCause::DurationChange) => {
                    inner.last_applied_credit_cents
                }
                Some(PreviewCause::CreditChange) | None => 0,
            };

            let (registration, epoch) = inner.init_track.begin();

            // Time/date edits are low-latency; don't flicker the spinner.
            let counted = options.cause != Some(PreviewCause::DateTimeOnly);
            if counted {
                inner.active_requests += 1;
            }
            self.publish(&inner);
            (registration, epoch, counted, credit_cents)
        };

        let outcome = Abortable::new(self.perform_fetch(credit_cents), registration).await;

        let mut inner = self.lock();
        let current = inner.init_track.finish(epoch);
        if counted {
            inner.active_requests = inner.active_requests.saturating_sub(1);
        }

        match outcome {
            Err(Aborted) => {
                debug!(credit_cents, "Pricing preview request superseded");
            }
            Ok(Ok(FetchOutcome::Fetched(preview))) if current => {
                self.apply_preview(&mut inner, preview, false);
            }
            Ok(Ok(FetchOutcome::Fetched(_))) => {
                debug!(credit_cents, "Discarding stale pricing preview result");
            }
            Ok(Ok(FetchOutcome::NotReady)) => {}
            Ok(Err(fetch_error)) if current => {
                self.log_fetch_error(&fetch_error, inner.booking_id.as_deref(), credit_cents);
                inner.error = Some(fetch_error.user_message());
            }
            Ok(Err(_)) => {}
        }

        self.publish(&inner);
        inner.preview.clone()
    }

    /// Commit an explicit credit amount chosen by the user.
    ///
    /// Unlike [`Self::request_pricing_preview`] this rethrows genuine
    /// failures so the invoking action (a slider commit, typically) can react
    /// synchronously. Cancellation is still swallowed.
    pub async fn apply_credit(
        &self,
        credit_cents: f64,
        options: ApplyCreditOptions,
    ) -> CheckoutResult<Option<PricingPreview>> {
        let normalized = credit_cents.max(0.0).round() as i64;

        // The guard must not be in scope at any await point or the future
        // loses `Send`; `None` signals a dedup into the in-flight commit,
        // awaited after the lock scope ends.
        let begun = {
            let mut inner = self.lock();
            let reflected = inner
                .preview
                .as_ref()
                .map(|p| p.credit_applied_cents == normalized)
                .unwrap_or(false);

            if options.skip_if_unchanged && reflected {
                return Ok(inner.preview.clone());
            }
            if inner.pending_commit_cents == Some(normalized) {
                None
            } else {
                if reflected && inner.pending_commit_cents.is_none() {
                    return Ok(inner.preview.clone());
                }

                let (registration, epoch) = inner.commit_track.begin();
                inner.pending_commit_cents = Some(normalized);

                let counted = !options.suppress_loading;
                if counted {
                    inner.active_requests += 1;
                }
                self.publish(&inner);
                Some((registration, epoch, counted))
            }
        };

        let Some((registration, epoch, counted)) = begun else {
            return Ok(self.await_commit_settled(normalized).await);
        };

        let outcome = Abortable::new(self.perform_fetch(normalized), registration).await;

        let mut inner = self.lock();
        let current = inner.commit_track.finish(epoch);
        if counted {
            inner.active_requests = inner.active_requests.saturating_sub(1);
        }

        let result = match outcome {
            Err(Aborted) => {
                debug!(normalized, "Credit commit superseded");
                Ok(inner.preview.clone())
            }
            Ok(Ok(FetchOutcome::Fetched(preview))) => {
                if current {
                    inner.pending_commit_cents = None;
                    self.apply_preview(&mut inner, preview, normalized == 0);
                }
                Ok(inner.preview.clone())
            }
            Ok(Ok(FetchOutcome::NotReady)) => {
                if current {
                    inner.pending_commit_cents = None;
                }
                Ok(inner.preview.clone())
            }
            Ok(Err(fetch_error)) => {
                if current {
                    // Unblock retries; a stale failure belongs to a
                    // superseded commit and is ignored.
                    inner.pending_commit_cents = None;
                    self.log_fetch_error(&fetch_error, inner.booking_id.as_deref(), normalized);
                    Err(CheckoutError::PreviewFetch(fetch_error.user_message()))
                } else {
                    Ok(inner.preview.clone())
                }
            }
        };

        self.publish(&inner);
        self.commit_settled.send_modify(|n| *n += 1);
        result
    }

    /// Abort everything in flight and clear all state. Used when the checkout
    /// flow restarts for a new booking draft entirely.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.init_track.cancel();
        inner.commit_track.cancel();
        inner.active_requests = 0;
        inner.preview = None;
        inner.error = None;
        inner.last_applied_credit_cents = 0;
        inner.last_init_key = None;
        inner.pending_commit_cents = None;
        self.publish(&inner);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, inner: &Inner) {
        let _ = self.state_tx.send_replace(PreviewState {
            preview: inner.preview.clone(),
            loading: inner.active_requests > 0,
            error: inner.error.clone(),
            last_applied_credit_cents: inner.last_applied_credit_cents,
            booking_id: inner.booking_id.clone(),
        });
    }

    fn resolve_quote_base(&self, inner: &Inner) -> Option<QuotePayloadBase> {
        inner
            .quote_payload
            .clone()
            .or_else(|| self.quote_resolver.as_ref().and_then(|resolve| resolve()))
    }

    fn derive_key(&self, inner: &Inner) -> Option<String> {
        let quote_base = self.resolve_quote_base(inner);
        decision_key(inner.booking_id.as_deref(), quote_base.as_ref())
    }

    /// Collapse a duplicate commit into the in-flight one: wait until the
    /// commit for this value settles, then resolve with the current preview.
    async fn await_commit_settled(&self, normalized: i64) -> Option<PricingPreview> {
        let mut settled = self.commit_settled.subscribe();
        loop {
            {
                let inner = self.lock();
                if inner.pending_commit_cents != Some(normalized) {
                    return inner.preview.clone();
                }
            }
            if settled.changed().await.is_err() {
                return self.lock().preview.clone();
            }
        }
    }

    async fn perform_fetch(&self, credit_cents: i64) -> Result<FetchOutcome, PreviewFetchError> {
        let (booking_id, quote_base) = {
            let inner = self.lock();
            (inner.booking_id.clone(), self.resolve_quote_base(&inner))
        };

        if let Some(booking_id) = booking_id {
            let preview = self
                .fetcher
                .fetch_booking_preview(&booking_id, credit_cents)
                .await?;
            return Ok(FetchOutcome::Fetched(preview));
        }

        let Some(base) = quote_base else {
            // Mid-draft: not enough information to price anything yet.
            return Ok(FetchOutcome::NotReady);
        };

        let validation = validate_quote_payload(&base);
        if !validation.valid {
            debug!(
                missing_keys = ?validation.missing_keys,
                "Quote payload not priceable yet"
            );
            return Ok(FetchOutcome::NotReady);
        }

        let payload = QuotePayload {
            base,
            applied_credit_cents: credit_cents,
        };
        let preview = self.fetcher.fetch_quote_preview(&payload).await?;
        Ok(FetchOutcome::Fetched(preview))
    }

    /// Shared apply-result path: clamp the backend's applied credit, replace
    /// the preview, clear any error, and persist the decision.
    fn apply_preview(&self, inner: &mut Inner, mut preview: PricingPreview, explicitly_removed: bool) {
        preview.credit_applied_cents = preview.credit_applied_cents.max(0);
        inner.error = None;
        inner.last_applied_credit_cents = preview.credit_applied_cents;

        if let Some(key) = self.derive_key(inner) {
            persist_credit_decision(
                self.store.as_ref(),
                &key,
                preview.credit_applied_cents,
                explicitly_removed,
            );
        }

        inner.preview = Some(preview);
    }

    fn log_fetch_error(
        &self,
        fetch_error: &PreviewFetchError,
        booking_id: Option<&str>,
        credit_cents: i64,
    ) {
        match fetch_error {
            PreviewFetchError::ApiProblem {
                detail,
                status: Some(status),
            } => {
                warn!(status, detail, ?booking_id, credit_cents, "Pricing preview rejected");
            }
            PreviewFetchError::ApiProblem { detail, status: None } => {
                error!(detail, ?booking_id, credit_cents, "Pricing preview rejected with unexpected shape");
            }
            PreviewFetchError::Transport(message) => {
                error!(message, ?booking_id, credit_cents, "Pricing preview fetch failed");
            }
        }
    }
}

/// Persist a credit decision, preserving a meaningful prior choice.
///
/// A freshly-computed zero must not clobber a stored nonzero decision the
/// user never removed: a preview that hasn't caught up yet can still report
/// zero before the backend applies credit. The write is skipped when the
/// sanitized amount is zero, the removal wasn't explicit, and there is either
/// no stored entry or a stored nonzero not-explicitly-removed one.
fn persist_credit_decision<S: DecisionStore + ?Sized>(
    store: &S,
    key: &str,
    credit_cents: i64,
    explicitly_removed: bool,
) {
    let sanitized = credit_cents.max(0);

    if sanitized == 0 && !explicitly_removed {
        match read_decision(store, key) {
            None => return,
            Some(existing) if existing.last_credit_cents > 0 && !existing.explicitly_removed => {
                return;
            }
            Some(_) => {}
        }
    }

    write_decision(
        store,
        key,
        &StoredCreditDecision {
            last_credit_cents: sanitized,
            explicitly_removed,
        },
    );
}
