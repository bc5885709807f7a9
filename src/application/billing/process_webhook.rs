//! ProcessWebhookHandler - the inbound webhook pipeline.
//!
//! Verify signature → parse envelope → dispatch to the reconciler → record
//! the audit row. The audit row is written unconditionally once the event
//! parses, including unknown types and handler failures.

use thiserror::Error;

use crate::domain::billing::{
    BillingEvent, EventDispatcher, EventRecorder, HandlerOutcome, WebhookError, WebhookVerifier,
};

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Exact request body bytes, unmodified - the signature covers them.
    pub payload: Vec<u8>,
    /// Value of the provider signature header.
    pub signature: String,
}

/// Errors surfaced to the webhook endpoint. All of them answer 400; an
/// accepted event (applied or skipped) answers 200.
#[derive(Debug, Error)]
pub enum ProcessWebhookError {
    /// Signature missing, stale, or wrong.
    #[error("Webhook signature verification failed")]
    SignatureRejected,

    /// Body verified but is not a parseable event envelope.
    #[error("Invalid event payload: {0}")]
    MalformedEvent(String),

    /// A handler failed while applying the event.
    #[error("Webhook processing failed: {0}")]
    Handler(WebhookError),
}

/// Pipeline handler for inbound webhook deliveries.
pub struct ProcessWebhookHandler {
    verifier: WebhookVerifier,
    dispatcher: EventDispatcher,
    recorder: EventRecorder,
}

impl ProcessWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        dispatcher: EventDispatcher,
        recorder: EventRecorder,
    ) -> Self {
        Self {
            verifier,
            dispatcher,
            recorder,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<HandlerOutcome, ProcessWebhookError> {
        // 1. Authenticity and freshness
        if !self.verifier.is_valid(&cmd.payload, &cmd.signature) {
            return Err(ProcessWebhookError::SignatureRejected);
        }

        // 2. Envelope parse
        let event = BillingEvent::from_slice(&cmd.payload).map_err(|e| match e {
            WebhookError::MalformedEvent(reason) => ProcessWebhookError::MalformedEvent(reason),
            other => ProcessWebhookError::Handler(other),
        })?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Received billing webhook"
        );

        // 3. Dispatch
        let result = self.dispatcher.dispatch(&event).await;

        // 4. Audit, unconditionally - even when the handler failed
        self.recorder.record(&event).await;

        match result {
            Ok(outcome) => {
                if let HandlerOutcome::Skipped(reason) = &outcome {
                    tracing::info!(event_id = %event.id, reason = %reason, "Event acknowledged without effect");
                }
                Ok(outcome)
            }
            Err(e) => Err(ProcessWebhookError::Handler(e)),
        }
    }
}
