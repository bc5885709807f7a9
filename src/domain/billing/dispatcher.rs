//! Event dispatch - routes verified events to their handlers.
//!
//! The routing table is built once at startup from the handlers' declared
//! event types. Unknown types are acknowledged as no-ops, never errors:
//! providers add event types over time and an unrecognized one must not
//! break delivery.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::errors::WebhookError;
use super::event::{BillingEvent, BillingEventType};

/// Outcome of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The event mutated subscription state.
    Applied,
    /// The event was acknowledged without effect (missing metadata, stale
    /// subscription reference, or no handler registered).
    Skipped(String),
}

impl HandlerOutcome {
    /// Convenience constructor for skipped outcomes.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }
}

/// Handler for one or more provider event types.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// The event types this handler processes.
    fn handles(&self) -> Vec<BillingEventType>;

    /// Handles one verified, parsed event.
    ///
    /// Attribution failures are reported as `Ok(Skipped)`, not errors;
    /// `Err` is reserved for infrastructure failures.
    async fn handle(&self, event: &BillingEvent) -> Result<HandlerOutcome, WebhookError>;
}

/// Immutable event-type routing table.
pub struct EventDispatcher {
    routes: HashMap<BillingEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Registers a handler for every event type it declares.
    ///
    /// Later registrations for the same type win; in practice each type has
    /// exactly one handler.
    pub fn register(mut self, handler: Arc<dyn EventHandler>) -> Self {
        for event_type in handler.handles() {
            self.routes.insert(event_type, handler.clone());
        }
        self
    }

    /// Dispatches an event to its handler.
    ///
    /// Events with no registered handler (including unknown types) are
    /// acknowledged as skipped.
    pub async fn dispatch(&self, event: &BillingEvent) -> Result<HandlerOutcome, WebhookError> {
        match self.routes.get(&event.parsed_type()) {
            Some(handler) => handler.handle(event).await,
            None => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Unhandled event type, acknowledging without action"
                );
                Ok(HandlerOutcome::skipped(format!(
                    "no handler for event type {}",
                    event.event_type
                )))
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
