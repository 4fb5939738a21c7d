//! Webhook authenticity checks.

use axum::http::HeaderMap;

/// Decides whether a webhook delivery comes from the trusted relay.
///
/// Consulted before ingestion; a rejected delivery is logged and dropped.
pub trait WebhookVerifier: Send + Sync {
    /// Returns `Err` with a reason if the delivery must not be ingested.
    ///
    /// # Errors
    ///
    /// Implementations return the rejection reason.
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), String>;
}

/// Accepts every delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl WebhookVerifier for AcceptAll {
    fn verify(&self, _headers: &HeaderMap, _body: &[u8]) -> Result<(), String> {
        Ok(())
    }
}
