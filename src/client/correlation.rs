//! Request/response correlation.
//!
//! Every outstanding request owns one listener on the host's
//! [`MessageSurface`]. The listener ignores everything but a response
//! envelope carrying its request ID and posted by the channel's own wallet
//! context (see [`SenderFilter`]); the first such response resolves the
//! request and unregisters the listener.
//!
//! Removal from the pending map is the single point of resolution, so a
//! request settles at most once no matter how many responses, timeouts or
//! cancellations race for it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ListenerId, RequestId};
use crate::protocol::Envelope;
use crate::transport::{MessageEvent, MessageSurface, SenderFilter};

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending requests before rejecting new ones.
pub const MAX_PENDING_REQUESTS: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// One outstanding request.
struct PendingRequest {
    /// Surface listener watching for the response.
    listener: ListenerId,
    /// Resolves the caller's future.
    response_tx: oneshot::Sender<Result<Value>>,
}

/// Map of request IDs to pending entries.
type PendingMap = FxHashMap<RequestId, PendingRequest>;

// ============================================================================
// CorrelationRegistry
// ============================================================================

/// Tracks outstanding requests of one channel.
pub struct CorrelationRegistry {
    /// Host `message` surface the per-request listeners live on.
    surface: Arc<MessageSurface>,
    /// The only sender whose responses count.
    sender: Arc<SenderFilter>,
    /// Outstanding requests.
    pending: Mutex<PendingMap>,
}

impl CorrelationRegistry {
    /// Creates an empty registry on `surface` accepting responses from `sender`.
    #[must_use]
    pub fn new(surface: Arc<MessageSurface>, sender: Arc<SenderFilter>) -> Arc<Self> {
        Arc::new(Self {
            surface,
            sender,
            pending: Mutex::new(PendingMap::default()),
        })
    }

    /// Registers a request and returns the future of its response.
    ///
    /// `limit` of `None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the ID is already pending
    /// - [`Error::Protocol`] if too many requests are pending
    pub fn register(
        self: &Arc<Self>,
        request_id: RequestId,
        limit: Option<Duration>,
    ) -> Result<PendingResponse> {
        let (response_tx, response_rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock();

            if pending.contains_key(&request_id) {
                return Err(Error::protocol(format!(
                    "Request {request_id} is already pending"
                )));
            }

            if pending.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = pending.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    pending.len(),
                    MAX_PENDING_REQUESTS
                )));
            }

            let registry = Arc::downgrade(self);
            let watched = request_id.clone();
            let listener = self.surface.add_listener(move |event| {
                if let Some(registry) = registry.upgrade() {
                    registry.handle_message(&watched, event);
                }
            });

            pending.insert(
                request_id.clone(),
                PendingRequest {
                    listener,
                    response_tx,
                },
            );
        }

        trace!(%request_id, ?limit, "Request registered");

        Ok(PendingResponse {
            request_id,
            response_rx,
            limit,
            registry: Arc::downgrade(self),
        })
    }

    /// Returns the number of outstanding requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if `request_id` is outstanding.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.lock().contains_key(request_id)
    }

    /// Drops a request without settling it.
    ///
    /// Returns `false` if it had already settled.
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        match self.take(request_id) {
            Some(entry) => {
                debug!(%request_id, "Request cancelled");
                drop(entry.response_tx);
                true
            }
            None => false,
        }
    }

    /// Rejects every outstanding request with [`Error::ChannelClosed`].
    pub fn fail_all(&self) {
        let drained: Vec<(RequestId, PendingRequest)> = self.pending.lock().drain().collect();

        if drained.is_empty() {
            return;
        }
        debug!(count = drained.len(), "Failing pending requests");

        for (_, entry) in drained {
            self.surface.remove_listener(entry.listener);
            let _ = entry.response_tx.send(Err(Error::ChannelClosed));
        }
    }

    /// Per-request listener body.
    fn handle_message(&self, request_id: &RequestId, event: &MessageEvent) {
        let Some(Envelope::Response(response)) = Envelope::from_message(&event.data) else {
            return;
        };
        if response.request_id != *request_id {
            return;
        }
        if !self.sender.accepts(event) {
            warn!(
                %request_id,
                origin = %event.origin,
                source = ?event.source,
                "Response from foreign sender ignored"
            );
            return;
        }

        let Some(entry) = self.take(request_id) else {
            trace!(%request_id, "Duplicate response ignored");
            return;
        };

        trace!(%request_id, error = response.is_error(), "Response received");
        let _ = entry.response_tx.send(response.into_result());
    }

    /// Removes an entry and its surface listener.
    fn take(&self, request_id: &RequestId) -> Option<PendingRequest> {
        let entry = self.pending.lock().remove(request_id)?;
        self.surface.remove_listener(entry.listener);
        Some(entry)
    }
}

// ============================================================================
// PendingResponse
// ============================================================================

/// The future half of a registered request.
///
/// Dropping it before completion cancels the request.
pub struct PendingResponse {
    request_id: RequestId,
    response_rx: oneshot::Receiver<Result<Value>>,
    limit: Option<Duration>,
    registry: Weak<CorrelationRegistry>,
}

impl PendingResponse {
    /// Returns the correlated request ID.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Waits for the response.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] if the limit elapses first
    /// - [`Error::Remote`] if the wallet answered with an error
    /// - [`Error::ChannelClosed`] if the channel was torn down
    pub async fn wait(mut self) -> Result<Value> {
        let outcome = match self.limit {
            Some(limit) => match timeout(limit, &mut self.response_rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    if let Some(registry) = self.registry.upgrade() {
                        registry.cancel(&self.request_id);
                    }
                    // A response may have won the race against cancellation.
                    return match self.response_rx.try_recv() {
                        Ok(result) => result,
                        Err(_) => Err(Error::request_timeout(
                            self.request_id.clone(),
                            limit.as_millis() as u64,
                        )),
                    };
                }
            },
            None => (&mut self.response_rx).await,
        };

        match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::ChannelClosed),
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        // No-op once settled: the entry is already gone.
        if let Some(registry) = self.registry.upgrade() {
            registry.cancel(&self.request_id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
