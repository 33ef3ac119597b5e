//! Best-effort hand-off of placed orders to the POS system.
//!
//! Checkout enqueues a [`RelayJob`] and returns immediately. One background
//! worker drains the bounded queue, makes a single delivery-creation call
//! per job, and flags the stored order on success. Nothing is retried; the
//! outcome of every job is broadcast to subscribers and failures are kept
//! in a short in-memory log for inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::instrument;

use miniapp_core::{OrderId, OrderRecord, SessionClaims};

use crate::db::Store;
use crate::pos::{DeliveryCreateRequest, DeliveryCustomer, DeliveryItem, DeliveryOrder, PosClient};

/// Failures retained for [`PosRelay::recent_failures`].
const FAILURE_LOG_CAPACITY: usize = 100;

/// Customer name sent when the order carries no usable name.
const GUEST_NAME: &str = "Guest";

/// A persisted order waiting to be pushed to the POS system.
#[derive(Debug, Clone)]
pub struct RelayJob {
    pub order: OrderRecord,
    /// Identity of the customer; `None` for anonymous orders.
    pub claims: Option<SessionClaims>,
}

/// What happened to a relay job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RelayOutcome {
    /// The POS system accepted the delivery.
    Sent {
        order_id: OrderId,
        pos_order_id: Option<String>,
    },
    /// No access token was available; nothing was sent.
    Skipped { order_id: OrderId },
    /// The call failed or the job could not be queued.
    Failed { order_id: OrderId, reason: String },
}

impl RelayOutcome {
    /// The order this outcome belongs to.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::Sent { order_id, .. }
            | Self::Skipped { order_id }
            | Self::Failed { order_id, .. } => order_id,
        }
    }
}

/// Build the POS delivery payload for an order.
#[must_use]
pub fn delivery_request(
    organization_id: Option<&str>,
    order: &OrderRecord,
    claims: Option<&SessionClaims>,
) -> DeliveryCreateRequest {
    DeliveryCreateRequest {
        organization_id: organization_id.map(String::from),
        order: DeliveryOrder {
            phone: claims
                .and_then(|c| c.phone.clone())
                .unwrap_or_default(),
            customer: DeliveryCustomer {
                name: claims
                    .and_then(SessionClaims::display_name)
                    .unwrap_or_else(|| GUEST_NAME.to_string()),
                id: claims.map(|c| c.id.to_string()),
            },
            items: order
                .items
                .iter()
                .map(|line| DeliveryItem {
                    product_id: line.id.to_string(),
                    amount: line.qty,
                })
                .collect(),
        },
    }
}

/// Handle to the relay queue. Clones share the queue and the outcome log.
#[derive(Clone)]
pub struct PosRelay {
    sender: mpsc::Sender<RelayJob>,
    shared: Arc<Shared>,
}

struct Shared {
    outcomes: broadcast::Sender<RelayOutcome>,
    failures: Mutex<VecDeque<RelayOutcome>>,
}

impl Shared {
    fn record(&self, outcome: RelayOutcome) {
        if matches!(outcome, RelayOutcome::Failed { .. }) {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            if failures.len() == FAILURE_LOG_CAPACITY {
                failures.pop_front();
            }
            failures.push_back(outcome.clone());
        }
        // No subscribers is fine.
        let _ = self.outcomes.send(outcome);
    }
}

impl PosRelay {
    /// Start the relay worker with a queue of `capacity` jobs.
    ///
    /// Must be called from within a Tokio runtime. The worker stops once
    /// every handle has been dropped and the queue is drained.
    #[must_use]
    pub fn spawn(pos: PosClient, store: Store, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (outcomes, _) = broadcast::channel(FAILURE_LOG_CAPACITY);
        let shared = Arc::new(Shared {
            outcomes,
            failures: Mutex::new(VecDeque::new()),
        });

        tokio::spawn(run_worker(receiver, pos, store, Arc::clone(&shared)));

        Self { sender, shared }
    }

    /// Queue a job without waiting.
    ///
    /// Returns `false` if the job was dropped because the queue is full or
    /// the worker is gone; the drop is logged and recorded as a failure.
    pub fn submit(&self, job: RelayJob) -> bool {
        let order_id = job.order.id.clone();
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "relay queue full",
                    mpsc::error::TrySendError::Closed(_) => "relay worker stopped",
                };
                tracing::warn!(order_id = %order_id, reason, "Dropping POS relay job");
                self.shared.record(RelayOutcome::Failed {
                    order_id,
                    reason: reason.to_string(),
                });
                false
            }
        }
    }

    /// Receive outcomes of jobs processed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RelayOutcome> {
        self.shared.outcomes.subscribe()
    }

    /// The most recent failures, oldest first.
    #[must_use]
    pub fn recent_failures(&self) -> Vec<RelayOutcome> {
        self.shared
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<RelayJob>,
    pos: PosClient,
    store: Store,
    shared: Arc<Shared>,
) {
    while let Some(job) = receiver.recv().await {
        let outcome = relay(&pos, &store, job).await;
        shared.record(outcome);
    }
    tracing::debug!("POS relay worker stopped");
}

#[instrument(skip_all, fields(order_id = %job.order.id, number = %job.order.number))]
async fn relay(pos: &PosClient, store: &Store, job: RelayJob) -> RelayOutcome {
    let order_id = job.order.id.clone();

    if pos.access_token().await.is_none() {
        tracing::info!("No POS token, skipping order relay");
        return RelayOutcome::Skipped { order_id };
    }

    let request = delivery_request(pos.organization_id(), &job.order, job.claims.as_ref());
    let response = match pos.create_delivery(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "POS order relay failed");
            return RelayOutcome::Failed {
                order_id,
                reason: e.to_string(),
            };
        }
    };

    let pos_order_id = response.pos_order_id().map(String::from);
    tracing::info!(pos_order_id = ?pos_order_id, "Order sent to POS");

    let flagged = store
        .with_orders(|orders| {
            orders
                .iter_mut()
                .find(|o| o.id == order_id)
                .map(OrderRecord::mark_sent)
                .is_some()
        })
        .await;
    match flagged {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Relayed order no longer in store"),
        Err(e) => tracing::error!(error = %e, "Failed to flag relayed order"),
    }

    RelayOutcome::Sent {
        order_id,
        pos_order_id,
    }
}
