//! Order persistence for the daemon.
//!
//! # Design
//!
//! The lifecycle rules live in `sf-orders`; this module only makes a
//! transition stick. A transition is read → apply on a copy → conditional
//! write. The write succeeds only if the stored status is still the one the
//! copy was derived from, so two operators racing approve/cancel on the same
//! order cannot both win:
//!
//! ```text
//!   op A: get(Pending) ── apply(Approve) ── replace_if_status(Pending) ✓
//!   op B: get(Pending) ── apply(Cancel)  ── replace_if_status(Pending) ✗ StatusChanged(Approved)
//!                                                     └─> InvalidTransition { from: Approved }
//! ```
//!
//! The loser sees the same `InvalidTransition` it would have seen had it
//! arrived second, carrying the status the winner left behind.

use async_trait::async_trait;
use sf_orders::{InvalidTransition, Order, OrderAction, OrderId, OrderStatus};
use tokio::sync::RwLock;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("order {0} already exists")]
    Duplicate(OrderId),
    #[error("order {0} not found")]
    NotFound(OrderId),
    #[error("order {order_id} is '{actual}', expected '{expected}'")]
    StatusChanged {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },
}

/// Why an operator action did not take effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("order {0} not found")]
    NotFound(OrderId),
    #[error(transparent)]
    Rejected(#[from] InvalidTransition),
    #[error(transparent)]
    Repository(RepositoryError),
}

// ---------------------------------------------------------------------------
// OrderRepository
// ---------------------------------------------------------------------------

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), RepositoryError>;

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// All orders in insertion order.
    async fn list(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Store `updated` only if the stored order with the same id is still in
    /// `expected` status. Atomic with respect to other calls on the same id.
    async fn replace_if_status(
        &self,
        expected: OrderStatus,
        updated: Order,
    ) -> Result<(), RepositoryError>;
}

/// Process-local repository. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.id() == order.id()) {
            return Err(RepositoryError::Duplicate(order.id().clone()));
        }
        orders.push(order);
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|o| o.id() == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.orders.read().await.clone())
    }

    async fn replace_if_status(
        &self,
        expected: OrderStatus,
        updated: Order,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let slot = orders
            .iter_mut()
            .find(|o| o.id() == updated.id())
            .ok_or_else(|| RepositoryError::NotFound(updated.id().clone()))?;
        if slot.status() != expected {
            return Err(RepositoryError::StatusChanged {
                order_id: updated.id().clone(),
                expected,
                actual: slot.status(),
            });
        }
        *slot = updated;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Apply `action` to the stored order `id` and persist the result.
///
/// # Errors
/// - [`ActionError::NotFound`] for an unknown id.
/// - [`ActionError::Rejected`] when the order is terminal, including when a
///   concurrent action got there first.
pub async fn apply_action(
    repo: &dyn OrderRepository,
    id: &OrderId,
    action: OrderAction,
) -> Result<Order, ActionError> {
    let current = repo
        .get(id)
        .await
        .map_err(ActionError::Repository)?
        .ok_or_else(|| ActionError::NotFound(id.clone()))?;

    let mut next = current.clone();
    next.apply(action)?;

    match repo.replace_if_status(current.status(), next.clone()).await {
        Ok(()) => {
            info!(order_id = %id, %action, status = %next.status(), "order transitioned");
            Ok(next)
        }
        Err(RepositoryError::StatusChanged { actual, .. }) => {
            warn!(order_id = %id, %action, status = %actual, "lost transition race");
            Err(ActionError::Rejected(InvalidTransition {
                order_id: id.clone(),
                from: actual,
                action,
            }))
        }
        Err(RepositoryError::NotFound(_)) => Err(ActionError::NotFound(id.clone())),
        Err(e) => Err(ActionError::Repository(e)),
    }
}
