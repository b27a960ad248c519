//! Order lifecycle state machine.
//!
//! # Design
//!
//! Every status change goes through [`Order::apply`], which re-validates the
//! precondition against the order's *current* status. A caller that checked
//! [`is_actionable`] earlier gets no free pass: if another session approved
//! the order in between, the transition fails with [`InvalidTransition`].
//!
//! # State diagram
//!
//! ```text
//!                 approve
//!    new()    ┌────────────► Approved  (term.)
//!   ──────► Pending
//!             └────────────► Cancelled (term.)
//!                 cancel
//! ```
//!
//! There is no edge out of a terminal state: no re-open, no revert.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Order, OrderId, OrderStatus, StatusFilter};

// ---------------------------------------------------------------------------
// OrderAction
// ---------------------------------------------------------------------------

/// Operator actions that drive transitions on an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    /// `Pending → Approved`.
    Approve,
    /// `Pending → Cancelled`.
    Cancel,
}

impl OrderAction {
    /// Status an order lands in when this action succeeds.
    pub fn target(&self) -> OrderStatus {
        match self {
            Self::Approve => OrderStatus::Approved,
            Self::Cancel => OrderStatus::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InvalidTransition
// ---------------------------------------------------------------------------

/// Returned when an action is applied to an order that is not `Pending`.
///
/// Recoverable: the caller should re-fetch the order and tell the operator
/// what state it is actually in. Never silently ignore it; approving a
/// cancelled order is a logic error the caller needs to see.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition: cannot {action} order {order_id} in status '{from}'")]
pub struct InvalidTransition {
    pub order_id: OrderId,
    /// The status the order was in when the action arrived.
    pub from: OrderStatus,
    pub action: OrderAction,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

impl Order {
    /// Apply an operator action.
    ///
    /// # Errors
    /// Returns [`InvalidTransition`] unless the order is `Pending`. The order
    /// is left untouched on error.
    pub fn apply(&mut self, action: OrderAction) -> Result<(), InvalidTransition> {
        use OrderAction::*;
        use OrderStatus::*;

        match (self.status, action) {
            (Pending, Approve) => self.status = Approved,
            (Pending, Cancel) => self.status = Cancelled,

            // Approved and Cancelled are terminal.
            (from @ (Approved | Cancelled), action) => {
                return Err(InvalidTransition {
                    order_id: self.id().clone(),
                    from,
                    action,
                });
            }
        }

        Ok(())
    }

    /// `Pending → Approved`. See [`Order::apply`].
    pub fn approve(&mut self) -> Result<(), InvalidTransition> {
        self.apply(OrderAction::Approve)
    }

    /// `Pending → Cancelled`. See [`Order::apply`].
    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        self.apply(OrderAction::Cancel)
    }
}

/// Free-function form of [`Order::approve`].
pub fn approve(order: &mut Order) -> Result<(), InvalidTransition> {
    order.approve()
}

/// Free-function form of [`Order::cancel`].
pub fn cancel(order: &mut Order) -> Result<(), InvalidTransition> {
    order.cancel()
}

/// True iff the order still accepts approve/cancel.
///
/// Presentation only: use it to decide whether to render controls. The
/// transitions re-check on their own.
pub fn is_actionable(order: &Order) -> bool {
    order.status() == OrderStatus::Pending
}

/// Stable filter: keeps input order, drops nothing under [`StatusFilter::All`].
pub fn filter_by_status(orders: &[Order], filter: StatusFilter) -> Vec<&Order> {
    orders
        .iter()
        .filter(|o| filter.matches(o.status()))
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, OrderDraft, ShelterId};
    use chrono::{TimeZone, Utc};

    fn pending_order(id: &str) -> Order {
        Order::with_id(
            OrderId::new(id),
            OrderDraft {
                shelter_id: ShelterId::new("shelter-1"),
                item_id: ItemId::new("blankets"),
                order_quantity: 40.0,
                current_inventory: 100.0,
                forecasted_usage: 10.0,
                days_until_stockout: 10.0,
            },
            Utc.with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn new_order_starts_pending_and_actionable() {
        let o = pending_order("o-1");
        assert_eq!(o.status(), OrderStatus::Pending);
        assert!(!o.status().is_terminal());
        assert!(is_actionable(&o));
    }

    #[test]
    fn approve_moves_to_approved() {
        let mut o = pending_order("o-1");
        approve(&mut o).unwrap();
        assert_eq!(o.status(), OrderStatus::Approved);
        assert!(o.status().is_terminal());
        assert!(!is_actionable(&o));
    }

    #[test]
    fn cancel_moves_to_cancelled() {
        let mut o = pending_order("o-1");
        cancel(&mut o).unwrap();
        assert_eq!(o.status(), OrderStatus::Cancelled);
        assert!(!is_actionable(&o));
    }

    #[test]
    fn approve_on_cancelled_reports_error_and_keeps_status() {
        let mut o = pending_order("o-7");
        o.cancel().unwrap();

        let err = o.approve().unwrap_err();
        assert_eq!(err.from, OrderStatus::Cancelled);
        assert_eq!(err.action, OrderAction::Approve);
        assert_eq!(err.order_id.as_str(), "o-7");
        assert_eq!(o.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn error_message_names_order_status_and_action() {
        let mut o = pending_order("o-9");
        o.approve().unwrap();
        let err = o.approve().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("o-9"), "{msg}");
        assert!(msg.contains("approved"), "{msg}");
        assert!(msg.contains("approve"), "{msg}");
    }

    #[test]
    fn action_targets() {
        assert_eq!(OrderAction::Approve.target(), OrderStatus::Approved);
        assert_eq!(OrderAction::Cancel.target(), OrderStatus::Cancelled);
    }

    #[test]
    fn filter_all_is_identity() {
        let mut a = pending_order("a");
        let b = pending_order("b");
        a.approve().unwrap();
        let orders = vec![a, b];
        let out = filter_by_status(&orders, StatusFilter::All);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id().as_str(), "a");
        assert_eq!(out[1].id().as_str(), "b");
    }

    #[test]
    fn filter_only_keeps_matching_in_order() {
        let mut a = pending_order("a");
        let b = pending_order("b");
        let mut c = pending_order("c");
        let d = pending_order("d");
        a.approve().unwrap();
        c.cancel().unwrap();
        let orders = vec![a, b, c, d];

        let pending: Vec<&str> = filter_by_status(&orders, OrderStatus::Pending.into())
            .iter()
            .map(|o| o.id().as_str())
            .collect();
        assert_eq!(pending, vec!["b", "d"]);

        let cancelled = filter_by_status(&orders, StatusFilter::Only(OrderStatus::Cancelled));
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id().as_str(), "c");
    }
}
