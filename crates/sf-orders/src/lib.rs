//! sf-orders
//!
//! Replenishment order model and the lifecycle state machine that is the
//! single source of truth for what can happen to an order.
//!
//! - Pure value transformations: no I/O, no time source, no shared state.
//! - The only mutable field is `status`, and only `approve`/`cancel` move it.
//! - Holding a collection of orders (and persisting transitions atomically)
//!   is the caller's job.

mod lifecycle;
mod types;

pub use lifecycle::{
    approve, cancel, filter_by_status, is_actionable, InvalidTransition, OrderAction,
};

pub use types::{
    InvalidOrder, ItemId, Order, OrderDraft, OrderId, OrderStatus, ShelterId, StatusFilter,
    UnknownStatus,
};
