//! sf-replenish
//!
//! Replenishment planner: turns forecast daily usage plus stock on hand into
//! `Pending` orders for operator review.
//! - Reorder when stock runs out within horizon × (1 + buffer)
//! - Order tops stock up to one horizon of forecast usage
//! - Deterministic sweep ordering; no I/O, clock supplied by the caller

mod planner;
mod types;

pub use planner::{assess, plan_all, plan_replenishment, PlanInput, PlanReport};
pub use types::{Assessment, PlanError, ReplenishmentPolicy, StockPosition};
