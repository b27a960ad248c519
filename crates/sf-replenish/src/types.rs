use serde::{Deserialize, Serialize};
use sf_orders::{InvalidOrder, ItemId, ShelterId};

/// Reorder thresholds.
///
/// An order is raised when stock would run out within
/// `horizon_days × (1 + buffer_fraction)` days, and it tops stock up to cover
/// `horizon_days` of forecast usage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplenishmentPolicy {
    /// Days of usage an order should cover. Must be > 0.
    pub horizon_days: f64,
    /// Safety margin on top of the horizon (0.2 = 20%). Must be ≥ 0.
    pub buffer_fraction: f64,
}

impl Default for ReplenishmentPolicy {
    fn default() -> Self {
        Self {
            horizon_days: 14.0,
            buffer_fraction: 0.2,
        }
    }
}

impl ReplenishmentPolicy {
    /// Days-until-stockout below which an order is raised.
    pub fn reorder_threshold_days(&self) -> f64 {
        self.horizon_days + self.buffer_fraction * self.horizon_days
    }
}

/// Stock on hand for one item at one shelter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPosition {
    pub shelter_id: ShelterId,
    pub item_id: ItemId,
    pub current_inventory: f64,
}

impl StockPosition {
    pub fn new(
        shelter_id: impl Into<ShelterId>,
        item_id: impl Into<ItemId>,
        current_inventory: f64,
    ) -> Self {
        Self {
            shelter_id: shelter_id.into(),
            item_id: item_id.into(),
            current_inventory,
        }
    }
}

/// What the planner concluded for one position, before any order is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub avg_daily_usage: f64,
    /// `None` when forecast usage is zero (stock never runs out).
    pub days_until_stockout: Option<f64>,
    pub reorder_threshold_days: f64,
    /// `max(avg × horizon − inventory, 0)`, rounded to 2 decimals.
    pub order_quantity: f64,
}

impl Assessment {
    /// True when stock runs out inside the threshold and a positive quantity
    /// is needed.
    pub fn needs_order(&self) -> bool {
        let short = self
            .days_until_stockout
            .is_some_and(|d| d < self.reorder_threshold_days);
        short && self.order_quantity > 0.0
    }
}

/// Rejected planner inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("invalid inventory {0}: must be finite and non-negative")]
    InvalidInventory(f64),
    #[error("invalid prediction at {index}: {value} (must be finite and non-negative)")]
    InvalidPrediction { index: usize, value: f64 },
    #[error(transparent)]
    InvalidOrder(#[from] InvalidOrder),
}
