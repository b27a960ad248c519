//! Request and response types for the sf-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sf_forecast::ForecastPointRecord;
use sf_orders::{Order, OrderAction, OrderId, OrderStatus};
use sf_replenish::Assessment;

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" when the process can answer.
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body for every 4xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. "ORDER_NOT_FOUND".
    pub error: String,
    pub detail: String,
}

/// 409 body when an action hits an order that is no longer pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRejectedResponse {
    pub error: String,
    pub detail: String,
    pub order_id: OrderId,
    pub current_status: OrderStatus,
    pub action: OrderAction,
}

// ---------------------------------------------------------------------------
// /api/forecast, /api/metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesQuery {
    pub shelter_id: String,
    pub item_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Metrics only: overrides the configured zero-actual policy.
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestForecastRequest {
    pub shelter_id: String,
    pub item_id: String,
    /// Raw records; validated as a whole before anything is stored.
    pub points: Vec<ForecastPointRecord>,
    /// Collapse the incoming points to one per day before storing.
    #[serde(default)]
    pub resample_daily: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestForecastResponse {
    pub shelter_id: String,
    pub item_id: String,
    /// Points merged from this request (after resampling, if requested).
    pub accepted: usize,
    /// Points now stored for the (shelter, item).
    pub stored: usize,
}

// ---------------------------------------------------------------------------
// /api/orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdersQuery {
    /// "all" (or absent), "pending", "approved", "cancelled".
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// /api/replenishment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplenishmentRequest {
    pub shelter_id: String,
    pub item_id: String,
    pub current_inventory: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplenishmentResponse {
    /// The order created, or `None` when stock is sufficient.
    pub order: Option<Order>,
    /// `None` when no forecast is stored for the item.
    pub assessment: Option<Assessment>,
}
