//! Shared runtime state for sf-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Orders go through an
//! [`OrderRepository`]; forecast observations are kept per (shelter, item) in
//! memory.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sf_config::ShelterFlowConfig;
use sf_forecast::ForecastSeries;
use sf_orders::{ItemId, Order, ShelterId};
use tokio::sync::{broadcast, RwLock};

use crate::store::{InMemoryOrderRepository, OrderRepository};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Order(OrderEvent),
    LogLine { level: String, msg: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    Approved,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order: Order,
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub type ForecastKey = (ShelterId, ItemId);

pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub settings: ShelterFlowConfig,
    /// Hash of the loaded config layers; `None` when running on defaults.
    pub config_hash: Option<String>,
    pub orders: Arc<dyn OrderRepository>,
    /// Observations per (shelter, item), ordered by timestamp.
    pub forecasts: RwLock<BTreeMap<ForecastKey, ForecastSeries>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_settings(ShelterFlowConfig::default(), None)
    }

    pub fn with_settings(settings: ShelterFlowConfig, config_hash: Option<String>) -> Self {
        Self::with_repository(settings, config_hash, Arc::new(InMemoryOrderRepository::new()))
    }

    pub fn with_repository(
        settings: ShelterFlowConfig,
        config_hash: Option<String>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "sf-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            settings,
            config_hash,
            orders,
            forecasts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Publish an order event. No subscribers is not an error.
    pub fn publish_order(&self, kind: OrderEventKind, order: &Order) {
        let _ = self.bus.send(BusMsg::Order(OrderEvent {
            kind,
            order: order.clone(),
        }));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
