//! Axum router and all HTTP handlers for sf-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use sf_forecast::{resample_daily, summarize, ForecastPoint, ForecastSeries, ZeroActualPolicy};
use sf_orders::{filter_by_status, ItemId, OrderAction, OrderId, ShelterId, StatusFilter};
use sf_replenish::{assess, plan_replenishment, StockPosition};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::{
    api_types::{
        ErrorResponse, HealthResponse, IngestForecastRequest, IngestForecastResponse,
        OrdersQuery, ReplenishmentRequest, ReplenishmentResponse, SeriesQuery,
        TransitionRejectedResponse,
    },
    state::{uptime_secs, AppState, BusMsg, ForecastKey, OrderEventKind},
    store::{apply_action, ActionError},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/forecast", get(forecast_get).post(forecast_post))
        .route("/api/metrics", get(metrics))
        .route("/api/orders", get(orders_list))
        .route("/api/orders/:id/approve", post(order_approve))
        .route("/api/orders/:id/cancel", post(order_cancel))
        .route("/api/replenishment", post(replenishment))
        .route("/api/stream", get(stream))
        .with_state(state)
}

fn reject(status: StatusCode, error: &str, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            detail: detail.into(),
        }),
    )
        .into_response()
}

fn key_of(shelter_id: &str, item_id: &str) -> ForecastKey {
    (ShelterId::new(shelter_id), ItemId::new(item_id))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            timestamp: chrono::Utc::now(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// /api/forecast
// ---------------------------------------------------------------------------

/// Stored series for the key, narrowed to the query's date range.
async fn stored_series(st: &AppState, q: &SeriesQuery) -> ForecastSeries {
    let forecasts = st.forecasts.read().await;
    let Some(series) = forecasts.get(&key_of(&q.shelter_id, &q.item_id)) else {
        return ForecastSeries::empty();
    };
    match (q.start_date, q.end_date) {
        (None, None) => series.clone(),
        (start, end) => series.within(
            start.unwrap_or(chrono::NaiveDate::MIN),
            end.unwrap_or(chrono::NaiveDate::MAX),
        ),
    }
}

pub(crate) async fn forecast_get(
    State(st): State<Arc<AppState>>,
    Query(q): Query<SeriesQuery>,
) -> impl IntoResponse {
    let series = stored_series(&st, &q).await;
    let points: Vec<ForecastPoint> = series.into();
    (StatusCode::OK, Json(points))
}

pub(crate) async fn forecast_post(
    State(st): State<Arc<AppState>>,
    Json(req): Json<IngestForecastRequest>,
) -> Response {
    let incoming = match ForecastSeries::from_records(&req.points) {
        Ok(s) => s,
        Err(e) => {
            warn!(shelter_id = %req.shelter_id, item_id = %req.item_id, error = %e, "forecast rejected");
            let _ = st.bus.send(BusMsg::LogLine {
                level: "WARN".to_string(),
                msg: format!("forecast for {}/{} rejected: {e}", req.shelter_id, req.item_id),
            });
            return reject(StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_SERIES", e.to_string());
        }
    };
    let incoming = if req.resample_daily {
        resample_daily(&incoming)
    } else {
        incoming
    };

    let stored = {
        let mut forecasts = st.forecasts.write().await;
        let series = forecasts
            .entry(key_of(&req.shelter_id, &req.item_id))
            .or_default();
        series.merge(&incoming);
        series.len()
    };

    info!(
        shelter_id = %req.shelter_id,
        item_id = %req.item_id,
        accepted = incoming.len(),
        stored,
        "forecast stored"
    );
    (
        StatusCode::OK,
        Json(IngestForecastResponse {
            shelter_id: req.shelter_id,
            item_id: req.item_id,
            accepted: incoming.len(),
            stored,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /api/metrics
// ---------------------------------------------------------------------------

pub(crate) async fn metrics(
    State(st): State<Arc<AppState>>,
    Query(q): Query<SeriesQuery>,
) -> Response {
    let policy = match q.policy.as_deref() {
        None => st.settings.analytics.zero_actual_policy,
        Some(raw) => match raw.parse::<ZeroActualPolicy>() {
            Ok(p) => p,
            Err(e) => return reject(StatusCode::BAD_REQUEST, "UNKNOWN_POLICY", e.to_string()),
        },
    };
    let series = stored_series(&st, &q).await;
    (StatusCode::OK, Json(summarize(&series, policy))).into_response()
}

// ---------------------------------------------------------------------------
// /api/orders
// ---------------------------------------------------------------------------

pub(crate) async fn orders_list(
    State(st): State<Arc<AppState>>,
    Query(q): Query<OrdersQuery>,
) -> Response {
    let filter = match q.status.as_deref().map(str::parse::<StatusFilter>) {
        None => StatusFilter::All,
        Some(Ok(f)) => f,
        Some(Err(e)) => return reject(StatusCode::BAD_REQUEST, "UNKNOWN_STATUS", e.to_string()),
    };

    let orders = match st.orders.list().await {
        Ok(o) => o,
        Err(e) => return reject(StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY", e.to_string()),
    };
    let selected: Vec<_> = filter_by_status(&orders, filter)
        .into_iter()
        .cloned()
        .collect();
    (StatusCode::OK, Json(selected)).into_response()
}

pub(crate) async fn order_approve(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    order_action(&st, OrderId::new(id), OrderAction::Approve).await
}

pub(crate) async fn order_cancel(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    order_action(&st, OrderId::new(id), OrderAction::Cancel).await
}

async fn order_action(st: &AppState, id: OrderId, action: OrderAction) -> Response {
    match apply_action(st.orders.as_ref(), &id, action).await {
        Ok(order) => {
            let kind = match action {
                OrderAction::Approve => OrderEventKind::Approved,
                OrderAction::Cancel => OrderEventKind::Cancelled,
            };
            st.publish_order(kind, &order);
            (StatusCode::OK, Json(order)).into_response()
        }
        Err(ActionError::NotFound(id)) => reject(
            StatusCode::NOT_FOUND,
            "ORDER_NOT_FOUND",
            format!("order {id} not found"),
        ),
        Err(ActionError::Rejected(e)) => (
            StatusCode::CONFLICT,
            Json(TransitionRejectedResponse {
                error: "INVALID_TRANSITION".to_string(),
                detail: e.to_string(),
                order_id: e.order_id,
                current_status: e.from,
                action: e.action,
            }),
        )
            .into_response(),
        Err(ActionError::Repository(e)) => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY", e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/replenishment
// ---------------------------------------------------------------------------

/// Plan one (shelter, item) against its stored predictions. Creates a pending
/// order (201) or reports that none is needed (200).
pub(crate) async fn replenishment(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ReplenishmentRequest>,
) -> Response {
    let predictions = {
        let forecasts = st.forecasts.read().await;
        forecasts
            .get(&key_of(&req.shelter_id, &req.item_id))
            .map(ForecastSeries::predictions)
            .unwrap_or_default()
    };
    let policy = st.settings.replenishment;
    let position = StockPosition::new(
        req.shelter_id.as_str(),
        req.item_id.as_str(),
        req.current_inventory,
    );

    let assessment = match assess(req.current_inventory, &predictions, &policy) {
        Ok(a) => a,
        Err(e) => return reject(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PLAN_INPUT", e.to_string()),
    };
    let order = match plan_replenishment(&position, &predictions, &policy, chrono::Utc::now()) {
        Ok(o) => o,
        Err(e) => return reject(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PLAN_INPUT", e.to_string()),
    };

    let Some(order) = order else {
        return (
            StatusCode::OK,
            Json(ReplenishmentResponse {
                order: None,
                assessment,
            }),
        )
            .into_response();
    };

    if let Err(e) = st.orders.insert(order.clone()).await {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY", e.to_string());
    }
    st.publish_order(OrderEventKind::Created, &order);

    (
        StatusCode::CREATED,
        Json(ReplenishmentResponse {
            order: Some(order),
            assessment,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /api/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        // Lagged receivers skip missed messages.
        let m = msg.ok()?;
        let event_name = match &m {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Order(_) => "order",
            BusMsg::LogLine { .. } => "log",
        };
        let data = serde_json::to_string(&m).ok()?;
        Some(Ok(Event::default().event(event_name).data(data)))
    })
}
