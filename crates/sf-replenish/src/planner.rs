use chrono::{DateTime, Utc};
use sf_orders::{Order, OrderDraft};
use tracing::{debug, info};

use crate::types::{Assessment, PlanError, ReplenishmentPolicy, StockPosition};

fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

fn validate(
    policy: &ReplenishmentPolicy,
    current_inventory: f64,
    predictions: &[f64],
) -> Result<(), PlanError> {
    if !(policy.horizon_days.is_finite() && policy.horizon_days > 0.0) {
        return Err(PlanError::InvalidPolicy(format!(
            "horizon_days must be > 0, got {}",
            policy.horizon_days
        )));
    }
    if !(policy.buffer_fraction.is_finite() && policy.buffer_fraction >= 0.0) {
        return Err(PlanError::InvalidPolicy(format!(
            "buffer_fraction must be >= 0, got {}",
            policy.buffer_fraction
        )));
    }
    if !(current_inventory.is_finite() && current_inventory >= 0.0) {
        return Err(PlanError::InvalidInventory(current_inventory));
    }
    if let Some((index, &value)) = predictions
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && **v >= 0.0))
    {
        return Err(PlanError::InvalidPrediction { index, value });
    }
    Ok(())
}

/// Evaluate stock against forecast daily usage.
///
/// Rules:
/// - avg = mean(predictions)
/// - days_until_stockout = inventory / avg (none when avg == 0)
/// - quantity = max(avg × horizon − inventory, 0)
///
/// Returns `Ok(None)` when there are no predictions to plan from.
pub fn assess(
    current_inventory: f64,
    predictions: &[f64],
    policy: &ReplenishmentPolicy,
) -> Result<Option<Assessment>, PlanError> {
    validate(policy, current_inventory, predictions)?;
    if predictions.is_empty() {
        return Ok(None);
    }

    let avg_daily_usage = predictions.iter().sum::<f64>() / predictions.len() as f64;
    let days_until_stockout = if avg_daily_usage > 0.0 {
        Some(current_inventory / avg_daily_usage)
    } else {
        None
    };
    let order_quantity = round_to(
        (avg_daily_usage * policy.horizon_days - current_inventory).max(0.0),
        2,
    );

    Ok(Some(Assessment {
        avg_daily_usage,
        days_until_stockout,
        reorder_threshold_days: policy.reorder_threshold_days(),
        order_quantity,
    }))
}

/// Decide whether `position` needs replenishing and, if so, build the
/// `Pending` order for it.
///
/// No order is produced for an empty forecast, for stock that outlasts the
/// threshold, or when the computed quantity rounds to zero.
pub fn plan_replenishment(
    position: &StockPosition,
    predictions: &[f64],
    policy: &ReplenishmentPolicy,
    now: DateTime<Utc>,
) -> Result<Option<Order>, PlanError> {
    let Some(assessment) = assess(position.current_inventory, predictions, policy)? else {
        debug!(
            shelter_id = %position.shelter_id,
            item_id = %position.item_id,
            "no predictions; skipping"
        );
        return Ok(None);
    };

    if !assessment.needs_order() {
        debug!(
            shelter_id = %position.shelter_id,
            item_id = %position.item_id,
            days_until_stockout = ?assessment.days_until_stockout,
            threshold = assessment.reorder_threshold_days,
            "stock sufficient"
        );
        return Ok(None);
    }

    let days = assessment.days_until_stockout.unwrap_or_default();
    let order = Order::new_pending(
        OrderDraft {
            shelter_id: position.shelter_id.clone(),
            item_id: position.item_id.clone(),
            order_quantity: assessment.order_quantity,
            current_inventory: position.current_inventory,
            forecasted_usage: assessment.avg_daily_usage,
            days_until_stockout: round_to(days, 1),
        },
        now,
    )?;

    info!(
        order_id = %order.id(),
        shelter_id = %order.shelter_id(),
        item_id = %order.item_id(),
        quantity = order.order_quantity(),
        days_until_stockout = order.days_until_stockout(),
        "replenishment order generated"
    );
    Ok(Some(order))
}

/// One position plus the forecast daily usage to plan it against.
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub position: StockPosition,
    pub predictions: Vec<f64>,
}

/// Result of a planning sweep.
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    pub evaluated: usize,
    pub orders: Vec<Order>,
    /// Positions rejected by validation, with the reason. Other positions are
    /// still planned.
    pub rejected: Vec<(StockPosition, PlanError)>,
}

/// Plan every input. Output order is deterministic: `(shelter_id, item_id)`
/// ascending, independent of input order.
pub fn plan_all(
    inputs: &[PlanInput],
    policy: &ReplenishmentPolicy,
    now: DateTime<Utc>,
) -> PlanReport {
    let mut sorted: Vec<&PlanInput> = inputs.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.position.shelter_id, &a.position.item_id)
            .cmp(&(&b.position.shelter_id, &b.position.item_id))
    });

    let mut report = PlanReport::default();
    for input in sorted {
        report.evaluated += 1;
        match plan_replenishment(&input.position, &input.predictions, policy, now) {
            Ok(Some(order)) => report.orders.push(order),
            Ok(None) => {}
            Err(e) => report.rejected.push((input.position.clone(), e)),
        }
    }

    info!(
        evaluated = report.evaluated,
        orders_generated = report.orders.len(),
        rejected = report.rejected.len(),
        "replenishment sweep complete"
    );
    report
}
