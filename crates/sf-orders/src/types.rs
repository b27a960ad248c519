use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// Opaque order identifier. Generated orders carry a UUID v4 string.
    OrderId
}

string_id! {
    /// Shelter (location) identifier.
    ShelterId
}

string_id! {
    /// Supply-category identifier (e.g. `blankets`).
    ItemId
}

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a replenishment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting an operator decision. Initial state.
    Pending,
    /// Approved for fulfilment. **Terminal.**
    Approved,
    /// Cancelled by an operator. **Terminal.**
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}' (expected pending | approved | cancelled)")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusFilter
// ---------------------------------------------------------------------------

/// Selection used by [`crate::filter_by_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Every order passes through unchanged.
    #[default]
    All,
    /// Only orders whose status is exactly this one.
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: OrderStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

impl From<OrderStatus> for StatusFilter {
    fn from(status: OrderStatus) -> Self {
        Self::Only(status)
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// Quantities for a new order. Identity, status and timestamp are assigned by
/// [`Order::new_pending`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub shelter_id: ShelterId,
    pub item_id: ItemId,
    /// Quantity requested; must be positive.
    pub order_quantity: f64,
    /// Stock on hand when the order was generated (snapshot, not live).
    pub current_inventory: f64,
    /// Projected daily consumption over the replenishment horizon.
    pub forecasted_usage: f64,
    /// Estimated days before `current_inventory` runs out.
    pub days_until_stockout: f64,
}

/// A request to replenish one item at one shelter.
///
/// Every field is read-only after construction. `status` can only leave
/// `Pending` through [`Order::approve`] or [`Order::cancel`]; deserialization
/// exists to rehydrate records held by the caller's system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    shelter_id: ShelterId,
    item_id: ItemId,
    order_quantity: f64,
    current_inventory: f64,
    forecasted_usage: f64,
    days_until_stockout: f64,
    pub(crate) status: OrderStatus,
    timestamp: DateTime<Utc>,
}

/// A draft whose quantities cannot describe a real order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid order draft: {field} = {value} ({requirement})")]
pub struct InvalidOrder {
    pub field: &'static str,
    pub value: f64,
    pub requirement: &'static str,
}

impl OrderDraft {
    /// First quantity that breaks the order invariants, checked in field order.
    pub fn validate(&self) -> Result<(), InvalidOrder> {
        let checks: [(&'static str, f64, bool, &'static str); 4] = [
            (
                "order_quantity",
                self.order_quantity,
                self.order_quantity > 0.0,
                "must be finite and positive",
            ),
            (
                "current_inventory",
                self.current_inventory,
                self.current_inventory >= 0.0,
                "must be finite and non-negative",
            ),
            (
                "forecasted_usage",
                self.forecasted_usage,
                self.forecasted_usage >= 0.0,
                "must be finite and non-negative",
            ),
            (
                "days_until_stockout",
                self.days_until_stockout,
                self.days_until_stockout >= 0.0,
                "must be finite and non-negative",
            ),
        ];
        match checks
            .into_iter()
            .find(|(_, value, ok, _)| !(*ok && value.is_finite()))
        {
            Some((field, value, _, requirement)) => Err(InvalidOrder {
                field,
                value,
                requirement,
            }),
            None => Ok(()),
        }
    }
}

impl Order {
    /// Create a new `Pending` order with a freshly generated id.
    ///
    /// # Errors
    /// [`InvalidOrder`] when the draft fails [`OrderDraft::validate`].
    pub fn new_pending(
        draft: OrderDraft,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, InvalidOrder> {
        Self::with_id(OrderId::generate(), draft, timestamp)
    }

    /// Create a new `Pending` order with a caller-supplied id.
    ///
    /// # Errors
    /// [`InvalidOrder`] when the draft fails [`OrderDraft::validate`]. No order
    /// is built from a rejected draft.
    pub fn with_id(
        id: OrderId,
        draft: OrderDraft,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, InvalidOrder> {
        draft.validate()?;
        Ok(Self {
            id,
            shelter_id: draft.shelter_id,
            item_id: draft.item_id,
            order_quantity: draft.order_quantity,
            current_inventory: draft.current_inventory,
            forecasted_usage: draft.forecasted_usage,
            days_until_stockout: draft.days_until_stockout,
            status: OrderStatus::Pending,
            timestamp,
        })
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn shelter_id(&self) -> &ShelterId {
        &self.shelter_id
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn order_quantity(&self) -> f64 {
        self.order_quantity
    }

    pub fn current_inventory(&self) -> f64 {
        self.current_inventory
    }

    pub fn forecasted_usage(&self) -> f64 {
        self.forecasted_usage
    }

    pub fn days_until_stockout(&self) -> f64 {
        self.days_until_stockout
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft {
            shelter_id: ShelterId::new("shelter-1"),
            item_id: ItemId::new("blankets"),
            order_quantity: 40.0,
            current_inventory: 10.0,
            forecasted_usage: 5.0,
            days_until_stockout: 2.0,
        }
    }

    #[test]
    fn valid_draft_becomes_pending_order() {
        let o = Order::with_id(OrderId::new("o-1"), draft(), Utc::now()).unwrap();
        assert_eq!(o.status(), OrderStatus::Pending);
        assert_eq!(o.order_quantity(), 40.0);
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let bad = OrderDraft {
            order_quantity: -1.0,
            ..draft()
        };
        let err = Order::with_id(OrderId::new("o-1"), bad, Utc::now()).unwrap_err();
        assert_eq!(err.field, "order_quantity");
        assert_eq!(err.value, -1.0);
        assert!(err.to_string().contains("order_quantity = -1"));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let bad = OrderDraft {
            order_quantity: 0.0,
            ..draft()
        };
        assert!(Order::new_pending(bad, Utc::now()).is_err());
    }

    #[test]
    fn non_finite_quantities_are_rejected() {
        let nan_usage = OrderDraft {
            forecasted_usage: f64::NAN,
            ..draft()
        };
        assert_eq!(nan_usage.validate().unwrap_err().field, "forecasted_usage");

        let inf_quantity = OrderDraft {
            order_quantity: f64::INFINITY,
            ..draft()
        };
        assert_eq!(inf_quantity.validate().unwrap_err().field, "order_quantity");

        let negative_days = OrderDraft {
            days_until_stockout: -0.5,
            ..draft()
        };
        assert_eq!(
            negative_days.validate().unwrap_err().field,
            "days_until_stockout"
        );
    }
}
