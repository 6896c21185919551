//! Order entity and its create input

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::occ::{Version, Versioned};
use crate::store::RecordId;

/// Largest amount a single order may carry
pub const MAX_ORDER_AMOUNT_CENTS: i64 = 100_000;

/// A stored order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: RecordId,
    pub user_id: RecordId,
    pub amount_cents: i64,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for Order {
    const TABLE: &'static str = "orders";

    fn id(&self) -> RecordId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// Columns written when an order is created
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewOrder {
    pub user_id: RecordId,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/v1/users/:id/orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateInput {
    pub amount_cents: i64,
}

impl OrderCreateInput {
    /// Returns the reason the input is rejected
    pub fn validate(&self) -> Result<(), String> {
        if (1..=MAX_ORDER_AMOUNT_CENTS).contains(&self.amount_cents) {
            Ok(())
        } else {
            Err(format!(
                "amountCents must be between 1 and {}, got {}",
                MAX_ORDER_AMOUNT_CENTS, self.amount_cents
            ))
        }
    }
}
