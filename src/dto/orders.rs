use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Card,
    Gcash,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Gcash => "GCASH",
            PaymentMethod::Cod => "COD",
        }
    }

    /// Cash on delivery stays pending until the courier collects; card and
    /// wallet payments are settled at checkout.
    pub fn initial_payment_status(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "Pending",
            PaymentMethod::Card | PaymentMethod::Gcash => "Paid",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    #[schema(value_type = Option<Object>)]
    pub payment_details: Option<serde_json::Value>,
    pub delivery_address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub order_number: String,
}

/// An order line joined with the product it snapshotted.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct OrderItemDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cod_starts_pending_others_paid() {
        assert_eq!(PaymentMethod::Cod.initial_payment_status(), "Pending");
        assert_eq!(PaymentMethod::Card.initial_payment_status(), "Paid");
        assert_eq!(PaymentMethod::Gcash.initial_payment_status(), "Paid");
    }

    #[test]
    fn deserializes_upper_case_wire_names() {
        let m: PaymentMethod = serde_json::from_str("\"GCASH\"").unwrap();
        assert_eq!(m, PaymentMethod::Gcash);
        assert!(serde_json::from_str::<PaymentMethod>("\"PAYPAL\"").is_err());
    }
}
