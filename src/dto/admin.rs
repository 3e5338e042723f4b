use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_sales: i64,
    pub total_orders: i64,
    pub total_customers: i64,
    pub total_products: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StatusBreakdown {
    pub count: i64,
    pub total: i64,
}

/// Customer row for the back office, aggregated over the customer's orders.
#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub total_orders: i64,
    pub total_spent: i64,
    pub last_order_date: Option<DateTime<Utc>>,
    pub status_breakdown: BTreeMap<String, StatusBreakdown>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<CustomerSummary>,
}

/// Order header joined with customer identity and the ordered product names,
/// as rendered in the back-office order table.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct AdminOrderSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub total_amount: i64,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub delivery_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub fname: String,
    pub lname: String,
    pub product_names: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderList {
    pub items: Vec<AdminOrderSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderDetail {
    pub summary: AdminOrderSummary,
    pub items: Vec<crate::dto::orders::OrderItemDetail>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateOrderStatusResponse {
    pub status: String,
    pub previous_status: String,
}
