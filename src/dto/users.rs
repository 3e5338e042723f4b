use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::User;

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_spent: i64,
    pub last_order_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub user: User,
    pub order_stats: OrderStats,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub fname: String,
    pub lname: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
