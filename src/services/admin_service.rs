use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::admin::{
        AdminOrderDetail, AdminOrderList, AdminOrderSummary, CustomerList, CustomerSummary,
        StatsResponse, StatusBreakdown, UpdateOrderStatusRequest, UpdateOrderStatusResponse,
    },
    dto::orders::OrderItemDetail,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::ORDER_STATUSES,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Dashboard tiles, recomputed from the source tables on every request.
pub async fn get_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<StatsResponse>> {
    ensure_admin(user)?;

    let total_sales: (i64,) =
        sqlx::query_as("SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders")
            .fetch_one(&state.pool)
            .await?;
    let total_orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    let total_customers: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'user'")
            .fetch_one(&state.pool)
            .await?;
    let total_products: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "Stats",
        StatsResponse {
            total_sales: total_sales.0,
            total_orders: total_orders.0,
            total_customers: total_customers.0,
            total_products: total_products.0,
        },
        Some(Meta::empty()),
    ))
}

#[derive(FromRow)]
struct CustomerRow {
    id: Uuid,
    fname: String,
    lname: String,
    email: String,
    phone: String,
    created_at: DateTime<Utc>,
    total_orders: i64,
    total_spent: i64,
    last_order_date: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct StatusRow {
    user_id: Uuid,
    status: String,
    order_count: i64,
    status_total: i64,
}

pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_admin(user)?;

    let customers: Vec<CustomerRow> = sqlx::query_as(
        r#"
        SELECT u.id, u.fname, u.lname, u.email, u.phone, u.created_at,
               COUNT(DISTINCT o.id) AS total_orders,
               COALESCE(SUM(o.total_amount), 0)::BIGINT AS total_spent,
               MAX(o.created_at) AS last_order_date
        FROM users u
        LEFT JOIN orders o ON o.user_id = u.id
        WHERE u.role = 'user'
        GROUP BY u.id
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let status_rows: Vec<StatusRow> = sqlx::query_as(
        r#"
        SELECT o.user_id, o.status,
               COUNT(*) AS order_count,
               COALESCE(SUM(o.total_amount), 0)::BIGINT AS status_total
        FROM orders o
        GROUP BY o.user_id, o.status
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let mut breakdowns: HashMap<Uuid, BTreeMap<String, StatusBreakdown>> = HashMap::new();
    for row in status_rows {
        breakdowns.entry(row.user_id).or_default().insert(
            row.status,
            StatusBreakdown {
                count: row.order_count,
                total: row.status_total,
            },
        );
    }

    let items = customers
        .into_iter()
        .map(|c| {
            // Every status appears in the breakdown, zeroed when unused.
            let mut status_breakdown = breakdowns.remove(&c.id).unwrap_or_default();
            for status in ORDER_STATUSES {
                status_breakdown
                    .entry(status.to_string())
                    .or_insert_with(StatusBreakdown::default);
            }
            CustomerSummary {
                id: c.id,
                fname: c.fname,
                lname: c.lname,
                email: c.email,
                phone: c.phone,
                created_at: c.created_at,
                total_orders: c.total_orders,
                total_spent: c.total_spent,
                last_order_date: c.last_order_date,
                status_breakdown,
            }
        })
        .collect::<Vec<_>>();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();
    let status = query.status.filter(|s| !s.is_empty());
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let select = format!(
        r#"
        SELECT o.id, o.user_id, o.order_number, o.total_amount, o.status,
               o.payment_method, o.payment_status, o.delivery_address, o.created_at,
               u.email, u.fname, u.lname,
               STRING_AGG(p.name, ', ' ORDER BY p.name) AS product_names
        FROM orders o
        JOIN users u ON u.id = o.user_id
        JOIN order_items oi ON oi.order_id = o.id
        JOIN products p ON p.id = oi.product_id
        WHERE ($1::TEXT IS NULL OR o.status = $1)
        GROUP BY o.id, u.id
        ORDER BY o.created_at {}
        LIMIT $2 OFFSET $3
        "#,
        sort_order.as_sql()
    );

    let items: Vec<AdminOrderSummary> = sqlx::query_as(&select)
        .bind(status.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::TEXT IS NULL OR status = $1)")
            .bind(status.as_deref())
            .fetch_one(&state.pool)
            .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<AdminOrderDetail>> {
    ensure_admin(user)?;

    let summary: Option<AdminOrderSummary> = sqlx::query_as(
        r#"
        SELECT o.id, o.user_id, o.order_number, o.total_amount, o.status,
               o.payment_method, o.payment_status, o.delivery_address, o.created_at,
               u.email, u.fname, u.lname,
               STRING_AGG(p.name, ', ' ORDER BY p.name) AS product_names
        FROM orders o
        JOIN users u ON u.id = o.user_id
        JOIN order_items oi ON oi.order_id = o.id
        JOIN products p ON p.id = oi.product_id
        WHERE o.id = $1
        GROUP BY o.id, u.id
        "#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;
    let summary = match summary {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let items: Vec<OrderItemDetail> = sqlx::query_as(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id,
               p.name AS product_name, p.image_url AS product_image,
               oi.quantity, oi.price, oi.created_at
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = $1
        ORDER BY oi.created_at
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Order found",
        AdminOrderDetail { summary, items },
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<UpdateOrderStatusResponse>> {
    ensure_admin(user)?;
    validate_order_status(&payload.status)?;

    let current: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let (previous_status,) = match current {
        Some(row) => row,
        None => return Err(AppError::NotFound),
    };

    sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(payload.status.as_str())
        .execute(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id, "status": payload.status.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order status updated successfully",
        UpdateOrderStatusResponse {
            status: payload.status,
            previous_status,
        },
        Some(Meta::empty()),
    ))
}

fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid status value. Must be one of: {}",
            ORDER_STATUSES.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_five_order_statuses() {
        for status in ORDER_STATUSES {
            assert!(validate_order_status(status).is_ok(), "{status}");
        }
    }

    #[test]
    fn rejects_unknown_statuses() {
        assert!(validate_order_status("paid").is_err());
        assert!(validate_order_status("").is_err());
        assert!(validate_order_status("Delivered").is_err());
    }
}
