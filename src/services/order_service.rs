use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutRequest, CheckoutResponse, OrderItemDetail, OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    response::{ApiResponse, Meta},
    state::AppState,
};

const ORDER_NUMBER_ATTEMPTS: usize = 10;

#[derive(Debug, FromRow)]
struct CartCheckoutRow {
    product_id: Uuid,
    quantity: i32,
    price: i64,
    stock: i32,
}

/// Convert the caller's cart into an order, atomically: read the cart under
/// product row locks, snapshot prices into order items, decrement stock and
/// clear the cart. Any failure rolls the whole transaction back.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let CheckoutRequest {
        payment_method,
        payment_details,
        delivery_address,
    } = payload;

    if delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Delivery address is required.".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    // Lock the product rows so the stock check below cannot race a
    // concurrent checkout into overselling.
    let rows: Vec<CartCheckoutRow> = sqlx::query_as(
        r#"
        SELECT c.product_id, c.quantity, p.price, p.stock
        FROM cart_items c
        JOIN products p ON p.id = c.product_id
        WHERE c.user_id = $1
        ORDER BY c.created_at
        FOR UPDATE OF p
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&mut *tx)
    .await?;

    if rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }

    let mut total_amount: i64 = 0;
    for row in &rows {
        if row.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".to_string()));
        }
        if row.stock < row.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                row.product_id
            )));
        }
        total_amount += row.price * i64::from(row.quantity);
    }

    let order_number = generate_order_number(&mut tx).await?;
    let order_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO orders
            (id, user_id, order_number, total_amount, status,
             payment_method, payment_status, payment_details, delivery_address)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8)
        "#,
    )
    .bind(order_id)
    .bind(user.user_id)
    .bind(order_number.as_str())
    .bind(total_amount)
    .bind(payment_method.as_str())
    .bind(payment_method.initial_payment_status())
    .bind(payment_details)
    .bind(delivery_address.as_str())
    .execute(&mut *tx)
    .await?;

    for row in &rows {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(row.product_id)
        .bind(row.quantity)
        .bind(row.price)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2")
            .bind(row.quantity)
            .bind(row.product_id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id, "order_number": order_number.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created successfully",
        CheckoutResponse {
            order_id,
            order_number,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(&state.pool)
            .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order = fetch_items(state, &order_ids).await?;

    let total = orders.len() as i64;
    let items = orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect();

    let meta = Meta::new(1, total, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND id = $2")
            .bind(user.user_id)
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut items_by_order = fetch_items(state, &[order.id]).await?;
    let items = items_by_order.remove(&order.id).unwrap_or_default();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

async fn fetch_items(
    state: &AppState,
    order_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<OrderItemDetail>>> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let details: Vec<OrderItemDetail> = sqlx::query_as(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id,
               p.name AS product_name, p.image_url AS product_image,
               oi.quantity, oi.price, oi.created_at
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ANY($1)
        ORDER BY oi.created_at
        "#,
    )
    .bind(order_ids)
    .fetch_all(&state.pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
    for detail in details {
        grouped.entry(detail.order_id).or_default().push(detail);
    }
    Ok(grouped)
}

/// `SH` + six time-derived digits + three random digits, the storefront's
/// customer-facing order reference.
fn build_order_number(now_millis: i64, random: u16) -> String {
    format!(
        "SH{:06}{:03}",
        now_millis.rem_euclid(1_000_000),
        random % 1000
    )
}

/// Generation is best-effort: retry on collision a bounded number of times,
/// with the UNIQUE constraint on orders.order_number as the backstop.
async fn generate_order_number(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> AppResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let random: u16 = rand::rng().random_range(0..1000);
        let candidate = build_order_number(Utc::now().timestamp_millis(), random);

        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM orders WHERE order_number = $1")
                .bind(candidate.as_str())
                .fetch_optional(&mut **tx)
                .await?;
        if exists.is_none() {
            return Ok(candidate);
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "Could not generate unique order number"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_is_sh_plus_nine_digits() {
        let number = build_order_number(1_726_000_123_456, 7);
        assert_eq!(number.len(), 11);
        assert!(number.starts_with("SH"));
        assert!(number[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn order_number_zero_pads_both_components() {
        assert_eq!(build_order_number(42, 7), "SH000042007");
    }

    #[test]
    fn order_number_wraps_the_time_component() {
        let number = build_order_number(i64::MAX, 999);
        assert!(number.starts_with("SH"));
        assert_eq!(number.len(), 11);
    }
}
