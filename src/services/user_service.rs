use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::users::{ChangePasswordRequest, OrderStats, UpdateProfileRequest, UserProfile},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner},
    models::User,
    response::{ApiResponse, Meta},
    services::auth_service::{hash_password, verify_password},
    state::AppState,
};

pub async fn get_profile(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_owner(user, user_id)?;

    let record: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let record = match record {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let order_stats: OrderStats = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_orders,
               COALESCE(SUM(total_amount), 0)::BIGINT AS total_spent,
               MAX(created_at) AS last_order_date
        FROM orders
        WHERE user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        UserProfile {
            user: record,
            order_stats,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_owner(user, user_id)?;

    let current: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let current = match current {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let UpdateProfileRequest {
        fname,
        lname,
        phone,
        email,
    } = payload;

    if fname.trim().is_empty() || lname.trim().is_empty() || phone.trim().is_empty() {
        return Err(AppError::BadRequest(
            "First name, last name, and phone are required.".to_string(),
        ));
    }

    // Keep the current email unless the request changes it.
    let new_email = email.unwrap_or_else(|| current.email.clone());
    if new_email != current.email {
        let taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id != $2")
                .bind(new_email.as_str())
                .bind(user.user_id)
                .fetch_optional(&state.pool)
                .await?;
        if taken.is_some() {
            return Err(AppError::BadRequest("Email is already in use.".to_string()));
        }
    }

    let updated: User = sqlx::query_as(
        r#"
        UPDATE users
        SET fname = $2, lname = $3, email = $4, phone = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(fname.as_str())
    .bind(lname.as_str())
    .bind(new_email.as_str())
    .bind(phone.as_str())
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "profile_update",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Profile updated successfully",
        updated,
        Some(Meta::empty()),
    ))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_owner(user, user_id)?;

    if payload.new_password.is_empty() {
        return Err(AppError::BadRequest("New password is required.".to_string()));
    }

    let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let (password_hash,) = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    if !verify_password(&payload.current_password, &password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect.".into(),
        ));
    }

    let new_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user.user_id)
        .bind(new_hash)
        .execute(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "password_change",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Password updated successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
