use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::settings::UpdateSettingsRequest,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::StoreSettings,
    response::{ApiResponse, Meta},
    state::AppState,
};

const DEFAULT_STORE_NAME: &str = "Sneakerhub";
const DEFAULT_STORE_EMAIL: &str = "contact@sneakerhub.com";
const DEFAULT_CONTACT_NUMBER: &str = "+1234567890";
const DEFAULT_ADDRESS: &str = "123 Sneaker Street";

/// The settings table holds a single row, created with defaults the first
/// time anyone asks for it.
async fn fetch_or_init(pool: &DbPool) -> AppResult<StoreSettings> {
    let existing: Option<StoreSettings> =
        sqlx::query_as("SELECT * FROM settings ORDER BY created_at DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;
    if let Some(settings) = existing {
        return Ok(settings);
    }

    let created: StoreSettings = sqlx::query_as(
        r#"
        INSERT INTO settings (id, store_name, store_email, contact_number, address)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(DEFAULT_STORE_NAME)
    .bind(DEFAULT_STORE_EMAIL)
    .bind(DEFAULT_CONTACT_NUMBER)
    .bind(DEFAULT_ADDRESS)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

pub async fn get_settings(state: &AppState) -> AppResult<ApiResponse<StoreSettings>> {
    let settings = fetch_or_init(&state.pool).await?;
    Ok(ApiResponse::success("Settings", settings, Some(Meta::empty())))
}

pub async fn get_settings_admin(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<StoreSettings>> {
    ensure_admin(user)?;
    get_settings(state).await
}

pub async fn update_settings(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateSettingsRequest,
) -> AppResult<ApiResponse<StoreSettings>> {
    ensure_admin(user)?;

    let current: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM settings ORDER BY created_at DESC LIMIT 1")
            .fetch_optional(&state.pool)
            .await?;

    let settings: StoreSettings = match current {
        Some((id,)) => {
            sqlx::query_as(
                r#"
                UPDATE settings
                SET store_name = $2, store_email = $3, contact_number = $4,
                    address = $5, updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(payload.store_name.as_str())
            .bind(payload.store_email.as_deref())
            .bind(payload.contact_number.as_deref())
            .bind(payload.address.as_deref())
            .fetch_one(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                INSERT INTO settings (id, store_name, store_email, contact_number, address)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(payload.store_name.as_str())
            .bind(payload.store_email.as_deref())
            .bind(payload.contact_number.as_deref())
            .bind(payload.address.as_deref())
            .fetch_one(&state.pool)
            .await?
        }
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "settings_update",
        Some("settings"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Settings updated successfully",
        settings,
        Some(Meta::empty()),
    ))
}
