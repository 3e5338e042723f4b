use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::users::{ChangePasswordRequest, UpdateProfileRequest, UserProfile},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(get_profile).put(update_profile))
        .route("/{user_id}/password", put(change_password))
}

#[utoipa::path(
    get,
    path = "/api/profile/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile with order statistics", body = ApiResponse<UserProfile>),
        (status = 403, description = "Not the resource owner"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::get_profile(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/profile/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<User>),
        (status = 400, description = "Missing fields or email taken"),
        (status = 403, description = "Not the resource owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_profile(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/profile/{user_id}/password",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Current password is incorrect"),
        (status = 403, description = "Not the resource owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = user_service::change_password(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}
