use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppResult, models::StoreSettings, response::ApiResponse,
    services::settings_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings))
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Store settings, created with defaults when absent", body = ApiResponse<StoreSettings>)
    ),
    tag = "Settings"
)]
pub async fn get_settings(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<StoreSettings>>> {
    let resp = settings_service::get_settings(&state).await?;
    Ok(Json(resp))
}
