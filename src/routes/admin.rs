use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::Field},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::admin::{
        AdminOrderDetail, AdminOrderList, CustomerList, StatsResponse, UpdateOrderStatusRequest,
        UpdateOrderStatusResponse,
    },
    dto::products::{ProductForm, ProductList, UploadedImage},
    dto::settings::UpdateSettingsRequest,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, StoreSettings},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{admin_service, product_service, settings_service},
    state::AppState,
    upload,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin).put(update_order_status))
        .route("/products", get(list_all_products).post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/settings", get(get_settings_admin).put(update_settings))
        // Product forms carry an image; allow them past the default 2MB cap.
        .layer(DefaultBodyLimit::max(upload::MAX_IMAGE_BYTES + 1024 * 1024))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard totals", body = ApiResponse<StatsResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<StatsResponse>>> {
    let resp = admin_service::get_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Customers with order aggregates", body = ApiResponse<CustomerList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = admin_service::list_customers(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "All orders with customer and product names", body = ApiResponse<AdminOrderList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<AdminOrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order detail with items", body = ApiResponse<AdminOrderDetail>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AdminOrderDetail>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<UpdateOrderStatusResponse>),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<UpdateOrderStatusResponse>>> {
    let resp = admin_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/products",
    responses(
        (status = 200, description = "All products including out of stock", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_all_products(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    responses(
        (status = 200, description = "Product created from multipart form", body = ApiResponse<Product>),
        (status = 400, description = "Missing fields or bad image"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    let form = read_product_form(multipart).await?;
    let resp = product_service::create_product(&state, &user, form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated from multipart form", body = ApiResponse<Product>),
        (status = 400, description = "Missing fields or bad image"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    let form = read_product_form(multipart).await?;
    let resp = product_service::update_product(&state, &user, id, form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses(
        (status = 200, description = "Store settings", body = ApiResponse<StoreSettings>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_settings_admin(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<StoreSettings>>> {
    let resp = settings_service::get_settings_admin(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = ApiResponse<StoreSettings>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> AppResult<Json<ApiResponse<StoreSettings>>> {
    let resp = settings_service::update_settings(&state, &user, payload).await?;
    Ok(Json(resp))
}

async fn field_text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart field: {e}")))
}

/// Collect the product fields out of a multipart form; the image part is
/// buffered and validated later by the upload module.
async fn read_product_form(mut multipart: Multipart) -> AppResult<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {e}")))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };

        match name.as_str() {
            "name" => form.name = Some(field_text(field).await?),
            "description" => form.description = Some(field_text(field).await?),
            "brand" => form.brand = Some(field_text(field).await?),
            "price" => {
                let raw = field_text(field).await?;
                let price = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::BadRequest("price must be an integer".to_string()))?;
                form.price = Some(price);
            }
            "stock" => {
                let raw = field_text(field).await?;
                let stock = raw
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| AppError::BadRequest("stock must be an integer".to_string()))?;
                form.stock = Some(stock);
            }
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid image upload: {e}")))?
                    .to_vec();
                if !data.is_empty() {
                    form.image = Some(UploadedImage { filename, data });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}
