use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{ProductForm, ProductList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    upload,
};

/// Storefront catalog; products that are out of stock are hidden.
pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let pattern = query
        .q
        .as_ref()
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let filter = r#"
        WHERE stock > 0
          AND ($1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1 OR brand ILIKE $1)
          AND ($2::BIGINT IS NULL OR price >= $2)
          AND ($3::BIGINT IS NULL OR price <= $3)
    "#;

    let select = format!(
        "SELECT * FROM products {filter} ORDER BY {} {} LIMIT $4 OFFSET $5",
        sort_by.as_sql(),
        sort_order.as_sql(),
    );
    let items: Vec<Product> = sqlx::query_as(&select)
        .bind(pattern.as_deref())
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let count = format!("SELECT COUNT(*) FROM products {filter}");
    let total: (i64,) = sqlx::query_as(&count)
        .bind(pattern.as_deref())
        .bind(query.min_price)
        .bind(query.max_price)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    match product {
        Some(p) => Ok(ApiResponse::success("Product", p, None)),
        None => Err(AppError::NotFound),
    }
}

/// Back-office listing; includes out-of-stock products.
pub async fn list_all_products(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let items: Vec<Product> =
        sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&state.pool)
            .await?;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    form: ProductForm,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let (name, brand, price, stock) = match (form.name, form.brand, form.price, form.stock) {
        (Some(name), Some(brand), Some(price), Some(stock)) if !name.trim().is_empty() => {
            (name, brand, price, stock)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Name, price, stock, and brand are required.".to_string(),
            ));
        }
    };

    let image_url = match form.image {
        Some(image) => Some(
            upload::save_image(&state.config.upload_dir, &image.filename, &image.data).await?,
        ),
        None => None,
    };

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products (id, name, description, brand, price, stock, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name.as_str())
    .bind(form.description.as_deref())
    .bind(brand.as_str())
    .bind(price)
    .bind(stock)
    .bind(image_url.as_deref())
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product added successfully",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    form: ProductForm,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let current: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let current = match current {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let (name, brand, price, stock) = match (form.name, form.brand, form.price, form.stock) {
        (Some(name), Some(brand), Some(price), Some(stock)) if !name.trim().is_empty() => {
            (name, brand, price, stock)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Name, price, stock, and brand are required.".to_string(),
            ));
        }
    };

    // A new image replaces the stored file; the old one is cleaned up
    // after the row is updated.
    let mut replaced_image: Option<String> = None;
    let image_url = match form.image {
        Some(image) => {
            replaced_image = current.image_url.clone();
            Some(upload::save_image(&state.config.upload_dir, &image.filename, &image.data).await?)
        }
        None => current.image_url.clone(),
    };

    let product: Product = sqlx::query_as(
        r#"
        UPDATE products
        SET name = $2, description = $3, brand = $4, price = $5, stock = $6, image_url = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name.as_str())
    .bind(form.description.as_deref())
    .bind(brand.as_str())
    .bind(price)
    .bind(stock)
    .bind(image_url.as_deref())
    .fetch_one(&state.pool)
    .await?;

    if let Some(old) = replaced_image {
        upload::remove_image(&state.config.upload_dir, &old).await;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product updated successfully",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let current: Option<(Option<String>,)> =
        sqlx::query_as("SELECT image_url FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    let (image_url,) = match current {
        Some(row) => row,
        None => return Err(AppError::NotFound),
    };

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if let Some(url) = image_url {
        upload::remove_image(&state.config.upload_dir, &url).await;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
