use sneakerhub_api::{
    config::AppConfig,
    db::create_pool,
    dto::admin::UpdateOrderStatusRequest,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    dto::orders::{CheckoutRequest, PaymentMethod},
    error::AppError,
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    services::{admin_service, cart_service, order_service, user_service},
    state::AppState,
};
use uuid::Uuid;

// Integration flow: customer fills a cart and checks out; stock, totals and
// the admin back office are verified along the way.
#[tokio::test]
async fn storefront_checkout_and_admin_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "user@example.com").await?;
    let other_id = create_user(&state, "user", "other@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;

    // Spec scenario: product A (stock 5, price 100), product B (stock 1, price 50).
    let product_a = create_product(&state, "Air Court Classic", 100, 5).await?;
    let product_b = create_product(&state, "Suede Heritage", 50, 1).await?;

    let customer = AuthUser {
        user_id,
        role: "user".into(),
    };
    let other = AuthUser {
        user_id: other_id,
        role: "user".into(),
    };
    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Ownership guard: a token for one user cannot read another's profile.
    let forbidden = user_service::get_profile(&state, &customer, other_id).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    // Adding beyond available stock is rejected.
    let too_many = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_b,
            quantity: 2,
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));

    // A repeated add merges into one line: 1 + 1 = 2 of product A.
    for _ in 0..2 {
        cart_service::add_to_cart(
            &state,
            &customer,
            AddToCartRequest {
                product_id: product_a,
                quantity: 1,
            },
        )
        .await?;
    }
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_b,
            quantity: 1,
        },
    )
    .await?;

    let cart = cart_service::list_cart(&state, &customer).await?;
    let cart = cart.data.expect("cart data");
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total, 250);

    // Checkout with an empty cart writes nothing.
    let empty = order_service::checkout(
        &state,
        &other,
        CheckoutRequest {
            payment_method: PaymentMethod::Cod,
            payment_details: None,
            delivery_address: "Nowhere".into(),
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));
    let other_orders: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(other_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(other_orders.0, 0);

    // COD checkout: total 250, payment pending, stock decremented, cart empty.
    let checkout = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Cod,
            payment_details: Some(serde_json::json!({ "note": "ring the bell" })),
            delivery_address: "123 Sneaker Street".into(),
        },
    )
    .await?;
    let checkout = checkout.data.expect("checkout data");

    assert_eq!(checkout.order_number.len(), 11);
    assert!(checkout.order_number.starts_with("SH"));
    assert!(
        checkout.order_number[2..].chars().all(|c| c.is_ascii_digit()),
        "unexpected order number {}",
        checkout.order_number
    );

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(checkout.order_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(order.total_amount, 250);
    assert_eq!(order.status, "pending");
    assert_eq!(order.payment_method, "COD");
    assert_eq!(order.payment_status, "Pending");

    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1")
            .bind(checkout.order_id)
            .fetch_all(&state.pool)
            .await?;
    assert_eq!(items.len(), 2);
    let item_total: i64 = items
        .iter()
        .map(|i| i.price * i64::from(i.quantity))
        .sum();
    assert_eq!(item_total, order.total_amount);

    assert_eq!(fetch_stock(&state, product_a).await?, 3);
    assert_eq!(fetch_stock(&state, product_b).await?, 0);

    let cart_after = cart_service::list_cart(&state, &customer).await?;
    assert!(cart_after.data.expect("cart data").items.is_empty());

    // The caller sees the order in their history.
    let my_orders = order_service::list_my_orders(&state, &customer).await?;
    let my_orders = my_orders.data.expect("order list");
    assert_eq!(my_orders.items.len(), 1);
    assert_eq!(my_orders.items[0].items.len(), 2);

    // Card payments settle at checkout.
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_a,
            quantity: 1,
        },
    )
    .await?;
    let card_checkout = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Card,
            payment_details: Some(serde_json::json!({ "card_last4": "4242" })),
            delivery_address: "123 Sneaker Street".into(),
        },
    )
    .await?;
    let card_checkout = card_checkout.data.expect("checkout data");
    let card_order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(card_checkout.order_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(card_order.payment_status, "Paid");

    // Back office: dashboard totals and a status update.
    let stats = admin_service::get_stats(&state, &admin).await?;
    let stats = stats.data.expect("stats");
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_sales, 350);
    assert_eq!(stats.total_customers, 2);
    assert_eq!(stats.total_products, 2);

    let plain_user_stats = admin_service::get_stats(&state, &customer).await;
    assert!(matches!(plain_user_stats, Err(AppError::Forbidden)));

    let updated = admin_service::update_order_status(
        &state,
        &admin,
        checkout.order_id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?;
    let updated = updated.data.expect("status data");
    assert_eq!(updated.status, "shipped");
    assert_eq!(updated.previous_status, "pending");

    let invalid = admin_service::update_order_status(
        &state,
        &admin,
        checkout.order_id,
        UpdateOrderStatusRequest {
            status: "paid".into(),
        },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    // Setting a line to zero removes it.
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_a,
            quantity: 1,
        },
    )
    .await?;
    cart_service::update_cart_item(
        &state,
        &customer,
        product_a,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await?;
    let cart_final = cart_service::list_cart(&state, &customer).await?;
    assert!(cart_final.data.expect("cart data").items.is_empty());

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Clean tables between runs.
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, cart_items, audit_logs, products, settings, users CASCADE",
    )
    .execute(&pool)
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: "test-secret".to_string(),
        upload_dir: std::env::temp_dir()
            .join("sneakerhub-test-uploads")
            .to_string_lossy()
            .into_owned(),
    };

    Ok(AppState { pool, config })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, fname, lname, email, phone, password_hash, role)
        VALUES ($1, 'Test', 'User', $2, '0000000000', 'dummy', $3)
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(role)
    .execute(&state.pool)
    .await?;
    Ok(id)
}

async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products (id, name, description, brand, price, stock)
        VALUES ($1, $2, 'A sneaker for testing', 'TestBrand', $3, $4)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(price)
    .bind(stock)
    .execute(&state.pool)
    .await?;
    Ok(id)
}

async fn fetch_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}
