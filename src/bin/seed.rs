use sneakerhub_api::{
    config::AppConfig, db::create_pool, services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(
        &pool,
        "Admin",
        "User",
        "admin@sneakerhub.com",
        "1234567890",
        "Adminsneakerhub123!",
        "admin",
    )
    .await?;
    ensure_settings(&pool).await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    fname: &str,
    lname: &str,
    email: &str,
    phone: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, fname, lname, email, phone, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(fname)
    .bind(lname)
    .bind(email)
    .bind(phone)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If the user already exists, fetch the id.
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_settings(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM settings LIMIT 1")
        .fetch_optional(pool)
        .await?;
    if existing.is_none() {
        sqlx::query(
            r#"
            INSERT INTO settings (id, store_name, store_email, contact_number, address)
            VALUES ($1, 'Sneakerhub', 'contact@sneakerhub.com', '+1234567890', '123 Sneaker Street')
            "#,
        )
        .bind(Uuid::new_v4())
        .execute(pool)
        .await?;
        println!("Default settings created");
    }
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Air Court Classic", "Retro low-top with cushioned sole", "Nike", 799900, 25),
        ("Runner Boost 3", "Lightweight daily trainer", "Adidas", 899900, 40),
        ("Suede Heritage", "Classic suede skate shoe", "Puma", 549900, 30),
        ("Chuck High Canvas", "High-top canvas staple", "Converse", 459900, 50),
    ];

    for (name, desc, brand, price, stock) in products {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, brand, price, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(brand)
        .bind(price as i64)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
