// src/db.rs

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    error::AppError,
    models::{
        role::ADMIN_ROLE,
        scope::{self, Scope},
    },
    utils::hash::hash_password,
};

const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Default accounts created on first start: (username, password, role).
pub const DEFAULT_USERS: [(&str, &str, &str); 2] = [
    ("admin", "admin", ADMIN_ROLE),
    ("user", "user", "user"),
];

/// Builds the pool options shared by the server and the tests.
pub fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(3))
}

/// Connects to the database, retrying while it comes up
/// (the compose `db` service usually starts after the app container).
pub async fn connect_with_retry(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match pool_options().connect(database_url).await {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count >= MAX_CONNECT_ATTEMPTS {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        retry_count,
                        e
                    );
                    return Err(e);
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

/// Applies the embedded migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Round-trips a trivial query.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Creates the default roles and, when `with_users` is set, the default
/// accounts. Existing rows are left untouched.
pub async fn seed_defaults(pool: &PgPool, with_users: bool) -> Result<(), AppError> {
    let roles = [
        (ADMIN_ROLE, scope::join(&Scope::ALL)),
        ("user", scope::join(&[Scope::QuestionsRead])),
    ];

    for (name, permissions) in roles {
        let inserted = sqlx::query(
            "INSERT INTO roles (name, permissions) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(&permissions)
        .execute(pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::info!("Seeded role '{}' with [{}]", name, permissions);
        }
    }

    if !with_users {
        return Ok(());
    }

    for (username, password, role) in DEFAULT_USERS {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;

        if exists.is_some() {
            continue;
        }

        let hashed_password = hash_password(password)?;
        sqlx::query(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) ON CONFLICT (username) DO NOTHING",
        )
        .bind(username)
        .bind(hashed_password)
        .bind(role)
        .execute(pool)
        .await?;

        tracing::warn!(
            "Seeded default account '{}' with its well-known password; change it before exposing the service",
            username
        );
    }

    Ok(())
}
