use crate::auth::handlers::{NewUser, insert_user};
use crate::config::Config;
use crate::model::role::Role;
use anyhow::{Context, Result, anyhow};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use tracing::info;

/// Connects to MySQL and brings the schema up to date.
pub async fn init_db(config: &Config) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    info!(max_connections = config.db_max_connections, "Database ready");
    Ok(pool)
}

/// Creates the configured admin account unless an admin already exists.
pub async fn seed_admin(pool: &MySqlPool, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let admins = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = ?")
        .bind(Role::Admin.id())
        .fetch_one(pool)
        .await
        .context("Failed to count admins")?;
    if admins > 0 {
        return Ok(());
    }

    let admin = NewUser::validate("Administrator", email, "", password, Role::Admin)
        .map_err(|e| anyhow!("Invalid ADMIN_EMAIL/ADMIN_PASSWORD: {e}"))?;
    let id = insert_user(pool, admin)
        .await
        .map_err(|e| anyhow!("Failed to seed admin: {e}"))?;

    info!(user_id = id, "Seeded admin account");
    Ok(())
}
