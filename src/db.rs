// rental_backend/src/db.rs
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::fairing::AdHoc;

// an R2D2 connection pool
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Initialize the database pool.
pub fn init_pool(database_url: &str, max_size: u32) -> Result<PgPool, r2d2::PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder().max_size(max_size).build(manager)
}

/// Applies every embedded migration that has not run yet.
pub fn run_migrations(pool: &PgPool) -> anyhow::Result<usize> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))?;
    Ok(applied.len())
}

// Fairing that brings the schema up to date before the server starts listening
pub fn stage(pool: PgPool) -> AdHoc {
    AdHoc::try_on_ignite("Diesel PostgreSQL Migrations", |rocket| async move {
        let outcome = rocket::tokio::task::spawn_blocking(move || run_migrations(&pool)).await;
        match outcome {
            Ok(Ok(applied)) => {
                tracing::info!(applied, "database migrations complete");
                Ok(rocket)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "database migrations failed");
                Err(rocket)
            }
            Err(e) => {
                tracing::error!(error = %e, "migration task panicked");
                Err(rocket)
            }
        }
    })
}
