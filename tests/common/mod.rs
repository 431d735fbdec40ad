//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

const SCHEMA: &str = include_str!("../../migrations/0001_create_points_accounts.sql");

/// Serializes schema setup across test processes
const SCHEMA_LOCK_KEY: i64 = 0x706f_696e_7473;

/// Setup test database - apply the schema
///
/// Rows are not truncated: tests run in parallel and isolate themselves by
/// generating fresh member and account ids.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let setup = format!(
        "BEGIN; SELECT pg_advisory_xact_lock({}); {} COMMIT;",
        SCHEMA_LOCK_KEY, SCHEMA
    );
    pool.execute(setup.as_str())
        .await
        .expect("Failed to apply schema");

    pool
}
