#![allow(dead_code)] // not every test binary uses every helper

use std::env;
use std::sync::OnceLock;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};

use spreadmarket::rate_limit::RateLimiter;
use spreadmarket::AppState;

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

fn admin_url_and_db_name(url: &str) -> Option<(String, String)> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let slash = base.rfind('/')?;
    let db_name = &base[slash + 1..];
    if db_name.is_empty() {
        return None;
    }

    let mut admin_url = format!("{}postgres", &base[..slash + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }
    Some((admin_url, db_name.to_string()))
}

/// Recreates the database named by TEST_DATABASE_URL and runs migrations.
/// Returns None (test should skip) when the variable is unset.
pub async fn try_init_test_db() -> Option<TestDb> {
    dotenvy::dotenv().ok();
    let test_url = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping");
            return None;
        }
    };

    let (admin_url, db_name) =
        admin_url_and_db_name(&test_url).expect("invalid TEST_DATABASE_URL format");

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url).await.expect("connect admin db");

    let quoted = format!("\"{}\"", db_name.replace('"', "\"\""));
    let _ = sqlx::query("SELECT pg_advisory_lock(535353)")
        .execute(&admin_pool)
        .await;
    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS {quoted} WITH (FORCE)"))
        .execute(&admin_pool)
        .await;
    sqlx::query(&format!("CREATE DATABASE {quoted}"))
        .execute(&admin_pool)
        .await
        .expect("create test db");
    let _ = sqlx::query("SELECT pg_advisory_unlock(535353)")
        .execute(&admin_pool)
        .await;
    admin_pool.close().await;

    let pool = PgPool::connect(&test_url).await.expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");

    Some(TestDb { pool, _guard: guard })
}

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Static credentials so presigning works without real AWS access (signing is
/// local, no network involved).
pub fn build_state(pool: PgPool) -> AppState {
    let credentials = Credentials::new("test-access-key", "test-secret-key", None, None, "static");
    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .build();

    AppState {
        pool,
        s3_client: S3Client::from_conf(config),
        s3_bucket: "test-bucket".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        stripe_secret_key: "sk_test_unused".to_string(),
        stripe_webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        rate_limiter: RateLimiter::new(),
    }
}

pub async fn insert_user(pool: &PgPool, email: &str, is_creator: bool) -> i32 {
    use sqlx::Row;
    sqlx::query(
        r#"INSERT INTO users (username, email, password_hash, is_creator)
           VALUES ($1, $2, 'test-hash', $3)
           RETURNING id"#,
    )
    .bind(email.split('@').next().unwrap_or("user"))
    .bind(email)
    .bind(is_creator)
    .fetch_one(pool)
    .await
    .expect("insert user")
    .get("id")
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_listing(
    pool: &PgPool,
    creator_id: i32,
    category_id: Option<i32>,
    title: &str,
    price: &str,
    tags: &[&str],
    is_active: bool,
) -> i32 {
    use sqlx::Row;
    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    sqlx::query(
        r#"INSERT INTO listings
               (creator_id, category_id, title, description, price, file_url, file_type, tags, is_active)
           VALUES ($1, $2, $3, $4, $5::numeric, $6, 'xlsx', $7, $8)
           RETURNING id"#,
    )
    .bind(creator_id)
    .bind(category_id)
    .bind(title)
    .bind(format!("{title} description"))
    .bind(price)
    .bind(format!(
        "https://test-bucket.s3.amazonaws.com/uploads/{creator_id}/1700000000000-{}.xlsx",
        title.to_lowercase().replace(' ', "-")
    ))
    .bind(&tags)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .expect("insert listing")
    .get("id")
}
