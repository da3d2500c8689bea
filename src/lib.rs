pub mod api;
pub mod billing;
pub mod db;
pub mod docs;
pub mod models;
pub mod rate_limit;
pub mod s3_utils;
pub mod search;
pub mod security;
pub mod stripe;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub s3_client: S3Client,
    pub s3_bucket: String,
    pub jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub rate_limiter: RateLimiter,
}
