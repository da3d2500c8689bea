// src/billing.rs

use std::fmt;

use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};

use crate::s3_utils::{self, DOWNLOAD_URL_TTL_SECS};
use crate::stripe::PaymentIntentObject;
use crate::AppState;

const PLATFORM_FEE_PERCENT: f64 = 0.10;

#[derive(Debug, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub creator_earnings_cents: i64,
}

/// 10% platform commission, computed in minor units.
/// For price "9.99": amount 999, fee round(99.9) = 100, earnings 899.
pub fn split_commission(price: &str) -> Option<FeeBreakdown> {
    let price: f64 = price.trim().parse().ok()?;
    if !price.is_finite() || price <= 0.0 {
        return None;
    }

    let amount_cents = (price * 100.0).round() as i64;
    let platform_fee_cents = (price * PLATFORM_FEE_PERCENT * 100.0).round() as i64;

    Some(FeeBreakdown {
        amount_cents,
        platform_fee_cents,
        creator_earnings_cents: amount_cents - platform_fee_cents,
    })
}

/// Minor units back to a decimal string the NUMERIC columns accept.
pub fn cents_to_decimal(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[derive(Debug)]
pub enum FulfillError {
    MissingMetadata(&'static str),
    ListingGone(i32),
    Db(sqlx::Error),
    Presign(String),
}

impl fmt::Display for FulfillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FulfillError::MissingMetadata(key) => write!(f, "missing metadata key {key}"),
            FulfillError::ListingGone(id) => write!(f, "listing {id} no longer exists"),
            FulfillError::Db(e) => write!(f, "db error: {e}"),
            FulfillError::Presign(e) => write!(f, "presign error: {e}"),
        }
    }
}

impl From<sqlx::Error> for FulfillError {
    fn from(value: sqlx::Error) -> Self {
        Self::Db(value)
    }
}

#[derive(Debug)]
pub enum FulfillOutcome {
    /// Event id already consumed; redelivery, nothing written.
    AlreadyProcessed,
    Fulfilled { transaction_id: i32, download_id: i32 },
}

fn metadata_i32(
    object: &PaymentIntentObject,
    key: &'static str,
) -> Result<i32, FulfillError> {
    object
        .metadata
        .get(key)
        .and_then(|v| v.parse().ok())
        .ok_or(FulfillError::MissingMetadata(key))
}

fn metadata_i64(
    object: &PaymentIntentObject,
    key: &'static str,
) -> Result<i64, FulfillError> {
    object
        .metadata
        .get(key)
        .and_then(|v| v.parse().ok())
        .ok_or(FulfillError::MissingMetadata(key))
}

/// Applies a confirmed payment: one completed transaction, one sales
/// increment, one download grant.
///
/// The event id is consumed against `webhook_events` first, so a redelivered
/// event is a no-op, and the three writes share one database transaction, so
/// a crash mid-sequence leaves nothing half-applied.
pub async fn fulfill_payment(
    state: &AppState,
    event_id: &str,
    object: &PaymentIntentObject,
) -> Result<FulfillOutcome, FulfillError> {
    let listing_id = metadata_i32(object, "listingId")?;
    let buyer_id = metadata_i32(object, "buyerId")?;
    let platform_fee_cents = metadata_i64(object, "platformFee")?;
    let creator_earnings_cents = metadata_i64(object, "creatorEarnings")?;

    let file_url = listing_file_url(&state.pool, listing_id)
        .await?
        .ok_or(FulfillError::ListingGone(listing_id))?;

    // Pure signing, no remote call, safe to do before opening the tx.
    let storage_key = s3_utils::storage_key_from_url(&file_url, &state.s3_bucket);
    let download_url = s3_utils::presign_download(
        &state.s3_client,
        &state.s3_bucket,
        &storage_key,
        DOWNLOAD_URL_TTL_SECS,
    )
    .await
    .map_err(|e| FulfillError::Presign(e.to_string()))?;
    let expires_at = Utc::now() + Duration::seconds(DOWNLOAD_URL_TTL_SECS as i64);

    let mut tx = state.pool.begin().await?;

    let consumed = sqlx::query(
        r#"INSERT INTO webhook_events (event_id)
           VALUES ($1)
           ON CONFLICT (event_id) DO NOTHING"#,
    )
    .bind(event_id)
    .execute(&mut *tx)
    .await?;

    if consumed.rows_affected() == 0 {
        return Ok(FulfillOutcome::AlreadyProcessed);
    }

    let transaction_id: i32 = sqlx::query(
        r#"INSERT INTO transactions
               (buyer_id, listing_id, payment_intent_id, amount, commission, creator_earnings, status)
           VALUES ($1, $2, $3, $4::numeric, $5::numeric, $6::numeric, 'completed')
           RETURNING id"#,
    )
    .bind(buyer_id)
    .bind(listing_id)
    .bind(&object.id)
    .bind(cents_to_decimal(object.amount))
    .bind(cents_to_decimal(platform_fee_cents))
    .bind(cents_to_decimal(creator_earnings_cents))
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    sqlx::query("UPDATE listings SET total_sales = total_sales + 1 WHERE id = $1")
        .bind(listing_id)
        .execute(&mut *tx)
        .await?;

    let download_id: i32 = sqlx::query(
        r#"INSERT INTO downloads (transaction_id, user_id, listing_id, download_url, expires_at)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id"#,
    )
    .bind(transaction_id)
    .bind(buyer_id)
    .bind(listing_id)
    .bind(&download_url)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    tx.commit().await?;

    Ok(FulfillOutcome::Fulfilled { transaction_id, download_id })
}

async fn listing_file_url(pool: &PgPool, listing_id: i32) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query("SELECT file_url FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("file_url")))
}
