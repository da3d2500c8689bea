// src/api/reviews.rs

use actix_web::{post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::Row;
use utoipa::ToSchema;

use crate::models::Review;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub transaction_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
}

/// One review per completed purchase. After insertion the listing's
/// average_rating and total_reviews are recomputed from all of its reviews
/// (full recompute, O(reviews); volume is expected to stay small).
#[post("/reviews")]
pub async fn create_review(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<CreateReviewRequest>,
) -> impl Responder {
    let buyer_id = *user_id;
    let payload = payload.into_inner();

    if !(1..=5).contains(&payload.rating) {
        return HttpResponse::BadRequest().json(json!({
            "error": "rating must be an integer between 1 and 5"
        }));
    }

    let tx_row = match sqlx::query(
        r#"SELECT id, listing_id FROM transactions
           WHERE id = $1 AND buyer_id = $2 AND status = 'completed'"#,
    )
    .bind(payload.transaction_id)
    .bind(buyer_id)
    .fetch_optional(&state.pool)
    .await
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("review tx lookup db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let Some(tx_row) = tx_row else {
        return HttpResponse::NotFound().json(json!({
            "error": "Transaction not found or you cannot review this purchase"
        }));
    };
    let listing_id: i32 = tx_row.get("listing_id");

    let already = match sqlx::query("SELECT 1 AS one FROM reviews WHERE transaction_id = $1")
        .bind(payload.transaction_id)
        .fetch_optional(&state.pool)
        .await
    {
        Ok(r) => r.is_some(),
        Err(e) => {
            eprintln!("review existence db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if already {
        return HttpResponse::BadRequest().json(json!({
            "error": "You have already reviewed this purchase"
        }));
    }

    // Insert and recompute the listing aggregates in one database transaction.
    let mut tx = match state.pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            eprintln!("review begin db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let review_id: i32 = match sqlx::query(
        r#"INSERT INTO reviews (transaction_id, buyer_id, listing_id, rating, comment)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id"#,
    )
    .bind(payload.transaction_id)
    .bind(buyer_id)
    .bind(listing_id)
    .bind(payload.rating)
    .bind(payload.comment.as_deref())
    .fetch_one(&mut *tx)
    .await
    {
        Ok(row) => row.get("id"),
        Err(e) => {
            // Unique constraint on transaction_id closes the check-then-insert race.
            eprintln!("review insert db error: {e}");
            return HttpResponse::BadRequest().json(json!({
                "error": "You have already reviewed this purchase"
            }));
        }
    };

    if let Err(e) = sqlx::query(
        r#"UPDATE listings SET
               average_rating = (SELECT AVG(rating)::float8 FROM reviews WHERE listing_id = $1),
               total_reviews = (SELECT COUNT(*) FROM reviews WHERE listing_id = $1)
           WHERE id = $1"#,
    )
    .bind(listing_id)
    .execute(&mut *tx)
    .await
    {
        eprintln!("rating recompute db error: {e}");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = tx.commit().await {
        eprintln!("review commit db error: {e}");
        return HttpResponse::InternalServerError().finish();
    }

    let row = match sqlx::query(
        r#"SELECT r.id, r.transaction_id, r.buyer_id, r.listing_id, r.rating,
                  r.comment, r.created_at, u.username AS buyer_username
           FROM reviews r
           LEFT JOIN users u ON u.id = r.buyer_id
           WHERE r.id = $1"#,
    )
    .bind(review_id)
    .fetch_one(&state.pool)
    .await
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("review fetch db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Created().json(Review {
        id: row.get("id"),
        transaction_id: row.get("transaction_id"),
        buyer_id: row.get("buyer_id"),
        listing_id: row.get("listing_id"),
        rating: row.get("rating"),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
        buyer_username: row.get("buyer_username"),
    })
}
