// src/api/dashboard.rs

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::Row;

use crate::models::Listing;
use crate::AppState;

/// Caller's listings plus aggregate stats: listing count, summed completed
/// earnings, total sales, review-count-weighted average rating.
#[get("/dashboard")]
pub async fn dashboard(state: web::Data<AppState>, user_id: web::ReqData<i32>) -> impl Responder {
    let user_id = *user_id;

    let rows = match sqlx::query(
        r#"SELECT id, creator_id, category_id, title, description,
                  price::text AS price, file_url, file_type, file_size, tags,
                  is_active, total_sales, average_rating, total_reviews, created_at
           FROM listings
           WHERE creator_id = $1
           ORDER BY created_at DESC, id DESC"#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("dashboard listings db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let listings: Vec<Listing> = rows
        .into_iter()
        .map(|r| Listing {
            id: r.get("id"),
            creator_id: r.get("creator_id"),
            category_id: r.get("category_id"),
            title: r.get("title"),
            description: r.get("description"),
            price: r.get("price"),
            file_url: r.get("file_url"),
            file_type: r.get("file_type"),
            file_size: r.get("file_size"),
            tags: r.get("tags"),
            is_active: r.get("is_active"),
            total_sales: r.get("total_sales"),
            average_rating: r.get("average_rating"),
            total_reviews: r.get("total_reviews"),
            created_at: r.get("created_at"),
        })
        .collect();

    let total_earnings: f64 = match sqlx::query(
        r#"SELECT COALESCE(SUM(t.creator_earnings), 0)::float8 AS total
           FROM transactions t
           JOIN listings l ON l.id = t.listing_id
           WHERE l.creator_id = $1 AND t.status = 'completed'"#,
    )
    .bind(user_id)
    .fetch_one(&state.pool)
    .await
    {
        Ok(row) => row.get("total"),
        Err(e) => {
            eprintln!("dashboard earnings db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let total_listings = listings.len();
    let total_sales: i64 = listings.iter().map(|l| l.total_sales as i64).sum();

    let ratings_sum: f64 = listings
        .iter()
        .map(|l| l.average_rating * l.total_reviews as f64)
        .sum();
    let total_reviews: i64 = listings.iter().map(|l| l.total_reviews as i64).sum();
    let average_rating = if total_reviews > 0 {
        ratings_sum / total_reviews as f64
    } else {
        0.0
    };

    HttpResponse::Ok().json(json!({
        "listings": listings,
        "stats": {
            "totalListings": total_listings,
            "totalEarnings": (total_earnings * 100.0).round() / 100.0,
            "totalSales": total_sales,
            "averageRating": (average_rating * 10.0).round() / 10.0,
        },
    }))
}
