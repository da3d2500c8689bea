// src/api/listings.rs

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::Row;
use utoipa::ToSchema;

use crate::models::{Pagination, Review};
use crate::search::{SearchParams, SearchQuery};
use crate::{db, search, AppState};

#[utoipa::path(
    get,
    path = "/listings",
    tag = "listings",
    params(SearchParams),
    responses(
        (status = 200, description = "Filtered, sorted, paginated listings"),
        (status = 500, description = "Server error")
    )
)]
#[get("/listings")]
pub async fn search_listings(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> impl Responder {
    let query = SearchQuery::from(params.into_inner());

    match search::run_search(&state.pool, &query).await {
        Ok((listings, total)) => HttpResponse::Ok().json(json!({
            "listings": listings,
            "pagination": Pagination::new(query.page, query.limit, total),
        })),
        Err(e) => {
            eprintln!("listing search db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category_id: Option<i32>,
    pub file_url: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn validate_create(payload: &CreateListingRequest) -> Option<&'static str> {
    if payload.title.is_empty() || payload.title.len() > 255 {
        return Some("title must be 1-255 characters");
    }
    if payload.description.is_empty() {
        return Some("description must not be empty");
    }
    if !(0.01..=999_999.0).contains(&payload.price) {
        return Some("price must be between 0.01 and 999999");
    }
    if !payload.file_url.starts_with("http://") && !payload.file_url.starts_with("https://") {
        return Some("fileUrl must be a valid URL");
    }
    if payload.tags.len() > 10 {
        return Some("at most 10 tags");
    }
    None
}

#[post("/listings")]
pub async fn create_listing(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<CreateListingRequest>,
) -> impl Responder {
    let user_id = *user_id;
    let payload = payload.into_inner();

    match db::user_is_creator(&state.pool, user_id).await {
        Ok(Some(true)) => {}
        Ok(_) => {
            return HttpResponse::Forbidden().json(json!({
                "error": "Only creators can create listings"
            }));
        }
        Err(e) => {
            eprintln!("creator check db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    }

    if let Some(reason) = validate_create(&payload) {
        return HttpResponse::BadRequest().json(json!({ "error": reason }));
    }

    let listing_id: i32 = match sqlx::query(
        r#"INSERT INTO listings
               (creator_id, category_id, title, description, price, file_url, file_type, file_size, tags)
           VALUES ($1, $2, $3, $4, $5::numeric, $6, $7, $8, $9)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(payload.category_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(format!("{:.2}", payload.price))
    .bind(&payload.file_url)
    .bind(&payload.file_type)
    .bind(payload.file_size)
    .bind(&payload.tags)
    .fetch_one(&state.pool)
    .await
    {
        Ok(row) => row.get("id"),
        Err(e) => {
            eprintln!("create listing db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match db::get_listing(&state.pool, listing_id).await {
        Ok(Some(listing)) => HttpResponse::Created().json(listing),
        Ok(None) => HttpResponse::InternalServerError().finish(),
        Err(e) => {
            eprintln!("fetch created listing db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Placeholder sample rows; real preview extraction would parse the file.
#[get("/listings/{id}/preview")]
pub async fn listing_preview(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> impl Responder {
    let listing_id = path.into_inner();

    let listing = match db::get_active_listing(&state.pool, listing_id).await {
        Ok(Some(l)) => l,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "error": "Listing not found" }));
        }
        Err(e) => {
            eprintln!("preview db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let sheets = if listing.file_type == "xlsx" {
        Some(vec!["Sheet1", "Summary", "Data"])
    } else {
        None
    };

    HttpResponse::Ok().json(json!({
        "preview": {
            "type": "csv",
            "headers": ["Name", "Category", "Value", "Date"],
            "rows": [
                ["Sample Data 1", "Category A", "100", "2024-01-15"],
                ["Sample Data 2", "Category B", "250", "2024-01-16"],
                ["Sample Data 3", "Category A", "175", "2024-01-17"],
                ["...", "...", "...", "..."],
            ],
            "totalRows": 150,
            "sheets": sheets,
        },
        "fileType": listing.file_type,
        "fileName": format!("{}.{}", listing.title, listing.file_type),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewPageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[get("/listings/{id}/reviews")]
pub async fn listing_reviews(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    params: web::Query<ReviewPageParams>,
) -> impl Responder {
    let listing_id = path.into_inner();
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, search::MAX_LIMIT);
    let offset = (page - 1) * limit;

    let rows = match sqlx::query(
        r#"SELECT r.id, r.transaction_id, r.buyer_id, r.listing_id, r.rating,
                  r.comment, r.created_at, u.username AS buyer_username
           FROM reviews r
           LEFT JOIN users u ON u.id = r.buyer_id
           WHERE r.listing_id = $1
           ORDER BY r.created_at DESC, r.id DESC
           LIMIT $2 OFFSET $3"#,
    )
    .bind(listing_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("listing reviews db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let reviews: Vec<Review> = rows
        .into_iter()
        .map(|r| Review {
            id: r.get("id"),
            transaction_id: r.get("transaction_id"),
            buyer_id: r.get("buyer_id"),
            listing_id: r.get("listing_id"),
            rating: r.get("rating"),
            comment: r.get("comment"),
            created_at: r.get("created_at"),
            buyer_username: r.get("buyer_username"),
        })
        .collect();

    let total: i64 = match sqlx::query("SELECT COUNT(*) AS total FROM reviews WHERE listing_id = $1")
        .bind(listing_id)
        .fetch_one(&state.pool)
        .await
    {
        Ok(row) => row.get("total"),
        Err(e) => {
            eprintln!("review count db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(json!({
        "reviews": reviews,
        "pagination": Pagination::new(page, limit, total),
    }))
}
