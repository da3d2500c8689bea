// src/models.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i32,
    pub creator_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub description: String,
    /// NUMERIC fetched as text, e.g. "19.99".
    pub price: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub total_sales: i32,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub created_at: Option<DateTime<Utc>>,
}

/// Search result row: a listing plus the joined category and creator names.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: String,
    pub file_type: String,
    pub tags: Vec<String>,
    pub total_sales: i32,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub creator_username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Count of active listings in this category.
    pub listing_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i32,
    pub buyer_id: i32,
    pub listing_id: i32,
    pub payment_intent_id: String,
    pub amount: String,
    pub commission: String,
    pub creator_earnings: String,
    pub status: String, // pending | completed
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    pub id: i32,
    pub transaction_id: i32,
    pub user_id: i32,
    pub listing_id: i32,
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i32,
    pub transaction_id: i32,
    pub buyer_id: i32,
    pub listing_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub buyer_username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}
