// src/db.rs

use sqlx::{PgPool, Row};

use crate::models::{Category, Listing};

fn listing_from_row(r: &sqlx::postgres::PgRow) -> Listing {
    Listing {
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
    }
}

const LISTING_COLUMNS: &str = r#"id, creator_id, category_id, title, description,
    price::text AS price, file_url, file_type, file_size, tags, is_active,
    total_sales, average_rating, total_reviews, created_at"#;

pub async fn get_listing(pool: &PgPool, id: i32) -> Result<Option<Listing>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| listing_from_row(&r)))
}

pub async fn get_active_listing(pool: &PgPool, id: i32) -> Result<Option<Listing>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1 AND is_active = true"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| listing_from_row(&r)))
}

/// Ownership check: one completed transaction per (buyer, listing) pair.
pub async fn find_completed_transaction(
    pool: &PgPool,
    buyer_id: i32,
    listing_id: i32,
) -> Result<Option<i32>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id FROM transactions
           WHERE buyer_id = $1 AND listing_id = $2 AND status = 'completed'
           LIMIT 1"#,
    )
    .bind(buyer_id)
    .bind(listing_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.get("id")))
}

pub async fn user_is_creator(pool: &PgPool, user_id: i32) -> Result<Option<bool>, sqlx::Error> {
    let row = sqlx::query("SELECT is_creator FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("is_creator")))
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT c.id, c.name, c.slug, c.description,
                  COUNT(l.id) FILTER (WHERE l.is_active) AS listing_count
           FROM categories c
           LEFT JOIN listings l ON l.category_id = c.id
           GROUP BY c.id
           ORDER BY c.name ASC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Category {
            id: r.get("id"),
            name: r.get("name"),
            slug: r.get("slug"),
            description: r.get("description"),
            listing_count: r.get("listing_count"),
        })
        .collect())
}
