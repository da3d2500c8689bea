// src/search.rs
//
// Listing search: text OR-match on title/description, category slug, inclusive
// price bounds, tag overlap (any shared tag), one active sort, 1-indexed
// pagination. Only active listings are ever returned.

use serde::Deserialize;
use sqlx::{PgPool, Row};
use utoipa::{IntoParams, ToSchema};

use crate::models::ListingSummary;

pub const DEFAULT_LIMIT: i64 = 12;
pub const MAX_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    Rating,
    Popular,
}

impl SortBy {
    /// Static ORDER BY fragment; id as a stable tiebreak within every key.
    fn order_clause(self) -> &'static str {
        match self {
            SortBy::Newest => "l.created_at DESC, l.id DESC",
            SortBy::Oldest => "l.created_at ASC, l.id ASC",
            SortBy::PriceAsc => "l.price ASC, l.id ASC",
            SortBy::PriceDesc => "l.price DESC, l.id ASC",
            SortBy::Rating => "l.average_rating DESC, l.id ASC",
            SortBy::Popular => "l.total_sales DESC, l.id ASC",
        }
    }
}

/// Raw query string, e.g. `?q=budget&tags=finance,excel&sortBy=price_asc`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Comma-separated.
    pub tags: Option<String>,
    pub sort_by: Option<SortBy>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub sort_by: SortBy,
    pub page: i64,
    pub limit: i64,
}

impl From<SearchParams> for SearchQuery {
    fn from(p: SearchParams) -> Self {
        let tags = p.tags.and_then(|raw| {
            let parsed: Vec<String> = raw
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if parsed.is_empty() { None } else { Some(parsed) }
        });

        Self {
            q: p.q.filter(|q| !q.is_empty()),
            category: p.category.filter(|c| !c.is_empty()),
            min_price: p.min_price,
            max_price: p.max_price,
            tags,
            sort_by: p.sort_by.unwrap_or_default(),
            page: p.page.unwrap_or(1).max(1),
            limit: p.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }
}

const SEARCH_FILTER: &str = r#"
    FROM listings l
    LEFT JOIN categories c ON c.id = l.category_id
    LEFT JOIN users u ON u.id = l.creator_id
    WHERE l.is_active = true
      AND ($1::text IS NULL
           OR l.title ILIKE '%' || $1 || '%'
           OR l.description ILIKE '%' || $1 || '%')
      AND ($2::text IS NULL OR c.slug = $2)
      AND ($3::float8 IS NULL OR l.price::float8 >= $3)
      AND ($4::float8 IS NULL OR l.price::float8 <= $4)
      AND ($5::text[] IS NULL OR l.tags && $5)"#;

/// Returns the page of matches plus the full filtered count.
pub async fn run_search(
    pool: &PgPool,
    query: &SearchQuery,
) -> Result<(Vec<ListingSummary>, i64), sqlx::Error> {
    let offset = (query.page - 1) * query.limit;

    let select = format!(
        r#"SELECT l.id, l.title, l.description, l.price::text AS price, l.file_type,
                  l.tags, l.total_sales, l.average_rating, l.total_reviews, l.created_at,
                  c.name AS category_name, c.slug AS category_slug,
                  u.username AS creator_username
           {SEARCH_FILTER}
           ORDER BY {}
           LIMIT $6 OFFSET $7"#,
        query.sort_by.order_clause()
    );

    let rows = sqlx::query(&select)
        .bind(&query.q)
        .bind(&query.category)
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(&query.tags)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let listings = rows
        .into_iter()
        .map(|r| ListingSummary {
            id: r.get("id"),
            title: r.get("title"),
            description: r.get("description"),
            price: r.get("price"),
            file_type: r.get("file_type"),
            tags: r.get("tags"),
            total_sales: r.get("total_sales"),
            average_rating: r.get("average_rating"),
            total_reviews: r.get("total_reviews"),
            created_at: r.get("created_at"),
            category_name: r.get("category_name"),
            category_slug: r.get("category_slug"),
            creator_username: r.get("creator_username"),
        })
        .collect();

    let count_sql = format!("SELECT COUNT(*) AS total {SEARCH_FILTER}");
    let total: i64 = sqlx::query(&count_sql)
        .bind(&query.q)
        .bind(&query.category)
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(&query.tags)
        .fetch_one(pool)
        .await?
        .get("total");

    Ok((listings, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SearchParams {
        SearchParams {
            q: None,
            category: None,
            min_price: None,
            max_price: None,
            tags: None,
            sort_by: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn defaults_applied() {
        let q = SearchQuery::from(params());
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, DEFAULT_LIMIT);
        assert!(matches!(q.sort_by, SortBy::Newest));
    }

    #[test]
    fn limit_clamped_and_page_floored() {
        let q = SearchQuery::from(SearchParams {
            page: Some(-3),
            limit: Some(500),
            ..params()
        });
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, MAX_LIMIT);

        let q = SearchQuery::from(SearchParams { limit: Some(0), ..params() });
        assert_eq!(q.limit, 1);
    }

    #[test]
    fn tags_split_on_commas() {
        let q = SearchQuery::from(SearchParams {
            tags: Some("finance, excel,,budget ".to_string()),
            ..params()
        });
        assert_eq!(q.tags.unwrap(), vec!["finance", "excel", "budget"]);

        let q = SearchQuery::from(SearchParams { tags: Some(" , ".to_string()), ..params() });
        assert!(q.tags.is_none());
    }
}
