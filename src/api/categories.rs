// src/api/categories.rs

use actix_web::{get, web, HttpResponse, Responder};

use crate::{db, AppState};

#[get("/categories")]
pub async fn list_categories(state: web::Data<AppState>) -> impl Responder {
    match db::list_categories(&state.pool).await {
        Ok(categories) => HttpResponse::Ok().json(categories),
        Err(e) => {
            eprintln!("list_categories db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
