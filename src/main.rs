// src/main.rs
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client as S3Client;
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use spreadmarket::rate_limit::RateLimiter;
use spreadmarket::{api, docs, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET required");
    let stripe_secret_key = env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY required");
    let stripe_webhook_secret =
        env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET required");
    let s3_bucket = env::var("S3_BUCKET").expect("S3_BUCKET required");
    let s3_endpoint = env::var("S3_ENDPOINT").ok();

    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;
    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

    // Allow custom S3-compatible endpoints (e.g., MinIO)
    if let Some(endpoint) = s3_endpoint {
        s3_config_builder = s3_config_builder
            .endpoint_url(endpoint)
            .force_path_style(true);
    }

    let s3_client = S3Client::from_conf(s3_config_builder.build());

    let rate_limiter = RateLimiter::new();
    {
        // Periodic sweep of expired windows, independent of request traffic.
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(300));
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        });
    }

    let state = web::Data::new(AppState {
        pool,
        s3_client,
        s3_bucket: s3_bucket.clone(),
        jwt_secret: jwt_secret.clone(),
        stripe_secret_key,
        stripe_webhook_secret,
        rate_limiter,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Public routes
            .service(api::auth::register)
            .service(api::auth::login)
            .service(api::categories::list_categories)
            .service(api::listings::search_listings)
            .service(api::listings::listing_preview)
            .service(api::listings::listing_reviews)
            .service(api::webhooks::payment_webhook)
            // Authenticated routes
            .service(
                web::scope("")
                    .wrap(api::auth::AuthMiddleware::new(jwt_secret.clone()))
                    .service(api::dashboard::dashboard)
                    .service(api::listings::create_listing)
                    .service(api::reviews::create_review)
                    .service(api::payments::checkout)
                    .service(api::uploads::presigned_url)
                    .service(api::uploads::validate_upload),
            )
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
