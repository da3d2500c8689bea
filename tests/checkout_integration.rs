use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::Row;

use spreadmarket::api::webhooks::payment_webhook;
use spreadmarket::stripe::sign_payload;

mod support;

fn signed_header(secret: &str, body: &[u8]) -> String {
    let timestamp = Utc::now().timestamp().to_string();
    let signature = sign_payload(secret, &timestamp, body);
    format!("t={timestamp},v1={signature}")
}

fn success_event(event_id: &str, intent_id: &str, listing_id: i32, buyer_id: i32, creator_id: i32) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": intent_id,
                "amount": 1999,
                "metadata": {
                    "listingId": listing_id.to_string(),
                    "buyerId": buyer_id.to_string(),
                    "creatorId": creator_id.to_string(),
                    "platformFee": "200",
                    "creatorEarnings": "1799",
                },
            },
        },
    }))
    .expect("serialize event")
}

#[actix_web::test]
async fn success_event_creates_transaction_sale_and_download() {
    let Some(test_db) = support::try_init_test_db().await else { return };
    let pool = test_db.pool.clone();

    let creator_id = support::insert_user(&pool, "creator@spreadmarket.test", true).await;
    let buyer_id = support::insert_user(&pool, "buyer@spreadmarket.test", false).await;
    let listing_id =
        support::insert_listing(&pool, creator_id, None, "Budget Model", "19.99", &["finance"], true)
            .await;

    let state = web::Data::new(support::build_state(pool.clone()));
    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let body = success_event("evt_e2e_1", "pi_e2e_1", listing_id, buyer_id, creator_id);
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Stripe-Signature", signed_header(support::TEST_WEBHOOK_SECRET, &body)))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let tx_row = sqlx::query(
        r#"SELECT id, status, amount::text AS amount, commission::text AS commission,
                  creator_earnings::text AS creator_earnings
           FROM transactions
           WHERE payment_intent_id = 'pi_e2e_1'"#,
    )
    .fetch_one(&pool)
    .await
    .expect("select tx");
    assert_eq!(tx_row.get::<String, _>("status"), "completed");
    assert_eq!(tx_row.get::<String, _>("amount"), "19.99");
    assert_eq!(tx_row.get::<String, _>("commission"), "2.00");
    assert_eq!(tx_row.get::<String, _>("creator_earnings"), "17.99");
    let transaction_id: i32 = tx_row.get("id");

    let total_sales: i32 = sqlx::query("SELECT total_sales FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_one(&pool)
        .await
        .expect("select listing")
        .get("total_sales");
    assert_eq!(total_sales, 1);

    let download = sqlx::query(
        "SELECT download_url, expires_at FROM downloads WHERE transaction_id = $1",
    )
    .bind(transaction_id)
    .fetch_one(&pool)
    .await
    .expect("select download");
    let url: String = download.get("download_url");
    assert!(url.contains("uploads/"), "grant should point at the stored key, got {url}");

    let expires_at: chrono::DateTime<Utc> = download.get("expires_at");
    let expected = Utc::now() + Duration::hours(24);
    let drift = (expires_at - expected).num_seconds().abs();
    assert!(drift < 60, "expiry should be ~now+24h, drift was {drift}s");
}

#[actix_web::test]
async fn redelivered_event_is_a_no_op() {
    let Some(test_db) = support::try_init_test_db().await else { return };
    let pool = test_db.pool.clone();

    let creator_id = support::insert_user(&pool, "creator2@spreadmarket.test", true).await;
    let buyer_id = support::insert_user(&pool, "buyer2@spreadmarket.test", false).await;
    let listing_id =
        support::insert_listing(&pool, creator_id, None, "KPI Pack", "19.99", &[], true).await;

    let state = web::Data::new(support::build_state(pool.clone()));
    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let body = success_event("evt_dup", "pi_dup", listing_id, buyer_id, creator_id);
    for _ in 0..2 {
        let req = TestRequest::post()
            .uri("/payments/webhook")
            .insert_header((
                "Stripe-Signature",
                signed_header(support::TEST_WEBHOOK_SECRET, &body),
            ))
            .insert_header(("Content-Type", "application/json"))
            .set_payload(body.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    let tx_count: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM transactions WHERE buyer_id = $1 AND listing_id = $2",
    )
    .bind(buyer_id)
    .bind(listing_id)
    .fetch_one(&pool)
    .await
    .expect("count tx")
    .get("n");
    assert_eq!(tx_count, 1, "redelivery must not create a second transaction");

    let download_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM downloads WHERE listing_id = $1")
        .bind(listing_id)
        .fetch_one(&pool)
        .await
        .expect("count downloads")
        .get("n");
    assert_eq!(download_count, 1);

    let total_sales: i32 = sqlx::query("SELECT total_sales FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_one(&pool)
        .await
        .expect("select listing")
        .get("total_sales");
    assert_eq!(total_sales, 1);
}

#[actix_web::test]
async fn webhook_rejects_missing_and_bad_signatures() {
    let Some(test_db) = support::try_init_test_db().await else { return };
    let pool = test_db.pool.clone();

    let state = web::Data::new(support::build_state(pool.clone()));
    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let body = success_event("evt_sig", "pi_sig", 1, 1, 2);

    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Stripe-Signature", signed_header("whsec_wrong", &body)))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let events: i64 = sqlx::query("SELECT COUNT(*) AS n FROM webhook_events")
        .fetch_one(&pool)
        .await
        .expect("count events")
        .get("n");
    assert_eq!(events, 0, "rejected deliveries must not consume event ids");
}

#[actix_web::test]
async fn unrelated_event_types_are_acknowledged_and_ignored() {
    let Some(test_db) = support::try_init_test_db().await else { return };
    let pool = test_db.pool.clone();

    let state = web::Data::new(support::build_state(pool.clone()));
    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let body = serde_json::to_vec(&json!({
        "id": "evt_other",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1", "amount": 500, "metadata": {} } },
    }))
    .expect("serialize event");

    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Stripe-Signature", signed_header(support::TEST_WEBHOOK_SECRET, &body)))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let tx_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM transactions")
        .fetch_one(&pool)
        .await
        .expect("count tx")
        .get("n");
    assert_eq!(tx_count, 0);
}
