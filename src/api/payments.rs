// src/api/payments.rs

use actix_web::{post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::billing;
use crate::stripe::{self, CheckoutMetadata};
use crate::{db, AppState};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub listing_id: i32,
}

/// Creates a payment intent for the listing price, carrying the fee split in
/// the intent metadata for the webhook to consume, and returns the client
/// secret for the hosted payment flow.
#[utoipa::path(
    post,
    path = "/payments/checkout",
    tag = "payments",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Client secret for the payment flow"),
        (status = 400, description = "Self purchase, already owned, or bad price"),
        (status = 404, description = "Listing missing or inactive"),
        (status = 500, description = "Server error")
    )
)]
#[post("/payments/checkout")]
pub async fn checkout(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<CheckoutRequest>,
) -> impl Responder {
    let buyer_id = *user_id;

    let listing = match db::get_active_listing(&state.pool, payload.listing_id).await {
        Ok(Some(l)) => l,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({
                "error": "Listing not found or inactive"
            }));
        }
        Err(e) => {
            eprintln!("checkout listing db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if listing.creator_id == buyer_id {
        return HttpResponse::BadRequest().json(json!({
            "error": "Cannot purchase your own listing"
        }));
    }

    match db::find_completed_transaction(&state.pool, buyer_id, listing.id).await {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "You already own this spreadsheet"
            }));
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("checkout ownership db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    }

    let Some(split) = billing::split_commission(&listing.price) else {
        log::error!("unparsable price for listing {}: {}", listing.id, listing.price);
        return HttpResponse::InternalServerError().finish();
    };

    let metadata = CheckoutMetadata {
        listing_id: listing.id,
        buyer_id,
        creator_id: listing.creator_id,
        platform_fee_cents: split.platform_fee_cents,
        creator_earnings_cents: split.creator_earnings_cents,
    };

    let intent = match stripe::create_payment_intent(
        &state.stripe_secret_key,
        split.amount_cents,
        "usd",
        &metadata,
    )
    .await
    {
        Ok(i) => i,
        Err(e) => {
            log::error!(
                "create_payment_intent error: {e} buyer_id={buyer_id} listing_id={}",
                listing.id
            );
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(json!({
        "clientSecret": intent.client_secret,
        "paymentIntentId": intent.id,
    }))
}
