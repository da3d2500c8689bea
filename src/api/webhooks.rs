// src/api/webhooks.rs

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::billing::{self, FulfillOutcome};
use crate::stripe::{self, WebhookEvent};
use crate::AppState;

/// Payment processor event ingestion. Fails closed when the signature header
/// is absent or does not verify. Processing failures answer non-2xx so the
/// processor redelivers; redelivery of an applied event is a no-op.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    tag = "webhooks",
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Event applied or ignored"),
        (status = 400, description = "Bad signature or malformed event"),
        (status = 500, description = "Processing failed; expect redelivery")
    )
)]
#[post("/payments/webhook")]
pub async fn payment_webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let signature = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok());

    if let Err(e) = stripe::verify_signature(&state.stripe_webhook_secret, signature, &body) {
        log::warn!("webhook signature rejected: {e}");
        return HttpResponse::BadRequest().json(json!({ "error": "invalid signature" }));
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("webhook payload parse error: {e}");
            return HttpResponse::BadRequest().json(json!({ "error": "malformed event" }));
        }
    };

    if event.event_type != "payment_intent.succeeded" {
        return HttpResponse::Ok().json(json!({ "received": true, "ignored": true }));
    }

    match billing::fulfill_payment(state.get_ref(), &event.id, &event.data.object).await {
        Ok(FulfillOutcome::Fulfilled { transaction_id, .. }) => {
            log::info!(
                "payment fulfilled event={} intent={} transaction={}",
                event.id,
                event.data.object.id,
                transaction_id
            );
            HttpResponse::Ok().json(json!({ "received": true }))
        }
        Ok(FulfillOutcome::AlreadyProcessed) => {
            HttpResponse::Ok().json(json!({ "received": true, "idempotent": true }))
        }
        Err(e) => {
            log::error!("fulfillment error event={}: {e}", event.id);
            HttpResponse::InternalServerError().json(json!({ "error": "webhook handler failed" }))
        }
    }
}
