// src/stripe.rs
//
// Minimal Stripe client: payment intent creation over the form-encoded REST
// API, plus webhook signature verification (HMAC-SHA256 of "{t}.{body}" with
// the shared endpoint secret, hex-encoded in the Stripe-Signature header).

use std::collections::HashMap;
use std::fmt;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use utoipa::ToSchema;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug)]
pub enum StripeError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl fmt::Display for StripeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StripeError::Http(e) => write!(f, "http error: {e}"),
            StripeError::Api { status, body } => {
                write!(f, "stripe api error status={status} body={body}")
            }
            StripeError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl From<reqwest::Error> for StripeError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Opaque checkout context the fulfillment step reads back off the event.
#[derive(Debug)]
pub struct CheckoutMetadata {
    pub listing_id: i32,
    pub buyer_id: i32,
    pub creator_id: i32,
    pub platform_fee_cents: i64,
    pub creator_earnings_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

pub async fn create_payment_intent(
    secret_key: &str,
    amount_cents: i64,
    currency: &str,
    metadata: &CheckoutMetadata,
) -> Result<PaymentIntent, StripeError> {
    let client = reqwest::Client::new();

    let amount = amount_cents.to_string();
    let listing_id = metadata.listing_id.to_string();
    let buyer_id = metadata.buyer_id.to_string();
    let creator_id = metadata.creator_id.to_string();
    let platform_fee = metadata.platform_fee_cents.to_string();
    let creator_earnings = metadata.creator_earnings_cents.to_string();

    let params: Vec<(&str, &str)> = vec![
        ("amount", amount.as_str()),
        ("currency", currency),
        ("metadata[listingId]", listing_id.as_str()),
        ("metadata[buyerId]", buyer_id.as_str()),
        ("metadata[creatorId]", creator_id.as_str()),
        ("metadata[platformFee]", platform_fee.as_str()),
        ("metadata[creatorEarnings]", creator_earnings.as_str()),
    ];

    let resp = client
        .post(format!("{STRIPE_API_BASE}/v1/payment_intents"))
        .basic_auth(secret_key, None::<&str>)
        .form(&params)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(StripeError::Api { status: status.as_u16(), body });
    }

    serde_json::from_str::<PaymentIntent>(&body)
        .map_err(|e| StripeError::InvalidResponse(format!("{e}; body={body}")))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookEventData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureError {
    MissingHeader,
    MalformedHeader,
    Mismatch,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::MissingHeader => write!(f, "missing signature header"),
            SignatureError::MalformedHeader => write!(f, "malformed signature header"),
            SignatureError::Mismatch => write!(f, "signature mismatch"),
        }
    }
}

pub fn sign_payload(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a `Stripe-Signature: t=...,v1=...` header against the raw body.
/// Fails closed on an absent or malformed header.
pub fn verify_signature(
    secret: &str,
    header: Option<&str>,
    body: &[u8],
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    for candidate in candidates {
        let Ok(bytes) = hex::decode(candidate) else {
            continue;
        };
        // verify_slice gives the constant-time comparison.
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        if mac.verify_slice(&bytes).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}
