use spreadmarket::billing::{cents_to_decimal, split_commission};
use spreadmarket::s3_utils::storage_key_from_url;
use spreadmarket::stripe::{sign_payload, verify_signature, SignatureError};

#[test]
fn signature_roundtrip() {
    let secret = "whsec_test";
    let body = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
    let signature = sign_payload(secret, "1700000000", body);
    let header = format!("t=1700000000,v1={signature}");

    assert_eq!(verify_signature(secret, Some(&header), body), Ok(()));
}

#[test]
fn signature_fails_closed_without_header() {
    assert_eq!(
        verify_signature("whsec_test", None, b"{}"),
        Err(SignatureError::MissingHeader)
    );
}

#[test]
fn signature_rejects_tampered_body() {
    let secret = "whsec_test";
    let signature = sign_payload(secret, "1700000000", b"original");
    let header = format!("t=1700000000,v1={signature}");

    assert_eq!(
        verify_signature(secret, Some(&header), b"tampered"),
        Err(SignatureError::Mismatch)
    );
}

#[test]
fn signature_rejects_wrong_secret_and_garbage_headers() {
    let signature = sign_payload("whsec_a", "1700000000", b"{}");
    let header = format!("t=1700000000,v1={signature}");
    assert_eq!(
        verify_signature("whsec_b", Some(&header), b"{}"),
        Err(SignatureError::Mismatch)
    );

    assert_eq!(
        verify_signature("whsec_a", Some("v1=deadbeef"), b"{}"),
        Err(SignatureError::MalformedHeader)
    );
    assert_eq!(
        verify_signature("whsec_a", Some("t=1700000000"), b"{}"),
        Err(SignatureError::MalformedHeader)
    );
}

#[test]
fn commission_split_matches_contract() {
    // round(999 * 0.10) == 100 cents, earnings 899.
    let split = split_commission("9.99").unwrap();
    assert_eq!(split.amount_cents, 999);
    assert_eq!(split.platform_fee_cents, 100);
    assert_eq!(split.creator_earnings_cents, 899);

    let split = split_commission("19.99").unwrap();
    assert_eq!(split.amount_cents, 1999);
    assert_eq!(split.platform_fee_cents, 200);
    assert_eq!(split.creator_earnings_cents, 1799);

    assert_eq!(cents_to_decimal(1799), "17.99");
}

#[test]
fn storage_key_keeps_full_prefix() {
    assert_eq!(
        storage_key_from_url(
            "https://my-bucket.s3.amazonaws.com/uploads/7/1700000000000-budget.xlsx",
            "my-bucket"
        ),
        "uploads/7/1700000000000-budget.xlsx"
    );

    // Path-style URL: the leading bucket segment is stripped.
    assert_eq!(
        storage_key_from_url(
            "https://localhost:9000/my-bucket/uploads/7/1700000000000-budget.xlsx",
            "my-bucket"
        ),
        "uploads/7/1700000000000-budget.xlsx"
    );

    // Query strings (e.g. a stale presigned URL) do not leak into the key.
    assert_eq!(
        storage_key_from_url(
            "https://my-bucket.s3.amazonaws.com/uploads/7/a.xlsx?X-Amz-Expires=3600",
            "my-bucket"
        ),
        "uploads/7/a.xlsx"
    );

    assert_eq!(storage_key_from_url("justafile.xlsx", "my-bucket"), "justafile.xlsx");
}
