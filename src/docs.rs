use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::listings::search_listings,
        crate::api::payments::checkout,
        crate::api::webhooks::payment_webhook,
        crate::api::uploads::presigned_url,
        crate::api::uploads::validate_upload
    ),
    components(
        schemas(
            crate::api::auth::RegisterRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::AuthResponse,
            crate::api::listings::CreateListingRequest,
            crate::api::payments::CheckoutRequest,
            crate::api::reviews::CreateReviewRequest,
            crate::api::uploads::PresignedUrlRequest,
            crate::models::Listing,
            crate::models::ListingSummary,
            crate::models::Category,
            crate::models::Transaction,
            crate::models::Download,
            crate::models::Review,
            crate::models::Pagination
        )
    ),
    tags(
        (name = "listings", description = "Browse and publish spreadsheet listings"),
        (name = "payments", description = "Checkout"),
        (name = "webhooks", description = "Payment processor callbacks"),
        (name = "uploads", description = "File upload authorization and validation")
    )
)]
pub struct ApiDoc;
