use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FunnelCRM Checkout API",
        version = "1.0.0",
        description = r#"
# FunnelCRM Checkout API

Payment and order commit workflow for campaign checkout funnels.

## Behavior

- Declines are **HTTP 200** responses with `success: false`; only
  validation, funnel-precondition, configuration, and commit failures use
  error status codes.
- A customer converts at most once through this API; further payment calls
  return `400` with an already-converted message.
- Retries are bounded; after 5 recorded declines the retry endpoint refuses
  with `400` before contacting any gateway.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        crate::handlers::checkout::submit_payment,
        crate::handlers::checkout::retry_payment,
    ),
    components(schemas(
        crate::handlers::checkout::PaymentRequest,
        crate::handlers::checkout::PaymentResponse,
        crate::services::pricing::CheckoutTotals,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "checkout", description = "Checkout payment and retry endpoints")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
