use std::sync::Arc;

use actix_web::{Responder, post, web};
use api_auth::AuthSession;
use common::{error::Res, http::Success};

use crate::{
    dtos::usage::{UsageEventRequest, UsageEventResponse},
    models::billing::CustomerIdentity,
    services::{
        provider::BillingProvider,
        usage::{prepare_usage_event, validate_usage_request},
    },
};

/// Records metered usage against the signed-in customer's subscription.
///
/// # Input
/// ```json
/// { "usageMeterSlug": "fast_generations", "amount": 1, "transactionId": "optional" }
/// ```
///
/// # Output
/// - Success: `{ "success": true, "usageEvent": { ... } }`
/// - 400 when the slug or amount is missing or the amount is not positive
/// - 404 when the customer, subscription, meter or usage price is missing
///
/// # Frontend Example
/// ```javascript
/// await fetch('/api/usage-events', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ usageMeterSlug: 'fast_generations', amount: 1 }),
/// });
/// ```
#[post("")]
pub async fn post_usage_event(
    session: web::ReqData<AuthSession>,
    billing: web::Data<Arc<dyn BillingProvider>>,
    req: web::Json<UsageEventRequest>,
) -> Res<impl Responder> {
    let (slug, amount, transaction_id) = validate_usage_request(req.into_inner())?;

    let identity = CustomerIdentity::from(&*session);
    let snapshot = billing.get_billing(&identity).await?;
    let (customer, event) = prepare_usage_event(&snapshot, &slug, amount, transaction_id)?;

    let usage_event = billing.create_usage_event(&customer, event).await?;
    log::debug!(
        "Recorded {} {} for customer {}",
        usage_event.amount,
        usage_event.usage_meter_slug,
        usage_event.customer_id
    );
    Success::ok(UsageEventResponse {
        success: true,
        usage_event,
    })
}

#[cfg(test)]
mod tests {
    use actix_web::{
        App, HttpMessage,
        dev::Service,
        http::StatusCode,
        test::{self, TestRequest},
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        routes::testing::{FakeBilling, session},
        services::billing::fixtures::snapshot,
    };

    macro_rules! usage_app {
        ($fake:expr) => {{
            let provider: Arc<dyn BillingProvider> = $fake;
            test::init_service(
                App::new()
                    .app_data(web::Data::new(provider))
                    .app_data(common::http::json_config())
                    .app_data(common::http::query_config())
                    .wrap_fn(|req, srv| {
                        req.extensions_mut().insert(session());
                        srv.call(req)
                    })
                    .service(crate::mount_usage_events()),
            )
            .await
        }};
    }

    fn usage_request(body: Value) -> TestRequest {
        TestRequest::post().uri("/usage-events").set_json(body)
    }

    #[actix_web::test]
    async fn records_event_with_resolved_ids() {
        let fake = Arc::new(FakeBilling::new(snapshot(Some("price_pro_m"), &[])));
        let app = usage_app!(fake.clone());
        let body: Value = test::call_and_read_body_json(
            &app,
            usage_request(json!({ "usageMeterSlug": "fast_generations", "amount": 2, "transactionId": "txn_1" })).to_request(),
        )
        .await;

        assert_eq!(body["success"], true);
        assert_eq!(body["usageEvent"]["priceId"], "price_fast_usage");
        assert_eq!(body["usageEvent"]["usageMeterId"], "mtr_fast");
        assert_eq!(body["usageEvent"]["subscriptionId"], "sub_1");
        assert_eq!(body["usageEvent"]["transactionId"], "txn_1");
        assert_eq!(fake.usage_events.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn generates_transaction_id_when_missing() {
        let fake = Arc::new(FakeBilling::new(snapshot(Some("price_pro_m"), &[])));
        let app = usage_app!(fake.clone());
        let body: Value = test::call_and_read_body_json(
            &app,
            usage_request(json!({ "usageMeterSlug": "fast_generations", "amount": 1 })).to_request(),
        )
        .await;
        let txn = body["usageEvent"]["transactionId"].as_str().unwrap();
        assert!(txn.starts_with("usage_"), "{txn}");
    }

    #[actix_web::test]
    async fn missing_fields_are_bad_requests() {
        let fake = Arc::new(FakeBilling::new(snapshot(Some("price_pro_m"), &[])));
        let app = usage_app!(fake.clone());
        for body in [
            json!({ "amount": 1 }),
            json!({ "usageMeterSlug": "fast_generations" }),
            json!({ "usageMeterSlug": "fast_generations", "amount": -3 }),
        ] {
            let res = test::call_service(&app, usage_request(body).to_request()).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
        assert!(fake.usage_events.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn missing_billing_records_are_not_found() {
        let app = usage_app!(Arc::new(FakeBilling::new(snapshot(None, &[]))));
        let res = test::call_service(
            &app,
            usage_request(json!({ "usageMeterSlug": "fast_generations", "amount": 1 })).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let app = usage_app!(Arc::new(FakeBilling::new(snapshot(Some("price_pro_m"), &[]))));
        let res = test::call_service(
            &app,
            usage_request(json!({ "usageMeterSlug": "hd_video_minutes", "amount": 1 })).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn provider_failure_is_a_server_error() {
        let fake = Arc::new(FakeBilling::failing_usage(snapshot(Some("price_pro_m"), &[])));
        let app = usage_app!(fake);
        let res = test::call_service(
            &app,
            usage_request(json!({ "usageMeterSlug": "fast_generations", "amount": 1 })).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn mistyped_amount_is_a_json_bad_request() {
        let fake = Arc::new(FakeBilling::new(snapshot(Some("price_pro_m"), &[])));
        let app = usage_app!(fake.clone());
        let res = test::call_service(
            &app,
            usage_request(json!({ "usageMeterSlug": "fast_generations", "amount": "1" })).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert!(body["error"].as_str().unwrap().starts_with("Bad request:"), "{body}");
        assert!(fake.usage_events.lock().unwrap().is_empty());
    }
}
