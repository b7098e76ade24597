use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use api_auth::AuthSession;
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};

use crate::{
    dtos::billing::{CancelResponse, CheckoutRequest, CheckoutResponse},
    models::billing::CustomerIdentity,
    services::{
        billing::{current_subscription, find_price_by_slug, resolve_plan_slug},
        provider::{BillingProvider, CheckoutParams},
        usage::build_usage_report,
    },
};

/// Returns the billing snapshot of the signed-in customer: catalog, current
/// subscriptions and live usage balances.
#[get("")]
pub async fn get_billing(
    session: web::ReqData<AuthSession>,
    billing: web::Data<Arc<dyn BillingProvider>>,
) -> Res<impl Responder> {
    let identity = CustomerIdentity::from(&*session);
    let snapshot = billing.get_billing(&identity).await?;
    Success::ok(snapshot)
}

/// Returns one progress row per usage meter.
///
/// # Output
/// ```json
/// { "plan_slug": "pro_monthly", "subscription_id": "sub_1",
///   "meters": [{ "usage_meter_slug": "fast_generations", "total": 750,
///                "remaining": 600, "percentage": 80.0, "available": true }] }
/// ```
#[get("/usage")]
pub async fn get_usage(
    session: web::ReqData<AuthSession>,
    billing: web::Data<Arc<dyn BillingProvider>>,
) -> Res<impl Responder> {
    let identity = CustomerIdentity::from(&*session);
    let snapshot = billing.get_billing(&identity).await?;
    Success::ok(build_usage_report(&snapshot))
}

/// Starts a hosted checkout for the plan price named by `priceSlug`.
///
/// Redirect URLs default to the app base URL. The free plan and the plan the
/// customer already has cannot be checked out.
#[post("/checkout")]
pub async fn post_checkout(
    session: web::ReqData<AuthSession>,
    billing: web::Data<Arc<dyn BillingProvider>>,
    config: web::Data<Arc<Config>>,
    req: web::Json<CheckoutRequest>,
) -> Res<impl Responder> {
    let req = req.into_inner();
    let identity = CustomerIdentity::from(&*session);
    let snapshot = billing.get_billing(&identity).await?;

    let (product, price) = find_price_by_slug(&snapshot.catalog, &req.price_slug).ok_or_else(|| {
        AppError::NotFound(format!(
            "Price not found for \"{}\". Please contact support.",
            req.price_slug
        ))
    })?;
    if product.default {
        return Err(AppError::BadRequest(
            "The free plan does not require checkout".to_string(),
        ));
    }
    if resolve_plan_slug(&snapshot).as_deref() == Some(req.price_slug.as_str()) {
        return Err(AppError::BadRequest(
            "You are already subscribed to this plan".to_string(),
        ));
    }

    let params = CheckoutParams {
        price_id: price.id.clone(),
        success_url: req
            .success_url
            .unwrap_or_else(|| config.app_base_url.clone()),
        cancel_url: req.cancel_url.unwrap_or_else(|| config.app_base_url.clone()),
        quantity: 1,
    };
    let checkout = billing.create_checkout_session(&identity, params).await?;
    Success::ok(CheckoutResponse {
        id: checkout.id,
        url: checkout.url,
    })
}

/// Cancels the current subscription at the end of its billing period.
#[post("/cancel")]
pub async fn post_cancel(
    session: web::ReqData<AuthSession>,
    billing: web::Data<Arc<dyn BillingProvider>>,
) -> Res<impl Responder> {
    let identity = CustomerIdentity::from(&*session);
    let snapshot = billing.get_billing(&identity).await?;
    let subscription = current_subscription(&snapshot)
        .ok_or_else(|| AppError::NotFound("No active subscription found".to_string()))?;

    let subscription = billing.cancel_subscription(&subscription.id).await?;
    log::info!(
        "User {} cancelled subscription {}",
        identity.external_id,
        subscription.id
    );
    Success::ok(CancelResponse { subscription })
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
        routes::testing::{FakeBilling, session, test_config},
        services::billing::fixtures::snapshot,
    };

    macro_rules! billing_app {
        ($fake:expr) => {{
            let provider: Arc<dyn BillingProvider> = $fake;
            test::init_service(
                App::new()
                    .app_data(web::Data::new(provider))
                    .app_data(common::http::json_config())
                    .app_data(common::http::query_config())
                    .app_data(web::Data::new(test_config()))
                    .wrap_fn(|req, srv| {
                        req.extensions_mut().insert(session());
                        srv.call(req)
                    })
                    .service(crate::mount_billing()),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn usage_report_for_subscribed_customer() {
        let fake = Arc::new(FakeBilling::new(snapshot(
            Some("price_pro_m"),
            &[("fast_generations", 375)],
        )));
        let app = billing_app!(fake);
        let body: Value =
            test::call_and_read_body_json(&app, TestRequest::get().uri("/billing/usage").to_request())
                .await;
        assert_eq!(body["plan_slug"], "pro_monthly");
        assert_eq!(body["meters"][0]["usage_meter_slug"], "fast_generations");
        assert_eq!(body["meters"][0]["total"], 750);
        assert_eq!(body["meters"][0]["percentage"], 50.0);
        assert_eq!(body["meters"][1]["available"], false);
    }

    #[actix_web::test]
    async fn snapshot_is_returned_as_is() {
        let fake = Arc::new(FakeBilling::new(snapshot(Some("price_pro_y"), &[])));
        let app = billing_app!(fake);
        let body: Value =
            test::call_and_read_body_json(&app, TestRequest::get().uri("/billing").to_request()).await;
        assert_eq!(body["customer"]["id"], "cus_1");
        assert_eq!(body["current_subscriptions"][0]["price_id"], "price_pro_y");
    }

    #[actix_web::test]
    async fn checkout_uses_catalog_price_and_default_urls() {
        let fake = Arc::new(FakeBilling::new(snapshot(None, &[])));
        let app = billing_app!(fake.clone());
        let req = TestRequest::post()
            .uri("/billing/checkout")
            .set_json(json!({ "priceSlug": "pro_yearly" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], "cs_test_1");

        let params = fake.checkouts.lock().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].price_id, "price_pro_y");
        assert_eq!(params[0].success_url, "http://localhost:3000");
        assert_eq!(params[0].quantity, 1);
    }

    #[actix_web::test]
    async fn checkout_rejects_unknown_default_and_current_prices() {
        let fake = Arc::new(FakeBilling::new(snapshot(Some("price_pro_m"), &[])));
        let app = billing_app!(fake.clone());

        let cases = [
            ("mega_monthly", StatusCode::NOT_FOUND),
            ("free", StatusCode::BAD_REQUEST),
            ("pro_monthly", StatusCode::BAD_REQUEST),
        ];
        for (slug, status) in cases {
            let req = TestRequest::post()
                .uri("/billing/checkout")
                .set_json(json!({ "priceSlug": slug }))
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), status, "{slug}");
        }
        assert!(fake.checkouts.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn cancel_requires_a_subscription() {
        let app = billing_app!(Arc::new(FakeBilling::new(snapshot(None, &[]))));
        let res = test::call_service(&app, TestRequest::post().uri("/billing/cancel").to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let app = billing_app!(Arc::new(FakeBilling::new(snapshot(Some("price_pro_m"), &[]))));
        let body: Value =
            test::call_and_read_body_json(&app, TestRequest::post().uri("/billing/cancel").to_request())
                .await;
        assert_eq!(body["subscription"]["id"], "sub_1");
        assert_eq!(body["subscription"]["cancel_at_period_end"], true);
    }
}
