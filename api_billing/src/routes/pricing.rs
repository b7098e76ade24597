use std::sync::Arc;

use actix_web::{Responder, get, web};
use api_auth::AuthSession;
use common::{error::Res, http::Success};

use crate::{
    dtos::billing::{PricingQuery, PricingResponse},
    models::billing::CustomerIdentity,
    services::{billing::resolve_plan_slug, pricing::pricing_tiers, provider::BillingProvider},
};

/// Lists the pricing tiers for `?period=monthly|yearly` (monthly by default),
/// flagged against the live catalog and the customer's current plan.
#[get("")]
pub async fn get_pricing(
    session: web::ReqData<AuthSession>,
    billing: web::Data<Arc<dyn BillingProvider>>,
    query: web::Query<PricingQuery>,
) -> Res<impl Responder> {
    let period = query.into_inner().period;
    let snapshot = billing
        .get_billing(&CustomerIdentity::from(&*session))
        .await?;
    let current_plan = resolve_plan_slug(&snapshot);

    Success::ok(PricingResponse {
        period,
        tiers: pricing_tiers(period, &snapshot.catalog, current_plan.as_deref()),
    })
}
