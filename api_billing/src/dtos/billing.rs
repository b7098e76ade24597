use plans::BillingPeriod;
use serde::{Deserialize, Serialize};

use crate::models::billing::CustomerSubscription;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub price_slug: String,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub subscription: CustomerSubscription,
}

#[derive(Debug, Default, Deserialize)]
pub struct PricingQuery {
    #[serde(default)]
    pub period: BillingPeriod,
}

#[derive(Debug, Serialize)]
pub struct PricingTier {
    pub name: &'static str,
    pub description: &'static str,
    pub price_slug: &'static str,
    pub price_id: Option<String>,
    pub display_price: &'static str,
    pub period_label: &'static str,
    /// Only for yearly, purchasable tiers: "$N" billed monthly-equivalent.
    pub monthly_equivalent: Option<String>,
    pub features: &'static [&'static str],
    pub is_popular: bool,
    pub is_default: bool,
    pub is_current: bool,
}

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub period: BillingPeriod,
    pub tiers: Vec<PricingTier>,
}
