use api_auth::AuthSession;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceKind {
    Subscription,
    Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub slug: Option<String>,
    pub kind: PriceKind,
    /// Set on usage prices: the meter whose events this price bills.
    pub usage_meter_id: Option<String>,
    pub unit_amount: i64,
    pub currency: String,
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// The plan every customer falls back to (the free plan).
    pub default: bool,
    pub prices: Vec<Price>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMeter {
    pub id: String,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub usage_meters: Vec<UsageMeter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSubscription {
    pub id: String,
    pub price_id: String,
    pub status: String,
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageBalance {
    pub usage_meter_id: String,
    pub usage_meter_slug: String,
    pub available_balance: i64,
}

/// Everything the dashboard and pricing page need about one customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingSnapshot {
    pub customer: Option<Customer>,
    pub catalog: Catalog,
    pub current_subscriptions: Vec<CustomerSubscription>,
    pub usage_balances: Vec<UsageBalance>,
}

/// Who the billing provider should act for, derived from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerIdentity {
    pub external_id: String,
    pub name: String,
    pub email: String,
}

impl From<&AuthSession> for CustomerIdentity {
    fn from(session: &AuthSession) -> Self {
        CustomerIdentity {
            external_id: session.user.id.clone(),
            name: session.display_name().to_string(),
            email: session.user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub customer_id: String,
    pub subscription_id: String,
    pub price_id: String,
    pub usage_meter_id: String,
    pub usage_meter_slug: String,
    pub amount: i64,
    pub transaction_id: String,
    pub timestamp: i64,
}
