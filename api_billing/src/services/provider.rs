use async_trait::async_trait;
use common::error::Res;

use crate::models::billing::{
    BillingSnapshot, CheckoutSession, Customer, CustomerIdentity, CustomerSubscription,
    UsageEvent,
};

#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub quantity: u64,
}

#[derive(Debug, Clone)]
pub struct NewUsageEvent {
    pub subscription_id: String,
    pub price_id: String,
    pub usage_meter_id: String,
    pub usage_meter_slug: String,
    pub amount: i64,
    /// Idempotency key; the provider drops repeats.
    pub transaction_id: String,
}

/// External billing system: catalog, subscriptions, live balances, checkout
/// and metered usage.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn get_billing(&self, identity: &CustomerIdentity) -> Res<BillingSnapshot>;

    async fn create_checkout_session(
        &self,
        identity: &CustomerIdentity,
        params: CheckoutParams,
    ) -> Res<CheckoutSession>;

    /// Stops renewal; the subscription stays active until the period ends.
    async fn cancel_subscription(&self, subscription_id: &str) -> Res<CustomerSubscription>;

    async fn create_usage_event(&self, customer: &Customer, event: NewUsageEvent)
    -> Res<UsageEvent>;
}
