use std::sync::{Arc, Mutex};

use api_auth::{
    AuthSession, SessionUser,
    models::session::SessionInfo,
};
use async_trait::async_trait;
use common::{
    env_config::Config,
    error::{AppError, Res},
};

use crate::{
    models::billing::{
        BillingSnapshot, CheckoutSession, Customer, CustomerIdentity, CustomerSubscription,
        UsageEvent,
    },
    services::provider::{BillingProvider, CheckoutParams, NewUsageEvent},
};

pub fn session() -> AuthSession {
    AuthSession {
        session: SessionInfo {
            id: "ses_1".into(),
            user_id: "usr_1".into(),
            expires_at: None,
        },
        user: SessionUser {
            id: "usr_1".into(),
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
            email_verified: true,
        },
    }
}

pub fn test_config() -> Arc<Config> {
    Arc::new(Config::from_lookup(|key| match key {
        "ENVIRONMENT" => Some("test".into()),
        "AUTH_SERVICE_URL" => Some("http://auth.local".into()),
        "STRIPE_SECRET_KEY" => Some("sk_test_123".into()),
        _ => None,
    }))
}

/// In-memory billing that serves a fixed snapshot and records writes.
pub struct FakeBilling {
    snapshot: BillingSnapshot,
    fail_usage: bool,
    pub checkouts: Mutex<Vec<CheckoutParams>>,
    pub usage_events: Mutex<Vec<NewUsageEvent>>,
}

impl FakeBilling {
    pub fn new(snapshot: BillingSnapshot) -> Self {
        FakeBilling {
            snapshot,
            fail_usage: false,
            checkouts: Mutex::new(Vec::new()),
            usage_events: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_usage(snapshot: BillingSnapshot) -> Self {
        FakeBilling {
            fail_usage: true,
            ..Self::new(snapshot)
        }
    }
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn get_billing(&self, identity: &CustomerIdentity) -> Res<BillingSnapshot> {
        assert_eq!(identity.external_id, "usr_1");
        Ok(self.snapshot.clone())
    }

    async fn create_checkout_session(
        &self,
        _identity: &CustomerIdentity,
        params: CheckoutParams,
    ) -> Res<CheckoutSession> {
        self.checkouts.lock().unwrap().push(params);
        Ok(CheckoutSession {
            id: "cs_test_1".into(),
            url: "https://checkout.stripe.test/cs_test_1".into(),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Res<CustomerSubscription> {
        let mut subscription = self
            .snapshot
            .current_subscriptions
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(subscription_id.to_string()))?;
        subscription.cancel_at_period_end = true;
        Ok(subscription)
    }

    async fn create_usage_event(
        &self,
        customer: &Customer,
        event: NewUsageEvent,
    ) -> Res<UsageEvent> {
        if self.fail_usage {
            return Err(AppError::Internal("meter event rejected".into()));
        }
        self.usage_events.lock().unwrap().push(event.clone());
        Ok(UsageEvent {
            customer_id: customer.id.clone(),
            subscription_id: event.subscription_id,
            price_id: event.price_id,
            usage_meter_id: event.usage_meter_id,
            usage_meter_slug: event.usage_meter_slug,
            amount: event.amount,
            transaction_id: event.transaction_id,
            timestamp: 1_700_000_100,
        })
    }
}
