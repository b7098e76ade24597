use async_trait::async_trait;
use chrono::Utc;
use common::{
    error::{AppError, Res},
    stripe::{create_customer, find_customer_by_email},
};
use log::{debug, info, warn};
use plans::usage_total_for_meter_slug;
use serde::{Deserialize, de::DeserializeOwned};
use stripe::{
    CheckoutSessionMode, Client, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CustomerId, ListPrices, ListSubscriptions, PriceType, RecurringUsageType,
    Subscription, SubscriptionId, SubscriptionStatusFilter, UpdateSubscription,
};

use super::{
    billing::resolve_plan_slug,
    provider::{BillingProvider, CheckoutParams, NewUsageEvent},
};
use crate::models::billing::{
    BillingSnapshot, Catalog, CheckoutSession, Customer, CustomerIdentity, CustomerSubscription,
    Price, PriceKind, Product, UsageBalance, UsageEvent, UsageMeter,
};

/// Price metadata key naming the meter (by event name) a metered price bills.
const USAGE_METER_METADATA_KEY: &str = "usage_meter";
/// Product metadata key marking the fallback plan.
const DEFAULT_PRODUCT_METADATA_KEY: &str = "default";

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct StripeMeter {
    id: String,
    event_name: String,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeMeterSummary {
    aggregated_value: f64,
}

#[derive(Debug, Deserialize)]
struct StripeMeterEvent {
    identifier: String,
    timestamp: i64,
}

/// Billing backed by Stripe: catalog, customers, subscriptions and checkout
/// through async-stripe; billing meters through the REST endpoints directly.
pub struct StripeBilling {
    client: Client,
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeBilling {
    pub fn new(secret_key: &str, api_base: &str) -> Self {
        StripeBilling {
            client: common::stripe::create_client(secret_key),
            http: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            api_base: api_base.to_string(),
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Res<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| format!("Stripe responded with {}", status));
        Err(AppError::Internal(message))
    }

    async fn find_customer(&self, identity: &CustomerIdentity) -> Res<Option<Customer>> {
        let found = find_customer_by_email(&self.client, &identity.email).await?;
        Ok(found.map(|customer| to_customer(customer, identity)))
    }

    async fn find_or_create_customer(&self, identity: &CustomerIdentity) -> Res<Customer> {
        if let Some(customer) = self.find_customer(identity).await? {
            return Ok(customer);
        }
        info!("Creating billing customer for user {}", identity.external_id);
        let created = create_customer(
            &self.client,
            &identity.email,
            &identity.name,
            &identity.external_id,
        )
        .await?;
        Ok(to_customer(created, identity))
    }

    async fn list_meters(&self) -> Res<Vec<UsageMeter>> {
        let mut meters = Vec::new();
        let mut starting_after: Option<String> = None;
        loop {
            let mut query = vec![("status", "active".to_string()), ("limit", "100".to_string())];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after", cursor.clone()));
            }
            let response = self
                .http
                .get(format!("{}/v1/billing/meters", self.api_base))
                .bearer_auth(&self.secret_key)
                .query(&query)
                .send()
                .await?;
            let page: StripeList<StripeMeter> = Self::read_json(response).await?;

            starting_after = page.data.last().map(|meter| meter.id.clone());
            meters.extend(page.data.into_iter().map(|meter| UsageMeter {
                name: meter.display_name.unwrap_or_else(|| meter.event_name.clone()),
                id: meter.id,
                slug: meter.event_name,
            }));
            if !page.has_more || starting_after.is_none() {
                return Ok(meters);
            }
        }
    }

    async fn load_catalog(&self) -> Res<Catalog> {
        let usage_meters = self.list_meters().await?;

        let params = ListPrices {
            active: Some(true),
            limit: Some(100),
            expand: &["data.product"],
            ..Default::default()
        };
        let prices = stripe::Price::list(&self.client, &params)
            .await?
            .paginate(params)
            .get_all(&self.client)
            .await?;

        let mut products: Vec<Product> = Vec::new();
        for price in prices {
            let Some(product_ref) = price.product.as_ref() else {
                continue;
            };
            let product_id = product_ref.id().to_string();
            let product_obj = product_ref.as_object();

            let mapped = to_price(&price, &usage_meters);
            match products.iter_mut().find(|p| p.id == product_id) {
                Some(product) => product.prices.push(mapped),
                None => products.push(Product {
                    name: product_obj
                        .and_then(|p| p.name.clone())
                        .unwrap_or_default(),
                    default: product_obj
                        .and_then(|p| p.metadata.as_ref())
                        .and_then(|m| m.get(DEFAULT_PRODUCT_METADATA_KEY))
                        .is_some_and(|v| v == "true"),
                    id: product_id,
                    prices: vec![mapped],
                }),
            }
        }

        debug!(
            "Loaded catalog with {} products and {} meters",
            products.len(),
            usage_meters.len()
        );
        Ok(Catalog {
            products,
            usage_meters,
        })
    }

    async fn list_subscriptions(&self, customer_id: &str) -> Res<Vec<CustomerSubscription>> {
        let customer_id = customer_id
            .parse::<CustomerId>()
            .map_err(|e| AppError::Internal(format!("Invalid customer ID: {}", e)))?;

        let subscriptions = Subscription::list(
            &self.client,
            &ListSubscriptions {
                customer: Some(customer_id),
                status: Some(SubscriptionStatusFilter::Active),
                limit: Some(10),
                ..Default::default()
            },
        )
        .await?;

        Ok(subscriptions.data.iter().map(to_subscription).collect())
    }

    /// Usage recorded on a meter for the customer within `[start, end)`.
    async fn meter_usage(
        &self,
        meter_id: &str,
        customer_id: &str,
        start: i64,
        end: i64,
    ) -> Res<i64> {
        let Some((start, end)) = minute_bounds(start, end) else {
            return Ok(0);
        };

        let response = self
            .http
            .get(format!(
                "{}/v1/billing/meters/{}/event_summaries",
                self.api_base, meter_id
            ))
            .bearer_auth(&self.secret_key)
            .query(&[
                ("customer", customer_id.to_string()),
                ("start_time", start.to_string()),
                ("end_time", end.to_string()),
            ])
            .send()
            .await?;
        let summaries: StripeList<StripeMeterSummary> = Self::read_json(response).await?;

        let used: f64 = summaries.data.iter().map(|s| s.aggregated_value).sum();
        Ok(used.round() as i64)
    }

    async fn usage_balances(&self, snapshot: &BillingSnapshot) -> Res<Vec<UsageBalance>> {
        let (Some(customer), Some(subscription)) =
            (&snapshot.customer, snapshot.current_subscriptions.first())
        else {
            return Ok(Vec::new());
        };
        let plan_slug = resolve_plan_slug(snapshot).unwrap_or_default();
        let end = Utc::now()
            .timestamp()
            .min(subscription.current_period_end);

        let mut balances = Vec::with_capacity(snapshot.catalog.usage_meters.len());
        for meter in &snapshot.catalog.usage_meters {
            let used = self
                .meter_usage(
                    &meter.id,
                    &customer.id,
                    subscription.current_period_start,
                    end,
                )
                .await?;
            let allowance = usage_total_for_meter_slug(&plan_slug, &meter.slug);
            balances.push(UsageBalance {
                usage_meter_id: meter.id.clone(),
                usage_meter_slug: meter.slug.clone(),
                available_balance: available_balance(allowance, used),
            });
        }
        Ok(balances)
    }
}

/// Widens `[start, end)` to whole minutes, the only bounds meter summaries
/// accept. None when the window is empty.
fn minute_bounds(start: i64, end: i64) -> Option<(i64, i64)> {
    let start = start - start.rem_euclid(60);
    let end = end + (60 - end.rem_euclid(60)) % 60;
    (end > start).then_some((start, end))
}

/// What is left of the plan allowance after this period's usage, never
/// below zero.
fn available_balance(allowance: u32, used: i64) -> i64 {
    (i64::from(allowance) - used).max(0)
}

fn to_customer(customer: stripe::Customer, identity: &CustomerIdentity) -> Customer {
    Customer {
        id: customer.id.to_string(),
        external_id: customer
            .metadata
            .as_ref()
            .and_then(|m| m.get("external_id").cloned())
            .unwrap_or_else(|| identity.external_id.clone()),
        email: customer.email.unwrap_or_else(|| identity.email.clone()),
        name: customer.name.unwrap_or_else(|| identity.name.clone()),
    }
}

fn to_price(price: &stripe::Price, meters: &[UsageMeter]) -> Price {
    let metered = price.type_ == Some(PriceType::Recurring)
        && price
            .recurring
            .as_ref()
            .is_some_and(|r| r.usage_type == RecurringUsageType::Metered);

    let usage_meter_id = if metered {
        price
            .metadata
            .as_ref()
            .and_then(|m| m.get(USAGE_METER_METADATA_KEY))
            .and_then(|event_name| meters.iter().find(|m| &m.slug == event_name))
            .map(|meter| meter.id.clone())
    } else {
        None
    };

    Price {
        id: price.id.to_string(),
        slug: price.lookup_key.clone(),
        kind: if metered {
            PriceKind::Usage
        } else {
            PriceKind::Subscription
        },
        usage_meter_id,
        unit_amount: price.unit_amount.unwrap_or(0),
        currency: price
            .currency
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        interval: price.recurring.as_ref().map(|r| r.interval.to_string()),
    }
}

fn to_subscription(subscription: &Subscription) -> CustomerSubscription {
    CustomerSubscription {
        id: subscription.id.to_string(),
        price_id: subscription
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.to_string())
            .unwrap_or_default(),
        status: subscription.status.to_string(),
        current_period_start: subscription.current_period_start,
        current_period_end: subscription.current_period_end,
        cancel_at_period_end: subscription.cancel_at_period_end,
    }
}

#[async_trait]
impl BillingProvider for StripeBilling {
    async fn get_billing(&self, identity: &CustomerIdentity) -> Res<BillingSnapshot> {
        let catalog = self.load_catalog().await?;
        let Some(customer) = self.find_customer(identity).await? else {
            return Ok(BillingSnapshot {
                catalog,
                ..Default::default()
            });
        };

        let current_subscriptions = self.list_subscriptions(&customer.id).await?;
        let mut snapshot = BillingSnapshot {
            customer: Some(customer),
            catalog,
            current_subscriptions,
            usage_balances: Vec::new(),
        };
        snapshot.usage_balances = self.usage_balances(&snapshot).await?;
        Ok(snapshot)
    }

    async fn create_checkout_session(
        &self,
        identity: &CustomerIdentity,
        params: CheckoutParams,
    ) -> Res<CheckoutSession> {
        let customer = self.find_or_create_customer(identity).await?;
        let customer_id = customer
            .id
            .parse::<CustomerId>()
            .map_err(|e| AppError::Internal(format!("Invalid customer ID: {}", e)))?;

        let request = CreateCheckoutSession {
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(params.price_id.clone()),
                quantity: Some(params.quantity),
                ..Default::default()
            }]),
            mode: Some(CheckoutSessionMode::Subscription),
            success_url: Some(params.success_url.as_str()),
            cancel_url: Some(params.cancel_url.as_str()),
            customer: Some(customer_id),
            ..Default::default()
        };
        let session = stripe::CheckoutSession::create(&self.client, request).await?;

        let url = session
            .url
            .ok_or_else(|| AppError::Internal("Checkout session has no URL".to_string()))?;
        info!(
            "Checkout session {} created for price {}",
            session.id, params.price_id
        );
        Ok(CheckoutSession {
            id: session.id.to_string(),
            url,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Res<CustomerSubscription> {
        let sub_id = subscription_id
            .parse::<SubscriptionId>()
            .map_err(|e| AppError::BadRequest(format!("Invalid subscription ID: {}", e)))?;

        let subscription = Subscription::update(
            &self.client,
            &sub_id,
            UpdateSubscription {
                cancel_at_period_end: Some(true),
                ..Default::default()
            },
        )
        .await?;

        info!("Subscription {} set to cancel at period end", subscription.id);
        Ok(to_subscription(&subscription))
    }

    async fn create_usage_event(
        &self,
        customer: &Customer,
        event: NewUsageEvent,
    ) -> Res<UsageEvent> {
        let amount = event.amount.to_string();
        let response = self
            .http
            .post(format!("{}/v1/billing/meter_events", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("event_name", event.usage_meter_slug.as_str()),
                ("payload[stripe_customer_id]", customer.id.as_str()),
                ("payload[value]", amount.as_str()),
                ("identifier", event.transaction_id.as_str()),
            ])
            .send()
            .await?;

        let recorded: StripeMeterEvent = match Self::read_json(response).await {
            Ok(recorded) => recorded,
            Err(e) => {
                warn!(
                    "Meter event {} for {} failed: {}",
                    event.transaction_id, customer.id, e
                );
                return Err(e);
            }
        };

        Ok(UsageEvent {
            customer_id: customer.id.clone(),
            subscription_id: event.subscription_id,
            price_id: event.price_id,
            usage_meter_id: event.usage_meter_id,
            usage_meter_slug: event.usage_meter_slug,
            amount: event.amount,
            transaction_id: recorded.identifier,
            timestamp: recorded.timestamp,
        })
    }
}
