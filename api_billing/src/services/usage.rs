use chrono::Utc;
use common::error::{AppError, Res};
use plans::{UsageMeterSlug, UsageProgress, usage_total_for_plan};
use uuid::Uuid;

use super::{
    billing::{current_subscription, find_meter_by_slug, find_usage_price, resolve_plan_slug},
    provider::NewUsageEvent,
};
use crate::{
    dtos::usage::{MeterUsage, UsageEventRequest, UsageReport},
    models::billing::{BillingSnapshot, Customer},
};

/// Live balance the billing system reports for a meter, 0 when absent.
fn remaining_balance(snapshot: &BillingSnapshot, meter: UsageMeterSlug) -> i64 {
    snapshot
        .usage_balances
        .iter()
        .find(|balance| balance.usage_meter_slug == meter.as_str())
        .map(|balance| balance.available_balance)
        .unwrap_or(0)
}

/// Reconciles static plan allowances with the live balances into the rows
/// behind the dashboard progress bars.
pub fn build_usage_report(snapshot: &BillingSnapshot) -> UsageReport {
    let plan_slug = resolve_plan_slug(snapshot);

    let meters = UsageMeterSlug::ALL
        .into_iter()
        .map(|meter| {
            let total = plan_slug
                .as_deref()
                .map_or(0, |slug| usage_total_for_plan(slug, meter));
            let progress = UsageProgress::new(remaining_balance(snapshot, meter), total);
            MeterUsage {
                usage_meter_slug: meter,
                total: progress.total,
                remaining: progress.remaining,
                percentage: progress.percentage,
                available: progress.is_available(),
            }
        })
        .collect();

    UsageReport {
        plan_slug,
        subscription_id: current_subscription(snapshot).map(|s| s.id.clone()),
        meters,
    }
}

/// `usage_<unix millis>_<random>`, matching what clients generate themselves.
pub fn generate_transaction_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("usage_{}_{}", Utc::now().timestamp_millis(), &suffix[..7])
}

/// Checks the request body and returns the meter slug, amount and
/// transaction id to record.
pub fn validate_usage_request(req: UsageEventRequest) -> Res<(String, i64, String)> {
    let (Some(slug), Some(amount)) = (
        req.usage_meter_slug.filter(|slug| !slug.trim().is_empty()),
        req.amount,
    ) else {
        return Err(AppError::BadRequest(
            "usageMeterSlug and amount are required".to_string(),
        ));
    };
    if amount <= 0 {
        return Err(AppError::BadRequest(
            "amount must be a positive integer".to_string(),
        ));
    }
    let transaction_id = req
        .transaction_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_transaction_id);
    Ok((slug, amount, transaction_id))
}

/// Resolves every identifier the billing provider needs for a usage event.
/// Fails with 404 when the customer, subscription, meter or usage price is
/// missing, in that order.
pub fn prepare_usage_event(
    snapshot: &BillingSnapshot,
    usage_meter_slug: &str,
    amount: i64,
    transaction_id: String,
) -> Res<(Customer, NewUsageEvent)> {
    let customer = snapshot
        .customer
        .clone()
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    let subscription = current_subscription(snapshot)
        .ok_or_else(|| AppError::NotFound("No active subscription found".to_string()))?;

    let meter = find_meter_by_slug(&snapshot.catalog, usage_meter_slug).ok_or_else(|| {
        AppError::NotFound(format!("Usage meter not found: {}", usage_meter_slug))
    })?;

    let price = find_usage_price(&snapshot.catalog, &meter.id).ok_or_else(|| {
        AppError::NotFound(format!(
            "Usage price not found for meter: {}. A usage-type price is required to create usage events.",
            usage_meter_slug
        ))
    })?;

    Ok((
        customer,
        NewUsageEvent {
            subscription_id: subscription.id.clone(),
            price_id: price.id.clone(),
            usage_meter_id: meter.id.clone(),
            usage_meter_slug: meter.slug.clone(),
            amount,
            transaction_id,
        },
    ))
}
