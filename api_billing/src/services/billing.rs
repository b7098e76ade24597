use plans::FREE_PLAN_SLUG;

use crate::models::billing::{
    BillingSnapshot, Catalog, CustomerSubscription, Price, PriceKind, Product, UsageMeter,
};

/// The subscription the app treats as current: the first one reported.
pub fn current_subscription(snapshot: &BillingSnapshot) -> Option<&CustomerSubscription> {
    snapshot.current_subscriptions.first()
}

pub fn find_price_by_id<'a>(catalog: &'a Catalog, price_id: &str) -> Option<(&'a Product, &'a Price)> {
    catalog.products.iter().find_map(|product| {
        product
            .prices
            .iter()
            .find(|price| price.id == price_id)
            .map(|price| (product, price))
    })
}

pub fn find_price_by_slug<'a>(catalog: &'a Catalog, slug: &str) -> Option<(&'a Product, &'a Price)> {
    catalog.products.iter().find_map(|product| {
        product
            .prices
            .iter()
            .find(|price| price.slug.as_deref() == Some(slug))
            .map(|price| (product, price))
    })
}

/// Whether the price named by `slug` belongs to the default (free) product.
/// Unknown slugs are not default.
pub fn is_default_price_slug(catalog: &Catalog, slug: &str) -> bool {
    find_price_by_slug(catalog, slug)
        .map(|(product, _)| product.default)
        .unwrap_or(false)
}

/// Plan slug for a subscription price, looked up through the catalog since
/// subscriptions only carry the price identifier.
pub fn plan_slug_for_price<'a>(catalog: &'a Catalog, price_id: &str) -> Option<&'a str> {
    find_price_by_id(catalog, price_id).and_then(|(_, price)| price.slug.as_deref())
}

/// Current plan of the customer: the free plan without a subscription, None
/// when the subscribed price cannot be matched to a slug.
pub fn resolve_plan_slug(snapshot: &BillingSnapshot) -> Option<String> {
    match current_subscription(snapshot) {
        None => Some(FREE_PLAN_SLUG.to_string()),
        Some(subscription) => {
            plan_slug_for_price(&snapshot.catalog, &subscription.price_id).map(str::to_string)
        }
    }
}

pub fn find_meter_by_slug<'a>(catalog: &'a Catalog, slug: &str) -> Option<&'a UsageMeter> {
    catalog.usage_meters.iter().find(|meter| meter.slug == slug)
}

/// The usage-type price billing events of the given meter.
pub fn find_usage_price<'a>(catalog: &'a Catalog, usage_meter_id: &str) -> Option<&'a Price> {
    catalog
        .products
        .iter()
        .flat_map(|product| product.prices.iter())
        .find(|price| {
            price.kind == PriceKind::Usage && price.usage_meter_id.as_deref() == Some(usage_meter_id)
        })
}
