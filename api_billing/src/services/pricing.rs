use plans::{BillingPeriod, PRICING_PLANS, pricing::monthly_equivalent};

use super::billing::{find_price_by_slug, is_default_price_slug};
use crate::{dtos::billing::PricingTier, models::billing::Catalog};

/// Annotates the static tiers with live catalog data for one billing period.
pub fn pricing_tiers(
    period: BillingPeriod,
    catalog: &Catalog,
    current_plan_slug: Option<&str>,
) -> Vec<PricingTier> {
    PRICING_PLANS
        .iter()
        .map(|plan| {
            let price_slug = plan.price_slug(period);
            let display_price = plan.display_price(period);
            let is_default = is_default_price_slug(catalog, price_slug);
            let monthly_equivalent = (period == BillingPeriod::Yearly && !is_default)
                .then(|| monthly_equivalent(display_price));

            PricingTier {
                name: plan.name,
                description: plan.description,
                price_slug,
                price_id: find_price_by_slug(catalog, price_slug).map(|(_, p)| p.id.clone()),
                display_price,
                period_label: period.label(),
                monthly_equivalent,
                features: plan.features,
                is_popular: plan.is_popular,
                is_default,
                is_current: current_plan_slug.is_some_and(|slug| plan.has_slug(slug)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::billing::fixtures::catalog;

    #[test]
    fn monthly_tiers_have_no_equivalent() {
        let tiers = pricing_tiers(BillingPeriod::Monthly, &catalog(), None);
        assert_eq!(tiers.len(), 4);
        assert!(tiers.iter().all(|t| t.monthly_equivalent.is_none()));
        assert!(tiers.iter().all(|t| t.period_label == "/month"));
        assert_eq!(tiers[0].price_slug, "basic_monthly");
    }

    #[test]
    fn yearly_tiers_show_monthly_equivalent() {
        let tiers = pricing_tiers(BillingPeriod::Yearly, &catalog(), None);
        let mega = tiers.iter().find(|t| t.name == "Mega").unwrap();
        assert_eq!(mega.display_price, "$1,152");
        assert_eq!(mega.monthly_equivalent.as_deref(), Some("$96"));
        assert_eq!(mega.period_label, "/year");
    }

    #[test]
    fn current_plan_matches_either_period() {
        let catalog = catalog();
        let tiers = pricing_tiers(BillingPeriod::Yearly, &catalog, Some("pro_monthly"));
        let pro = tiers.iter().find(|t| t.name == "Pro").unwrap();
        assert!(pro.is_current);
        assert!(pro.is_popular);
        assert_eq!(pro.price_id.as_deref(), Some("price_pro_y"));
        assert_eq!(tiers.iter().filter(|t| t.is_current).count(), 1);
    }

    #[test]
    fn tiers_missing_from_catalog_have_no_price_id() {
        let tiers = pricing_tiers(BillingPeriod::Monthly, &catalog(), Some("free"));
        let basic = tiers.iter().find(|t| t.name == "Basic").unwrap();
        assert_eq!(basic.price_id, None);
        assert!(!basic.is_default);
        assert!(tiers.iter().all(|t| !t.is_current));
    }
}
