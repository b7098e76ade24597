//! Static plan catalog for the generation app: which usage meters exist, how
//! much of each a plan includes, how remaining balances turn into progress,
//! and the tiers shown on the pricing page.

pub mod allowance;
pub mod meter;
pub mod pricing;
pub mod progress;

pub use allowance::{FREE_PLAN_SLUG, usage_total_for_meter_slug, usage_total_for_plan};
pub use meter::UsageMeterSlug;
pub use pricing::{BillingPeriod, PRICING_PLANS, PricingPlan};
pub use progress::{UsageProgress, usage_percentage};
