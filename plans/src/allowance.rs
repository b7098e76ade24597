use serde::Serialize;

use crate::meter::UsageMeterSlug;

/// Plan assumed when a customer has no subscription.
pub const FREE_PLAN_SLUG: &str = "free";

/// Per-meter allowance included with a plan for one billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanUsageTotals {
    pub fast_generations: u32,
    pub hd_video_minutes: u32,
}

impl PlanUsageTotals {
    const fn new(fast_generations: u32, hd_video_minutes: u32) -> Self {
        Self {
            fast_generations,
            hd_video_minutes,
        }
    }

    pub fn get(&self, meter: UsageMeterSlug) -> u32 {
        match meter {
            UsageMeterSlug::FastGenerations => self.fast_generations,
            UsageMeterSlug::HdVideoMinutes => self.hd_video_minutes,
        }
    }
}

pub const PLAN_USAGE_TOTALS: &[(&str, PlanUsageTotals)] = &[
    (FREE_PLAN_SLUG, PlanUsageTotals::new(0, 0)),
    ("basic_monthly", PlanUsageTotals::new(200, 0)),
    ("basic_yearly", PlanUsageTotals::new(200, 0)),
    ("standard_monthly", PlanUsageTotals::new(360, 30)),
    ("standard_yearly", PlanUsageTotals::new(360, 30)),
    ("pro_monthly", PlanUsageTotals::new(750, 60)),
    ("pro_yearly", PlanUsageTotals::new(750, 60)),
    ("mega_monthly", PlanUsageTotals::new(900, 120)),
    ("mega_yearly", PlanUsageTotals::new(900, 120)),
];

pub fn plan_usage_totals(plan_slug: &str) -> Option<&'static PlanUsageTotals> {
    PLAN_USAGE_TOTALS
        .iter()
        .find(|(slug, _)| *slug == plan_slug)
        .map(|(_, totals)| totals)
}

/// Allowance of `meter` included in `plan_slug`, zero for unknown plans.
pub fn usage_total_for_plan(plan_slug: &str, meter: UsageMeterSlug) -> u32 {
    plan_usage_totals(plan_slug)
        .map(|totals| totals.get(meter))
        .unwrap_or(0)
}

/// Same lookup keyed by a raw meter slug; unknown meters yield zero.
pub fn usage_total_for_meter_slug(plan_slug: &str, meter_slug: &str) -> u32 {
    UsageMeterSlug::from_slug(meter_slug)
        .map(|meter| usage_total_for_plan(plan_slug, meter))
        .unwrap_or(0)
}
