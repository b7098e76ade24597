use plans::UsageMeterSlug;
use serde::{Deserialize, Serialize};

use crate::models::billing::UsageEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEventRequest {
    pub usage_meter_slug: Option<String>,
    pub amount: Option<i64>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEventResponse {
    pub success: bool,
    pub usage_event: UsageEvent,
}

#[derive(Debug, Serialize)]
pub struct MeterUsage {
    pub usage_meter_slug: UsageMeterSlug,
    pub total: u32,
    pub remaining: i64,
    pub percentage: f64,
    /// Whether generation actions metered here may run.
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct UsageReport {
    /// None when the subscription's price is missing from the catalog.
    pub plan_slug: Option<String>,
    pub subscription_id: Option<String>,
    pub meters: Vec<MeterUsage>,
}

impl UsageReport {
    pub fn meter(&self, slug: UsageMeterSlug) -> Option<&MeterUsage> {
        self.meters.iter().find(|m| m.usage_meter_slug == slug)
    }
}
