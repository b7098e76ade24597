use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Yearly,
}

impl BillingPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "/month",
            BillingPeriod::Yearly => "/year",
        }
    }
}

/// A tier on the pricing page. Display prices are marketing strings; the
/// authoritative amounts live in the billing catalog under the slugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingPlan {
    pub name: &'static str,
    pub description: &'static str,
    pub display_monthly: &'static str,
    pub display_yearly: &'static str,
    pub monthly_slug: &'static str,
    pub yearly_slug: &'static str,
    pub features: &'static [&'static str],
    pub is_popular: bool,
}

impl PricingPlan {
    pub fn price_slug(&self, period: BillingPeriod) -> &'static str {
        match period {
            BillingPeriod::Monthly => self.monthly_slug,
            BillingPeriod::Yearly => self.yearly_slug,
        }
    }

    pub fn display_price(&self, period: BillingPeriod) -> &'static str {
        match period {
            BillingPeriod::Monthly => self.display_monthly,
            BillingPeriod::Yearly => self.display_yearly,
        }
    }

    pub fn has_slug(&self, slug: &str) -> bool {
        self.monthly_slug == slug || self.yearly_slug == slug
    }
}

/// Leading decimal number of `text`, ignoring anything after it
/// (`"96/yr"` reads as 96).
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '-' | '+' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    text[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// Turns a yearly display price such as `$1,152` into its rounded monthly
/// equivalent (`$96`). Halves round up, negative ones toward zero. Strings
/// without a leading number are returned unchanged.
pub fn monthly_equivalent(yearly_price: &str) -> String {
    let cleaned: String = yearly_price
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    match leading_number(&cleaned) {
        Some(amount) if amount.is_finite() => {
            format!("${}", (amount / 12.0 + 0.5).floor() as i64)
        }
        _ => yearly_price.to_string(),
    }
}

pub const PRICING_PLANS: [PricingPlan; 4] = [
    PricingPlan {
        name: "Basic",
        description: "~200 fast generations",
        display_monthly: "$10",
        display_yearly: "$96",
        monthly_slug: "basic_monthly",
        yearly_slug: "basic_yearly",
        features: &[
            "200 Fast Generations",
            "General Commercial Terms",
            "Optional Credit Top Ups",
            "Use Within Upgraded Images",
        ],
        is_popular: false,
    },
    PricingPlan {
        name: "Standard",
        description: "360 fast generations + 30 min HD video",
        display_monthly: "$30",
        display_yearly: "$288",
        monthly_slug: "standard_monthly",
        yearly_slug: "standard_yearly",
        features: &[
            "360 Fast Generations",
            "30 HD Video Minutes",
            "General Commercial Terms",
            "Optional Credit Top Ups",
            "Unlimited Relaxed Image Generations",
            "Use Within Upgraded Images",
        ],
        is_popular: false,
    },
    PricingPlan {
        name: "Pro",
        description: "750 fast generations + 60 min HD video + Stealth",
        display_monthly: "$60",
        display_yearly: "$576",
        monthly_slug: "pro_monthly",
        yearly_slug: "pro_yearly",
        features: &[
            "750 Fast Generations",
            "60 HD Video Minutes",
            "General Commercial Terms",
            "Optional Credit Top Ups",
            "Unlimited Relaxed Image Generations",
            "Unlimited Relaxed SD Video",
            "Stealth Mode",
            "Use Within Upgraded Images",
        ],
        is_popular: true,
    },
    PricingPlan {
        name: "Mega",
        description: "900+ fast generations + 120 min HD video + Stealth",
        display_monthly: "$120",
        display_yearly: "$1,152",
        monthly_slug: "mega_monthly",
        yearly_slug: "mega_yearly",
        features: &[
            "900+ Fast Generations",
            "120 HD Video Minutes",
            "General Commercial Terms",
            "Optional Credit Top Ups",
            "Unlimited Relaxed Image Generations",
            "Unlimited Relaxed SD Video",
            "Stealth Mode",
            "Use Within Upgraded Images",
        ],
        is_popular: false,
    },
];
