use serde::Serialize;

/// Share of the allowance still left, as shown on a progress bar.
///
/// Zero when the plan grants nothing for the meter; a negative remote
/// balance counts as nothing left.
pub fn usage_percentage(remaining: i64, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    remaining.max(0) as f64 / f64::from(total) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageProgress {
    pub remaining: i64,
    pub total: u32,
    pub percentage: f64,
}

impl UsageProgress {
    pub fn new(remaining: i64, total: u32) -> Self {
        Self {
            remaining,
            total,
            percentage: usage_percentage(remaining, total),
        }
    }

    /// Generation actions drawing on this meter are enabled only while
    /// something remains.
    pub fn is_available(&self) -> bool {
        self.remaining > 0
    }
}
