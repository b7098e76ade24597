use std::fmt;

use serde::{Deserialize, Serialize};

/// Countable resources consumed by generation actions and tracked by billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMeterSlug {
    FastGenerations,
    HdVideoMinutes,
}

impl UsageMeterSlug {
    pub const ALL: [UsageMeterSlug; 2] = [
        UsageMeterSlug::FastGenerations,
        UsageMeterSlug::HdVideoMinutes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageMeterSlug::FastGenerations => "fast_generations",
            UsageMeterSlug::HdVideoMinutes => "hd_video_minutes",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|meter| meter.as_str() == slug)
    }
}

impl fmt::Display for UsageMeterSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
