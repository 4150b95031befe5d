//! Resolution labels and their bucket sizes
//!
//! Day, week and month suffixes use fixed multipliers (1440, 10080 and 43200
//! minutes). A "1M" bucket is therefore always 30 days, not a calendar month.
use chrono::Duration;
use tracing::{info, warn};

use crate::error::{ChartError, Result};

/// Resolutions used when the configuration lists none
pub const DEFAULT_RESOLUTIONS: [&str; 4] = ["30", "60", "360", "1D"];

const MINUTES_PER_DAY: i64 = 1440;
const MINUTES_PER_WEEK: i64 = 10080;
const MINUTES_PER_MONTH: i64 = 43200;

/// Largest accepted bucket: ten years
pub const MAX_BUCKET_MINUTES: i64 = 10 * 365 * MINUTES_PER_DAY;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resolution {
    label: String,
    bucket_minutes: i64,
    bucket: Duration,
}

impl Resolution {
    /// Parse a TradingView resolution label such as "30", "1D", "2W" or "1M"
    pub fn parse(label: &str) -> Result<Self> {
        let (digits, multiplier) = match label.chars().last() {
            Some('D') => (&label[..label.len() - 1], MINUTES_PER_DAY),
            Some('W') => (&label[..label.len() - 1], MINUTES_PER_WEEK),
            Some('M') => (&label[..label.len() - 1], MINUTES_PER_MONTH),
            _ => (label, 1),
        };

        let count: i64 = digits
            .parse()
            .map_err(|_| ChartError::InvalidResolution(label.to_string()))?;

        let bucket_minutes = count
            .checked_mul(multiplier)
            .filter(|m| (1..=MAX_BUCKET_MINUTES).contains(m))
            .ok_or_else(|| ChartError::InvalidResolution(label.to_string()))?;
        let bucket = Duration::try_minutes(bucket_minutes)
            .ok_or_else(|| ChartError::InvalidResolution(label.to_string()))?;

        Ok(Resolution {
            label: label.to_string(),
            bucket_minutes,
            bucket,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bucket_minutes(&self) -> i64 {
        self.bucket_minutes
    }

    pub fn bucket(&self) -> Duration {
        self.bucket
    }
}

/// Configured resolutions, in configuration order
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    resolutions: Vec<Resolution>,
}

impl ResolutionTable {
    /// Build the table from configured labels. Labels that do not parse are
    /// logged and dropped.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let labels: Vec<&str> = if labels.is_empty() {
            DEFAULT_RESOLUTIONS.to_vec()
        } else {
            labels.iter().map(|l| l.as_ref()).collect()
        };

        let mut resolutions = Vec::with_capacity(labels.len());
        for label in labels {
            match Resolution::parse(label) {
                Ok(resolution) => {
                    if resolutions
                        .iter()
                        .any(|r: &Resolution| r.label == resolution.label)
                    {
                        warn!("Duplicate resolution label ignored: {}", label);
                        continue;
                    }
                    resolutions.push(resolution);
                }
                Err(e) => warn!("Dropping resolution: {}", e),
            }
        }

        info!(
            "Supported resolutions: {:?} => minutes: {:?}",
            resolutions.iter().map(|r| r.label()).collect::<Vec<_>>(),
            resolutions
                .iter()
                .map(|r| r.bucket_minutes())
                .collect::<Vec<_>>()
        );

        ResolutionTable { resolutions }
    }

    pub fn get(&self, label: &str) -> Option<&Resolution> {
        self.resolutions.iter().find(|r| r.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
        self.resolutions.iter()
    }

    pub fn labels(&self) -> Vec<String> {
        self.resolutions.iter().map(|r| r.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }
}
