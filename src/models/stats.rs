use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Clicks per hundred views, rounded to one decimal. Zero when there are no views.
pub fn conversion_rate(clicks: u64, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    let rate = clicks as f64 / views as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_bonuses: usize,
    pub active_pages: usize,
    pub total_views: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    BonusCreated,
    PageCreated,
    PageViewed,
    ClickTracked,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateRange {
    #[default]
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
    #[serde(rename = "90days")]
    NinetyDays,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DateRange::SevenDays => "7days",
            DateRange::ThirtyDays => "30days",
            DateRange::NinetyDays => "90days",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DateRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "7days" | "7" => Ok(DateRange::SevenDays),
            "30days" | "30" => Ok(DateRange::ThirtyDays),
            "90days" | "90" => Ok(DateRange::NinetyDays),
            other => Err(AppError::Validation(format!("unknown date range: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Milliseconds since the epoch.
    pub x: i64,
    pub y: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPage {
    pub id: i64,
    pub title: String,
    pub views: u64,
    pub clicks: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageActivity {
    pub id: u32,
    pub page_title: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub range: DateRange,
    pub total_views: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    pub conversion_rate: f64,
    pub revenue: u64,
    pub chart_data: Vec<ChartSeries>,
    pub top_pages: Vec<TopPage>,
    pub recent_activity: Vec<PageActivity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_rate_rounds_to_one_decimal() {
        assert_eq!(conversion_rate(1, 3), 33.3);
        assert_eq!(conversion_rate(2, 3), 66.7);
        assert_eq!(conversion_rate(5, 5), 100.0);
    }

    #[test]
    fn test_conversion_rate_without_views_is_zero() {
        assert_eq!(conversion_rate(4, 0), 0.0);
    }

    #[test]
    fn test_date_range_round_trips_through_display() {
        for range in [DateRange::SevenDays, DateRange::ThirtyDays, DateRange::NinetyDays] {
            assert_eq!(range.to_string().parse::<DateRange>().unwrap(), range);
        }
        assert!("yesterday".parse::<DateRange>().is_err());
    }
}
