use chrono::{DateTime, Duration, Utc};

use crate::models::{
    conversion_rate, Analytics, BonusPage, ChartPoint, ChartSeries, DateRange, PageActivity,
    TopPage,
};

use super::BonusPageService;

/// Average commission credited per conversion.
const REVENUE_PER_CONVERSION: u64 = 47;
const TOP_PAGE_COUNT: usize = 5;

const VIEW_SERIES: [u64; 7] = [45, 52, 38, 67, 49, 73, 61];
const CLICK_SERIES: [u64; 7] = [12, 15, 9, 18, 13, 21, 16];
const CONVERSION_SERIES: [u64; 7] = [2, 3, 1, 4, 2, 5, 3];

#[derive(Clone)]
pub struct AnalyticsService {
    pages: BonusPageService,
}

impl AnalyticsService {
    pub fn new(pages: BonusPageService) -> Self {
        Self { pages }
    }

    pub async fn get_analytics(&self, range: DateRange) -> Analytics {
        let pages = self.pages.get_all().await;
        build_analytics(range, pages, Utc::now())
    }
}

fn build_analytics(range: DateRange, mut pages: Vec<BonusPage>, now: DateTime<Utc>) -> Analytics {
    let total_views: u64 = pages.iter().map(|p| p.views).sum();
    let total_clicks: u64 = pages.iter().map(|p| p.clicks).sum();
    let total_conversions: u64 = pages.iter().map(|p| p.conversions).sum();

    pages.sort_by(|a, b| b.views.cmp(&a.views));
    let top_pages = pages
        .iter()
        .take(TOP_PAGE_COUNT)
        .map(|page| TopPage {
            id: page.id,
            title: page.title.clone(),
            views: page.views,
            clicks: page.clicks,
            conversion_rate: page.conversion_rate(),
        })
        .collect();

    Analytics {
        range,
        total_views,
        total_clicks,
        total_conversions,
        conversion_rate: conversion_rate(total_clicks, total_views),
        revenue: total_conversions * REVENUE_PER_CONVERSION,
        chart_data: vec![
            series("Views", &VIEW_SERIES, now),
            series("Clicks", &CLICK_SERIES, now),
            series("Conversions", &CONVERSION_SERIES, now),
        ],
        top_pages,
        recent_activity: page_activity(now),
    }
}

/// One point per day, the last one at `now`.
fn series(name: &str, values: &[u64], now: DateTime<Utc>) -> ChartSeries {
    let last = values.len() as i64 - 1;
    ChartSeries {
        name: name.to_string(),
        data: values
            .iter()
            .enumerate()
            .map(|(day, &y)| ChartPoint {
                x: (now - Duration::days(last - day as i64)).timestamp_millis(),
                y,
            })
            .collect(),
    }
}

fn page_activity(now: DateTime<Utc>) -> Vec<PageActivity> {
    let entries = [
        ("P.E.A Profit Multiplier Toolkit", "view", 10, "Direct"),
        ("5-Day Cash Machine Course", "click", 25, "Facebook"),
        ("Social Media Domination Pack", "view", 45, "Email"),
        ("Conversion Optimization Masterclass", "click", 60, "Twitter"),
    ];

    entries
        .into_iter()
        .zip(1..)
        .map(|((page_title, action, minutes_ago, source), id)| PageActivity {
            id,
            page_title: page_title.to_string(),
            action: action.to_string(),
            timestamp: now - Duration::minutes(minutes_ago),
            source: source.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageDesign, PageStatus};

    fn page(id: i64, views: u64, clicks: u64, conversions: u64) -> BonusPage {
        BonusPage {
            id,
            bonus_id: "1".to_string(),
            title: format!("Page {}", id),
            headline: String::new(),
            subheadline: String::new(),
            description: String::new(),
            url: format!("http://localhost:5173/bonus/page_{}", id),
            affiliate_link: "https://x.test".to_string(),
            cta_link: None,
            cta_text: "Claim Your Bonus".to_string(),
            design: PageDesign::default(),
            status: PageStatus::Active,
            views,
            clicks,
            conversions,
            video_url: None,
            bonus_explanation: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_and_revenue() {
        let pages = vec![page(1, 100, 10, 2), page(2, 50, 5, 1)];
        let analytics = build_analytics(DateRange::SevenDays, pages, Utc::now());

        assert_eq!(analytics.total_views, 150);
        assert_eq!(analytics.total_clicks, 15);
        assert_eq!(analytics.conversion_rate, 10.0);
        assert_eq!(analytics.revenue, 3 * 47);
    }

    #[test]
    fn test_top_pages_are_the_five_most_viewed() {
        let pages = (1..=7).map(|id| page(id, (id as u64) * 10, 1, 0)).collect();
        let analytics = build_analytics(DateRange::ThirtyDays, pages, Utc::now());

        let ids: Vec<_> = analytics.top_pages.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3]);
        assert_eq!(analytics.top_pages[0].conversion_rate, 1.4);
    }

    #[test]
    fn test_chart_series_cover_the_last_seven_days() {
        let now = Utc::now();
        let analytics = build_analytics(DateRange::SevenDays, Vec::new(), now);

        assert_eq!(analytics.chart_data.len(), 3);
        for series in &analytics.chart_data {
            assert_eq!(series.data.len(), 7);
            assert_eq!(series.data[6].x, now.timestamp_millis());
            assert_eq!(
                series.data[0].x,
                (now - Duration::days(6)).timestamp_millis()
            );
        }
        assert_eq!(analytics.chart_data[0].data[5].y, 73);
        assert_eq!(analytics.conversion_rate, 0.0);
        assert_eq!(analytics.recent_activity.len(), 4);
    }
}
