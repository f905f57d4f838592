use chrono::{DateTime, Duration, Utc};

use crate::models::{
    conversion_rate, ActivityItem, ActivityKind, Bonus, BonusPage, DashboardStats, PageStatus,
};

use super::{BonusPageService, BonusService};

/// Headline numbers for the dashboard.
#[derive(Clone)]
pub struct DashboardService {
    bonuses: BonusService,
    pages: BonusPageService,
}

impl DashboardService {
    pub fn new(bonuses: BonusService, pages: BonusPageService) -> Self {
        Self { bonuses, pages }
    }

    pub async fn get_stats(&self) -> DashboardStats {
        let (bonuses, pages) = tokio::join!(self.bonuses.get_all(), self.pages.get_all());
        summarize(&bonuses, &pages)
    }

    pub async fn get_recent_activity(&self) -> Vec<ActivityItem> {
        recent_activity(Utc::now())
    }
}

fn summarize(bonuses: &[Bonus], pages: &[BonusPage]) -> DashboardStats {
    let total_views: u64 = pages.iter().map(|p| p.views).sum();
    let total_clicks: u64 = pages.iter().map(|p| p.clicks).sum();

    DashboardStats {
        total_bonuses: bonuses.len(),
        active_pages: pages
            .iter()
            .filter(|p| p.status == PageStatus::Active)
            .count(),
        total_views,
        conversion_rate: conversion_rate(total_clicks, total_views),
    }
}

fn recent_activity(now: DateTime<Utc>) -> Vec<ActivityItem> {
    let entries = [
        (ActivityKind::BonusCreated, "Created new bonus: P.E.A Profit Multiplier Toolkit", 2),
        (ActivityKind::PageCreated, "Published bonus page: 5-Day Cash Machine Course", 4),
        (ActivityKind::PageViewed, "Bonus page viewed 15 times", 6),
        (ActivityKind::ClickTracked, "Affiliate link clicked 3 times", 8),
    ];

    entries
        .into_iter()
        .zip(1..)
        .map(|((kind, description, hours_ago), id)| ActivityItem {
            id,
            kind,
            description: description.to_string(),
            timestamp: now - Duration::hours(hours_ago),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::TemplateCatalog;
    use crate::models::{BonusPagePatch, NewBonusPage};
    use crate::notify::Notifier;
    use crate::store::{MemoryStore, RecordStore};

    fn services() -> (BonusService, BonusPageService) {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let catalog = Arc::new(TemplateCatalog::new(
            std::time::Duration::ZERO,
            std::time::Duration::ZERO,
        ));
        (
            BonusService::new(Arc::clone(&store), Notifier::default(), catalog),
            BonusPageService::new(store, Notifier::default(), "http://localhost:5173"),
        )
    }

    #[tokio::test]
    async fn test_empty_dashboard_is_all_zero() {
        let (bonuses, pages) = services();
        let stats = DashboardService::new(bonuses, pages).get_stats().await;
        assert_eq!(
            stats,
            DashboardStats {
                total_bonuses: 0,
                active_pages: 0,
                total_views: 0,
                conversion_rate: 0.0,
            }
        );
    }

    #[tokio::test]
    async fn test_stats_count_active_pages_and_rate() {
        let (bonuses, pages) = services();
        let generated = bonuses.generate_bonuses("1").await.unwrap();
        let mut saved = Vec::new();
        for bonus in &generated {
            saved.push(bonuses.save(bonus).await.unwrap());
        }

        let mut page_ids = Vec::new();
        for bonus in &saved {
            let page = pages
                .try_create_page(NewBonusPage {
                    bonus_id: bonus.id.clone(),
                    title: bonus.title.clone(),
                    affiliate_link: "https://x.test".to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
            page_ids.push(page.id);
        }

        for _ in 0..3 {
            pages.track_view(page_ids[0]).await.unwrap();
        }
        pages.track_click(page_ids[0]).await.unwrap();
        pages
            .update(
                page_ids[2],
                &BonusPagePatch {
                    status: Some(PageStatus::Archived),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stats = DashboardService::new(bonuses, pages).get_stats().await;
        assert_eq!(stats.total_bonuses, 3);
        assert_eq!(stats.active_pages, 2);
        assert_eq!(stats.total_views, 3);
        assert_eq!(stats.conversion_rate, 33.3);
    }

    #[test]
    fn test_recent_activity_is_spaced_two_hours_apart() {
        let now = Utc::now();
        let activity = recent_activity(now);
        assert_eq!(activity.len(), 4);
        assert_eq!(activity[0].id, 1);
        assert_eq!(activity[0].kind, ActivityKind::BonusCreated);
        assert_eq!(activity[3].timestamp, now - Duration::hours(8));
    }
}
