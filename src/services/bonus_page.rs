use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{
    Bonus, BonusPage, BonusPagePatch, Entity, NewBonusPage, PageStatus,
};
use crate::notify::Notifier;
use crate::store::RecordStore;

use super::EntityService;

const VIEWS_FIELD: &str = "views";
const CLICKS_FIELD: &str = "clicks";

/// Bonus pages: the page builder, CRUD, and view/click tracking.
#[derive(Clone)]
pub struct BonusPageService {
    pages: EntityService<BonusPage>,
    bonuses: EntityService<Bonus>,
    public_base_url: String,
}

impl BonusPageService {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Notifier, public_base_url: &str) -> Self {
        Self {
            pages: EntityService::new(Arc::clone(&store), notifier.clone()),
            bonuses: EntityService::new(store, notifier),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_all(&self) -> Vec<BonusPage> {
        self.pages.get_all().await
    }

    pub async fn get_by_id(&self, id: i64) -> Option<BonusPage> {
        self.pages.get_by_id(id).await
    }

    pub async fn update(&self, id: i64, patch: &BonusPagePatch) -> Option<BonusPage> {
        self.pages.update(id, patch).await
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.pages.delete(id).await
    }

    /// Build a page for a stored bonus. The page goes live immediately with
    /// zeroed counters and a public URL under `/bonus/`.
    pub async fn try_create_page(&self, mut page: NewBonusPage) -> Result<BonusPage> {
        if page.affiliate_link.trim().is_empty() {
            return Err(AppError::Validation(
                "Please enter your affiliate link".to_string(),
            ));
        }

        let bonus_id: i64 = page.bonus_id.trim().parse().map_err(|_| {
            AppError::Validation(format!("bonus {} has not been saved", page.bonus_id))
        })?;
        if self.bonuses.try_get_by_id(bonus_id).await?.is_none() {
            return Err(AppError::not_found(Bonus::NAME, bonus_id));
        }

        page.url = format!(
            "{}/bonus/page_{}",
            self.public_base_url,
            Utc::now().timestamp_millis()
        );
        page.status = PageStatus::Active;
        self.pages.try_create(&page).await
    }

    pub async fn create_page(&self, page: NewBonusPage) -> Option<BonusPage> {
        let notifier = self.pages.notifier();
        match self.try_create_page(page).await {
            Ok(page) => {
                notifier.success("Bonus page created successfully!");
                Some(page)
            }
            Err(AppError::Validation(message)) => {
                notifier.error(message);
                None
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Bonus page for a missing bonus: {}", e);
                notifier.error("Save the bonus before building its page");
                None
            }
            Err(e) => {
                tracing::error!("Error creating bonus page: {}", e);
                notifier.error("Failed to create bonus page");
                None
            }
        }
    }

    /// Count one view. Returns the new view count.
    pub async fn track_view(&self, id: i64) -> Result<u64> {
        self.increment(id, VIEWS_FIELD).await
    }

    /// Count one click. Returns the new click count.
    pub async fn track_click(&self, id: i64) -> Result<u64> {
        self.increment(id, CLICKS_FIELD).await
    }

    async fn increment(&self, id: i64, field: &str) -> Result<u64> {
        let record = self
            .pages
            .store()
            .increment_field(BonusPage::NAME, id, field, 1)
            .await?;
        let count = record
            .get(field)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        tracing::debug!(id, field, count, "Tracked bonus page event");
        Ok(count)
    }

    /// Load the public page for a visitor and count the visit.
    pub async fn open_public_page(&self, id: i64) -> Result<BonusPage> {
        let mut page = self
            .pages
            .try_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(BonusPage::NAME, id))?;
        page.views = self.track_view(id).await?;
        Ok(page)
    }

    /// Record a click on the call to action and return where to send the visitor.
    pub async fn claim_bonus(&self, id: i64) -> Result<String> {
        let page = self
            .pages
            .try_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(BonusPage::NAME, id))?;
        self.track_click(id).await?;
        Ok(page.resolve_redirect().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BonusContent, BonusType, NewBonus, PageDesign};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<dyn RecordStore>,
        service: BonusPageService,
        bonus_id: String,
    }

    async fn setup() -> Fixture {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let bonuses: EntityService<Bonus> =
            EntityService::new(Arc::clone(&store), Notifier::default());
        let bonus = bonuses
            .try_create(&NewBonus {
                product_id: "1".to_string(),
                title: "Social Media Domination Pack".to_string(),
                bonus_type: BonusType::Templates,
                value: "$197".to_string(),
                description: "Ready-to-use templates".to_string(),
                content: BonusContent {
                    target_gap: "No social media templates".to_string(),
                    components: vec!["Post templates".to_string()],
                },
            })
            .await
            .unwrap();

        Fixture {
            service: BonusPageService::new(
                Arc::clone(&store),
                Notifier::default(),
                "https://bonus.example.test/",
            ),
            store,
            bonus_id: bonus.id,
        }
    }

    fn new_page(bonus_id: &str) -> NewBonusPage {
        NewBonusPage {
            bonus_id: bonus_id.to_string(),
            title: "Get the pack free".to_string(),
            headline: "Exclusive bonus".to_string(),
            affiliate_link: "https://x.test".to_string(),
            cta_text: "Claim Your Bonus".to_string(),
            design: PageDesign {
                background_color: "#111111".to_string(),
                primary_color: "#22AA22".to_string(),
                accent_color: "#FFAA00".to_string(),
            },
            status: PageStatus::Draft,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_page_goes_live_with_public_url() {
        let fx = setup().await;
        let page = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();

        assert_eq!(page.status, PageStatus::Active);
        assert_eq!((page.views, page.clicks, page.conversions), (0, 0, 0));
        assert!(page.url.starts_with("https://bonus.example.test/bonus/page_"));
    }

    #[tokio::test]
    async fn test_design_survives_create_and_fetch() {
        let fx = setup().await;
        let created = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();
        let fetched = fx.service.get_by_id(created.id).await.unwrap();

        assert_eq!(fetched.design, new_page(&fx.bonus_id).design);
    }

    #[tokio::test]
    async fn test_create_page_requires_affiliate_link() {
        let fx = setup().await;
        let mut page = new_page(&fx.bonus_id);
        page.affiliate_link = "  ".to_string();

        let err = fx.service.try_create_page(page).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_page_for_missing_bonus_asks_to_save_it() {
        let fx = setup().await;
        let (notifier, mut rx) = Notifier::channel();
        let service = BonusPageService::new(Arc::clone(&fx.store), notifier, "https://b.test");

        assert!(service.create_page(new_page("999")).await.is_none());
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.message, "Save the bonus before building its page");
    }

    #[tokio::test]
    async fn test_create_page_requires_existing_bonus() {
        let fx = setup().await;
        let err = fx.service.try_create_page(new_page("999")).await.unwrap_err();
        assert!(err.is_not_found());

        let unsaved = fx
            .service
            .create_page(new_page("bonus_1700000000000_0"))
            .await;
        assert!(unsaved.is_none());
    }

    #[tokio::test]
    async fn test_sequential_views_add_up() {
        let fx = setup().await;
        let page = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();

        fx.service.track_view(page.id).await.unwrap();
        fx.service.track_view(page.id).await.unwrap();

        let fetched = fx.service.get_by_id(page.id).await.unwrap();
        assert_eq!(fetched.views, page.views + 2);
        assert_eq!(fetched.clicks, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clicks_are_all_counted() {
        let fx = setup().await;
        let page = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let service = fx.service.clone();
                tokio::spawn(async move { service.track_click(page.id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fx.service.get_by_id(page.id).await.unwrap().clicks, 25);
    }

    #[tokio::test]
    async fn test_tracking_unknown_page_is_not_found() {
        let fx = setup().await;
        assert!(fx.service.track_view(404).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_claim_redirects_to_affiliate_link_without_cta() {
        let fx = setup().await;
        let page = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();

        let target = fx.service.claim_bonus(page.id).await.unwrap();
        assert_eq!(target, "https://x.test");
        assert_eq!(fx.service.get_by_id(page.id).await.unwrap().clicks, 1);
    }

    #[tokio::test]
    async fn test_claim_prefers_cta_link() {
        let fx = setup().await;
        let mut draft = new_page(&fx.bonus_id);
        draft.cta_link = Some("https://cta.test/offer".to_string());
        let page = fx.service.try_create_page(draft).await.unwrap();

        assert_eq!(fx.service.claim_bonus(page.id).await.unwrap(), "https://cta.test/offer");
    }

    #[tokio::test]
    async fn test_open_public_page_counts_the_view() {
        let fx = setup().await;
        let page = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();

        let opened = fx.service.open_public_page(page.id).await.unwrap();
        assert_eq!(opened.views, 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_page_leaves_others() {
        let fx = setup().await;
        fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();
        fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();

        assert!(!fx.service.delete(12345).await);
        assert_eq!(fx.service.get_all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_cannot_touch_counters() {
        let fx = setup().await;
        let page = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();
        fx.service.track_view(page.id).await.unwrap();

        let patch = BonusPagePatch {
            status: Some(PageStatus::Archived),
            headline: Some("Last chance".to_string()),
            ..Default::default()
        };
        let updated = fx.service.update(page.id, &patch).await.unwrap();
        assert_eq!(updated.status, PageStatus::Archived);
        assert_eq!(updated.headline, "Last chance");
        assert_eq!(updated.views, 1);
        assert_eq!(updated.title, page.title);
    }

    #[tokio::test]
    async fn test_get_all_skips_page_with_broken_design() {
        let fx = setup().await;
        let good = fx.service.try_create_page(new_page(&fx.bonus_id)).await.unwrap();

        let mut broken = crate::store::Record::new();
        broken.insert("Name".to_string(), "Broken".into());
        broken.insert("design".to_string(), "{not json".into());
        fx.store
            .create_records(BonusPage::NAME, vec![broken])
            .await
            .unwrap()
            .into_records(BonusPage::NAME, "create")
            .unwrap();

        let pages = fx.service.get_all().await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].id, good.id);
    }
}
