use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::ai::TemplateCatalog;
use crate::cli::{join_words, Command, RecordKind};
use crate::config::{Backend, Config};
use crate::error::{AppError, Result};
use crate::models::{
    ActivityItem, Analytics, ApiKey, Bonus, BonusPage, BonusPagePatch, BonusPatch, Charge,
    DashboardStats, Entity, NewBonusPage, Product, ProductPatch, Provider, SalesPage,
    VideoTrainingScript,
};
use crate::notify::{Notice, Notifier};
use crate::services::{
    AnalyticsService, ApiKeyService, BonusPageService, BonusService, ChargeService,
    ConnectionTest, DashboardService, ProductService, SalesPageService,
    VideoTrainingScriptService,
};
use crate::store::{MemoryStore, RecordStore, RemoteStore, SqliteStore};

const DEFAULT_PAGE_TITLE: &str = "Exclusive Bonus";
const DEFAULT_CTA_TEXT: &str = "Claim Your Bonus";

/// The result of one command, ready to be rendered as text or JSON.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Output {
    Dashboard {
        stats: DashboardStats,
        activity: Vec<ActivityItem>,
    },
    Product(Product),
    Products(Vec<Product>),
    Bonuses(Vec<Bonus>),
    Page(BonusPage),
    Pages(Vec<BonusPage>),
    Deleted {
        entity: &'static str,
        id: i64,
        deleted: bool,
    },
    Redirect {
        id: i64,
        target: String,
    },
    Analytics(Analytics),
    Keys(Vec<ApiKey>),
    KeyRemoved {
        provider: Provider,
        removed: bool,
    },
    Connection {
        provider: Provider,
        result: ConnectionTest,
    },
    Charges(Vec<Charge>),
    SalesPages(Vec<SalesPage>),
    Scripts(Vec<VideoTrainingScript>),
    /// The command failed in a way already reported through a notice.
    Nothing,
    Quit,
}

pub struct App {
    dashboard: DashboardService,
    analytics: AnalyticsService,
    products: ProductService,
    bonuses: BonusService,
    pages: BonusPageService,
    api_keys: ApiKeyService,
    charges: ChargeService,
    sales_pages: SalesPageService,
    scripts: VideoTrainingScriptService,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn RecordStore> = match config.backend {
            Backend::Sqlite => Arc::new(SqliteStore::new(&config.db_path).await?),
            Backend::Remote => Arc::new(RemoteStore::from_config(config)?),
            Backend::Memory => Arc::new(MemoryStore::new()),
        };
        tracing::debug!(backend = ?config.backend, "Record store ready");

        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        let (notifier, notices) = Notifier::channel();
        let catalog = Arc::new(TemplateCatalog::from_config(config));

        let bonuses = BonusService::new(Arc::clone(&store), notifier.clone(), catalog.clone());
        let pages = BonusPageService::new(
            Arc::clone(&store),
            notifier.clone(),
            &config.public_base_url,
        );

        Self {
            dashboard: DashboardService::new(bonuses.clone(), pages.clone()),
            analytics: AnalyticsService::new(pages.clone()),
            products: ProductService::new(Arc::clone(&store), notifier.clone(), catalog),
            bonuses,
            pages,
            api_keys: ApiKeyService::new(
                Arc::clone(&store),
                notifier.clone(),
                Duration::from_millis(config.connection_test_delay_ms),
            ),
            charges: ChargeService::new(Arc::clone(&store), notifier.clone()),
            sales_pages: SalesPageService::new(Arc::clone(&store), notifier.clone()),
            scripts: VideoTrainingScriptService::new(store, notifier),
            notices,
        }
    }

    /// Notices produced since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            drained.push(notice);
        }
        drained
    }

    pub async fn handle_command(&self, command: Command) -> Result<Output> {
        let output = match command {
            Command::Dashboard => {
                let (stats, activity) = tokio::join!(
                    self.dashboard.get_stats(),
                    self.dashboard.get_recent_activity()
                );
                Output::Dashboard { stats, activity }
            }

            Command::Analyze { url } => {
                let product = self.products.analyze_product(&url).await?;
                let saved = self.products.save(&product).await;
                Output::Product(saved.unwrap_or(product))
            }

            Command::Products => Output::Products(self.products.get_all().await),

            Command::Product { id } => Output::Product(
                self.products
                    .get_by_id(id)
                    .await
                    .ok_or_else(|| AppError::not_found(Product::NAME, id))?,
            ),

            Command::RenameProduct { id, name } => {
                let patch = ProductPatch {
                    name: join_words(&name),
                    ..Default::default()
                };
                self.products
                    .update(id, &patch)
                    .await
                    .map_or(Output::Nothing, Output::Product)
            }

            Command::DeleteProduct { id } => Output::Deleted {
                entity: Product::LABEL,
                id,
                deleted: self.products.delete(id).await,
            },

            Command::Generate { product_id } => {
                let generated = self.bonuses.generate_bonuses(&product_id).await?;
                let mut saved = Vec::with_capacity(generated.len());
                for bonus in generated {
                    match self.bonuses.save(&bonus).await {
                        Some(stored) => saved.push(stored),
                        None => saved.push(bonus),
                    }
                }
                Output::Bonuses(saved)
            }

            Command::Bonuses => Output::Bonuses(self.bonuses.get_all().await),

            Command::SetBonusValue { id, value } => {
                let patch = BonusPatch {
                    value: Some(value),
                    ..Default::default()
                };
                match self.bonuses.update(id, &patch).await {
                    Some(bonus) => Output::Bonuses(vec![bonus]),
                    None => Output::Nothing,
                }
            }

            Command::DeleteBonus { id } => Output::Deleted {
                entity: Bonus::LABEL,
                id,
                deleted: self.bonuses.delete(id).await,
            },

            Command::CreatePage {
                bonus_id,
                affiliate_link,
                title,
            } => {
                let bonus = match bonus_id.trim().parse() {
                    Ok(id) => self.bonuses.get_by_id(id).await,
                    Err(_) => None,
                };
                let title = join_words(&title)
                    .or_else(|| bonus.as_ref().map(|b| b.title.clone()))
                    .unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_string());
                let page = NewBonusPage {
                    headline: title.clone(),
                    description: bonus
                        .as_ref()
                        .map(|b| b.description.clone())
                        .unwrap_or_default(),
                    bonus_id,
                    title,
                    affiliate_link,
                    cta_text: DEFAULT_CTA_TEXT.to_string(),
                    ..Default::default()
                };
                self.pages
                    .create_page(page)
                    .await
                    .map_or(Output::Nothing, Output::Page)
            }

            Command::Pages => Output::Pages(self.pages.get_all().await),

            Command::Page { id } => Output::Page(
                self.pages
                    .get_by_id(id)
                    .await
                    .ok_or_else(|| AppError::not_found(BonusPage::NAME, id))?,
            ),

            Command::SetPageStatus { id, status } => {
                let patch = BonusPagePatch {
                    status: Some(status),
                    ..Default::default()
                };
                self.pages
                    .update(id, &patch)
                    .await
                    .map_or(Output::Nothing, Output::Page)
            }

            Command::DeletePage { id } => Output::Deleted {
                entity: BonusPage::LABEL,
                id,
                deleted: self.pages.delete(id).await,
            },

            Command::View { id } => Output::Page(self.pages.open_public_page(id).await?),

            Command::Claim { id } => Output::Redirect {
                id,
                target: self.pages.claim_bonus(id).await?,
            },

            Command::Analytics { range } => {
                Output::Analytics(self.analytics.get_analytics(range).await)
            }

            Command::Keys => Output::Keys(self.api_keys.get_all().await),

            Command::SetKey { provider, secret } => {
                match self.api_keys.create(provider, &secret).await {
                    Some(key) => Output::Keys(vec![key]),
                    None => Output::Nothing,
                }
            }

            Command::DeleteKey { provider } => Output::KeyRemoved {
                provider,
                removed: self.api_keys.delete(provider).await,
            },

            Command::EnableKey { provider } => self.set_key_active(provider, true).await,
            Command::DisableKey { provider } => self.set_key_active(provider, false).await,

            Command::TestKey { provider } => {
                let result = match self.api_keys.test_connection(provider).await {
                    Ok(result) => result,
                    Err(e @ AppError::ConnectionFailed(_)) => ConnectionTest {
                        success: false,
                        message: e.to_string(),
                    },
                    Err(e) => return Err(e),
                };
                Output::Connection { provider, result }
            }

            Command::Records { kind } => match kind {
                RecordKind::Charges => Output::Charges(self.charges.get_all().await),
                RecordKind::SalesPages => Output::SalesPages(self.sales_pages.get_all().await),
                RecordKind::Scripts => Output::Scripts(self.scripts.get_all().await),
            },

            Command::Quit => Output::Quit,
        };

        Ok(output)
    }

    async fn set_key_active(&self, provider: Provider, active: bool) -> Output {
        match self.api_keys.set_active(provider, active).await {
            Some(key) => Output::Keys(vec![key]),
            None => Output::Nothing,
        }
    }
}
