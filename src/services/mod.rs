mod analytics;
mod api_key;
mod bonus;
mod bonus_page;
mod dashboard;
mod entity;
mod product;

use crate::models::{Charge, SalesPage, VideoTrainingScript};

pub use analytics::AnalyticsService;
pub use api_key::{ApiKeyService, ConnectionTest};
pub use bonus::BonusService;
pub use bonus_page::BonusPageService;
pub use dashboard::DashboardService;
pub use entity::EntityService;
pub use product::ProductService;

pub type ChargeService = EntityService<Charge>;
pub type SalesPageService = EntityService<SalesPage>;
pub type VideoTrainingScriptService = EntityService<VideoTrainingScript>;
