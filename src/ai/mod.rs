mod catalog;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Bonus, Product};

pub use catalog::TemplateCatalog;

/// Produces bonus ideas for an analyzed product.
#[async_trait]
pub trait BonusGenerator: Send + Sync {
    async fn generate_bonuses(&self, product_id: &str) -> Result<Vec<Bonus>>;
}

/// Turns a product URL into a feature and gap analysis.
#[async_trait]
pub trait ProductAnalyzer: Send + Sync {
    async fn analyze_product(&self, url: &str) -> Result<Product>;
}
