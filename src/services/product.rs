use std::sync::Arc;

use crate::ai::ProductAnalyzer;
use crate::error::Result;
use crate::models::{NewProduct, Product, ProductPatch};
use crate::notify::Notifier;
use crate::store::RecordStore;

use super::EntityService;

#[derive(Clone)]
pub struct ProductService {
    products: EntityService<Product>,
    analyzer: Arc<dyn ProductAnalyzer>,
}

impl ProductService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Notifier,
        analyzer: Arc<dyn ProductAnalyzer>,
    ) -> Self {
        Self {
            products: EntityService::new(store, notifier),
            analyzer,
        }
    }

    /// Analyze a product page. The result is not stored; see [`ProductService::save`].
    pub async fn analyze_product(&self, url: &str) -> Result<Product> {
        self.analyzer.analyze_product(url).await
    }

    pub async fn save(&self, product: &Product) -> Option<Product> {
        self.products.create(&NewProduct::from(product)).await
    }

    pub async fn get_all(&self) -> Vec<Product> {
        self.products.get_all().await
    }

    pub async fn get_by_id(&self, id: i64) -> Option<Product> {
        self.products.get_by_id(id).await
    }

    pub async fn update(&self, id: i64, patch: &ProductPatch) -> Option<Product> {
        self.products.update(id, patch).await
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.products.delete(id).await
    }
}
