use std::sync::Arc;

use crate::ai::BonusGenerator;
use crate::error::Result;
use crate::models::{Bonus, BonusPatch, NewBonus};
use crate::notify::Notifier;
use crate::store::RecordStore;

use super::EntityService;

/// Stored bonuses plus generation of new ones for a product.
#[derive(Clone)]
pub struct BonusService {
    bonuses: EntityService<Bonus>,
    generator: Arc<dyn BonusGenerator>,
}

impl BonusService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Notifier,
        generator: Arc<dyn BonusGenerator>,
    ) -> Self {
        Self {
            bonuses: EntityService::new(store, notifier),
            generator,
        }
    }

    pub async fn generate_bonuses(&self, product_id: &str) -> Result<Vec<Bonus>> {
        self.generator.generate_bonuses(product_id).await
    }

    /// Persist a generated bonus. The returned bonus carries its record id.
    pub async fn save(&self, bonus: &Bonus) -> Option<Bonus> {
        self.bonuses.create(&NewBonus::from(bonus)).await
    }

    pub async fn get_all(&self) -> Vec<Bonus> {
        self.bonuses.get_all().await
    }

    pub async fn get_by_id(&self, id: i64) -> Option<Bonus> {
        self.bonuses.get_by_id(id).await
    }

    pub async fn update(&self, id: i64, patch: &BonusPatch) -> Option<Bonus> {
        self.bonuses.update(id, patch).await
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.bonuses.delete(id).await
    }
}
