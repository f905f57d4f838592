use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::Config;
use crate::error::Result;
use crate::models::{Bonus, BonusContent, BonusType, Product};

use super::{BonusGenerator, ProductAnalyzer};

/// Number of templates handed out per generation run.
const BONUSES_PER_RUN: usize = 3;

struct BonusTemplate {
    title: &'static str,
    bonus_type: BonusType,
    value: &'static str,
    description: &'static str,
    target_gap: &'static str,
    components: [&'static str; 3],
}

const BONUS_TEMPLATES: [BonusTemplate; 5] = [
    BonusTemplate {
        title: "P.E.A Profit Multiplier Toolkit",
        bonus_type: BonusType::Templates,
        value: "$297",
        description: "Pre-built automation templates that amplify your P.E.A Blueprint results by 300%",
        target_gap: "No pre-built email sequences",
        components: ["Email templates", "Landing pages", "Follow-up sequences"],
    },
    BonusTemplate {
        title: "5-Day Affiliate Cash Machine Course",
        bonus_type: BonusType::Training,
        value: "$497",
        description: "Exclusive video training that turns the commission system into a 24/7 profit machine",
        target_gap: "Limited bonus creation tools",
        components: ["Video modules", "Workbooks", "Action plans"],
    },
    BonusTemplate {
        title: "Social Media Domination Pack",
        bonus_type: BonusType::Templates,
        value: "$197",
        description: "Ready-to-use social media templates that drive massive traffic to your affiliate offers",
        target_gap: "No social media templates",
        components: ["Post templates", "Story templates", "Ad creatives"],
    },
    BonusTemplate {
        title: "Conversion Optimization Masterclass",
        bonus_type: BonusType::Training,
        value: "$397",
        description: "Advanced strategies to double your conversion rates using psychological triggers",
        target_gap: "Missing conversion optimization guides",
        components: ["Video training", "Checklists", "Split-test templates"],
    },
    BonusTemplate {
        title: "High-Converting Funnel Blueprint",
        bonus_type: BonusType::Templates,
        value: "$697",
        description: "Proven funnel templates that convert cold traffic into buying customers",
        target_gap: "No advanced funnel templates",
        components: ["Funnel templates", "Copy templates", "Design assets"],
    },
];

const ANALYSIS_NAME: &str = "Automated Commission System";
const ANALYSIS_DESCRIPTION: &str = "A comprehensive affiliate marketing system that automates commission generation through the P.E.A Blueprint methodology.";
const ANALYSIS_FEATURES: [&str; 5] = [
    "P.E.A Blueprint methodology",
    "Automated commission tracking",
    "Email marketing integration",
    "Landing page templates",
    "Analytics dashboard",
];
const ANALYSIS_GAPS: [&str; 5] = [
    "No pre-built email sequences",
    "Limited bonus creation tools",
    "No social media templates",
    "Missing conversion optimization guides",
    "No advanced funnel templates",
];

/// Static stand-in for a model-backed generator.
///
/// Always answers with the same analysis and the first templates of the
/// catalog, after a fixed delay.
pub struct TemplateCatalog {
    generation_delay: Duration,
    analysis_delay: Duration,
}

impl TemplateCatalog {
    pub fn new(generation_delay: Duration, analysis_delay: Duration) -> Self {
        Self {
            generation_delay,
            analysis_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.generation_delay_ms),
            Duration::from_millis(config.analysis_delay_ms),
        )
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl BonusGenerator for TemplateCatalog {
    async fn generate_bonuses(&self, product_id: &str) -> Result<Vec<Bonus>> {
        pause(self.generation_delay).await;

        let now = Utc::now();
        let stamp = now.timestamp_millis();
        let bonuses = BONUS_TEMPLATES
            .iter()
            .take(BONUSES_PER_RUN)
            .enumerate()
            .map(|(index, template)| Bonus {
                id: format!("bonus_{}_{}", stamp, index),
                product_id: product_id.to_string(),
                title: template.title.to_string(),
                bonus_type: template.bonus_type,
                value: template.value.to_string(),
                description: template.description.to_string(),
                content: BonusContent {
                    target_gap: template.target_gap.to_string(),
                    components: template.components.iter().map(|c| c.to_string()).collect(),
                },
                created_at: now,
            })
            .collect();

        tracing::debug!(product_id, "Generated bonuses from template catalog");
        Ok(bonuses)
    }
}

#[async_trait]
impl ProductAnalyzer for TemplateCatalog {
    async fn analyze_product(&self, url: &str) -> Result<Product> {
        pause(self.analysis_delay).await;

        let now = Utc::now();
        Ok(Product {
            id: now.timestamp_millis(),
            url: url.to_string(),
            name: ANALYSIS_NAME.to_string(),
            description: ANALYSIS_DESCRIPTION.to_string(),
            features: ANALYSIS_FEATURES.iter().map(|f| f.to_string()).collect(),
            gaps: ANALYSIS_GAPS.iter().map(|g| g.to_string()).collect(),
            analyzed_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::new(Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_generates_three_complete_bonuses() {
        let bonuses = catalog().generate_bonuses("17").await.unwrap();

        assert_eq!(bonuses.len(), 3);
        for (index, bonus) in bonuses.iter().enumerate() {
            assert!(!bonus.title.is_empty());
            assert!(matches!(bonus.bonus_type, BonusType::Templates | BonusType::Training));
            assert_eq!(bonus.content.components.len(), 3);
            assert_eq!(bonus.product_id, "17");
            assert!(bonus.id.starts_with("bonus_"));
            assert!(bonus.id.ends_with(&format!("_{}", index)));
        }
    }

    #[tokio::test]
    async fn test_generation_is_not_randomized() {
        let first = catalog().generate_bonuses("1").await.unwrap();
        let second = catalog().generate_bonuses("1").await.unwrap();
        let titles = |bonuses: &[Bonus]| bonuses.iter().map(|b| b.title.clone()).collect::<Vec<_>>();

        assert_eq!(titles(&first), titles(&second));
        assert_eq!(first[0].title, "P.E.A Profit Multiplier Toolkit");
        assert_eq!(first[2].title, "Social Media Domination Pack");
    }

    #[tokio::test]
    async fn test_analysis_keeps_url_and_has_five_features_and_gaps() {
        let product = catalog()
            .analyze_product("https://example.com/product")
            .await
            .unwrap();
        assert_eq!(product.url, "https://example.com/product");
        assert_eq!(product.features.len(), 5);
        assert_eq!(product.gaps.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_waits_for_configured_delay() {
        let catalog = TemplateCatalog::new(Duration::from_secs(3), Duration::ZERO);
        let started = tokio::time::Instant::now();
        catalog.generate_bonuses("1").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
