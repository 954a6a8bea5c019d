//! Template pools for experiment variants
//!
//! Pools are plain configuration data: load them from the `experiments.templates`
//! config section or use the defaults below.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the content title inside title templates
pub const TOPIC_PLACEHOLDER: &str = "{topic}";

/// Variant text pools and fallbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantTemplates {
    /// Title templates containing `{topic}`; drawn in shuffled order
    pub titles: Vec<String>,

    /// Calls to action, drawn in order
    pub ctas: Vec<String>,

    /// Stand-in topic when the base content has no title
    pub placeholder_topic: String,

    /// Synthetic control title when nothing else could be produced
    pub fallback_title: String,

    /// Synthetic control CTA when nothing else could be produced
    pub fallback_cta: String,
}

impl Default for VariantTemplates {
    fn default() -> Self {
        Self {
            titles: vec![
                "The Ultimate Guide to {topic}".to_string(),
                "{topic}: What Nobody Tells You".to_string(),
                "10 {topic} Hacks You Need to Try".to_string(),
                "{topic} Explained in Simple Terms".to_string(),
                "How to Master {topic} in 2025".to_string(),
            ],
            ctas: vec![
                "Subscribe for weekly insights".to_string(),
                "Try the template (free)".to_string(),
                "DM me 'READY' for the guide".to_string(),
                "Join 1,000+ builders learning growth".to_string(),
                "Start your 7-day free trial".to_string(),
            ],
            placeholder_topic: "Your Topic".to_string(),
            fallback_title: "Your Topic: A Practical Guide".to_string(),
            fallback_cta: "Learn more".to_string(),
        }
    }
}

impl VariantTemplates {
    /// Render one title template for `topic`
    pub fn render_title(template: &str, topic: &str) -> String {
        template.replace(TOPIC_PLACEHOLDER, topic)
    }
}
