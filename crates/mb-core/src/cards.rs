//! Card templates.
//!
//! Static catalog of predefined card content grouped by `CardType`, plus the
//! user-made `CustomCard`s kept in a card library. The editor only places a
//! chosen `CardTemplate` as a card element.

use crate::model::CardType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardTypeInfo {
    pub card_type: CardType,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    pub card_type: CardType,
    pub image_content: Option<String>,
    pub text_content: Option<String>,
}

impl CardTemplate {
    pub fn new(card_type: CardType) -> Self {
        Self {
            card_type,
            image_content: None,
            text_content: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_content = Some(url.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }
}

/// A card saved to a user's card library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCard {
    pub id: u64,
    pub card_type: CardType,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CustomCard {
    pub fn to_template(&self) -> CardTemplate {
        let template = CardTemplate::new(self.card_type).with_image(self.image_url.as_str());
        match &self.text_content {
            Some(text) => template.with_text(text.as_str()),
            None => template,
        }
    }
}

pub static CARD_TYPES: [CardTypeInfo; 5] = [
    CardTypeInfo {
        card_type: CardType::Hook,
        label: "Hook Card",
        description: "What a family of consistently performing assets has in common",
    },
    CardTypeInfo {
        card_type: CardType::Inspiration,
        label: "Inspiration Card",
        description: "Competitors, trends, topics, and IP formats worth borrowing from",
    },
    CardTypeInfo {
        card_type: CardType::Template,
        label: "Template Card",
        description: "A strong reference layout to follow closely",
    },
    CardTypeInfo {
        card_type: CardType::Product,
        label: "Product Card",
        description: "Screenshots of the product",
    },
    CardTypeInfo {
        card_type: CardType::Constraint,
        label: "Constraint Card",
        description: "Hard limits such as aspect ratio or visual style",
    },
];

pub fn card_type_info(card_type: CardType) -> &'static CardTypeInfo {
    // CARD_TYPES lists every variant in declaration order.
    &CARD_TYPES[card_type as usize]
}

/// Predefined templates offered for `card_type`.
pub fn templates_for(card_type: CardType) -> Vec<CardTemplate> {
    let t = CardTemplate::new(card_type);
    match card_type {
        CardType::Hook => vec![
            t.clone()
                .with_image("https://picsum.photos/id/1011/600/800")
                .with_text("Before/after split with a single bold headline"),
            t.with_text("Open on a close-up of hands using the product"),
        ],
        CardType::Inspiration => vec![
            t.clone()
                .with_image("https://picsum.photos/id/1025/600/800")
                .with_text("Seasonal trend: warm autumn palettes"),
            t.with_image("https://picsum.photos/id/1035/600/800"),
        ],
        CardType::Template => vec![
            t.clone()
                .with_image("https://picsum.photos/id/1043/600/800")
                .with_text("Three-panel grid, product centred in the middle panel"),
        ],
        CardType::Product => vec![t.with_image("https://picsum.photos/id/1060/600/800")],
        CardType::Constraint => vec![
            t.clone().with_text("Aspect ratio 9:16"),
            t.with_text("Flat illustration style, no photography"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_lookup_matches_variant() {
        for t in CardType::ALL {
            assert_eq!(card_type_info(t).card_type, t);
        }
    }

    #[test]
    fn every_type_has_templates_of_that_type() {
        for t in CardType::ALL {
            let templates = templates_for(t);
            assert!(!templates.is_empty());
            assert!(templates.iter().all(|tpl| tpl.card_type == t));
        }
    }

    #[test]
    fn custom_card_becomes_a_template() {
        let card = CustomCard {
            id: 7,
            card_type: CardType::Product,
            image_url: "https://example/bag.png".into(),
            text_content: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            card.to_template(),
            CardTemplate::new(CardType::Product).with_image("https://example/bag.png")
        );

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["cardType"], "product");
        assert!(json.get("textContent").is_none());
    }
}
