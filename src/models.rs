use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// The three lists an item can live in. A name uniquely identifies an item
/// within one collection; the same name may appear in all three at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Inventory,
    Wanted,
    SellWatch,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Wanted => "wanted",
            Self::SellWatch => "sell_watch",
        }
    }

    /// Accepts the names a UI shell would type.
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inventory" => Ok(Self::Inventory),
            "wanted" => Ok(Self::Wanted),
            "sell" | "sell-watch" | "sell_watch" => Ok(Self::SellWatch),
            other => Err(AppError::Validation(format!(
                "unknown collection '{}' (expected inventory, wanted or sell)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub price: f64,
    pub image_path: Option<String>,
    pub year: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; id and created_at are assigned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub price: f64,
    pub image_path: Option<String>,
    pub year: Option<String>,
    pub location: Option<String>,
}

/// Partial update; only supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    pub category: Option<String>,
    pub quantity: Option<u32>,
    pub price: Option<f64>,
    pub image_path: Option<String>,
    pub year: Option<String>,
    pub location: Option<String>,
    pub threshold: Option<f64>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.image_path.is_none()
            && self.year.is_none()
            && self.location.is_none()
            && self.threshold.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SellWatchEntry {
    pub item: Item,
    pub threshold: f64,
}

/// A sell-watch entry whose looked-up price met its threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredAlert {
    pub name: String,
    pub current_price: f64,
    pub threshold: f64,
}

/// Raw form fields as a UI surface hands them over. Empty strings mean the
/// field was left blank. Parsing and presence checks happen here so that
/// validation errors never reach the persistence gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemForm {
    pub name: String,
    pub category: String,
    pub quantity: String,
    pub price: String,
    pub image_path: String,
    pub year: String,
    pub location: String,
    pub threshold: String,
}

impl ItemForm {
    pub fn parse_new(&self) -> AppResult<NewItem> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("item name must not be empty".to_string()));
        }
        Ok(NewItem {
            name: name.to_string(),
            category: self.category.trim().to_string(),
            quantity: parse_quantity(&self.quantity)?.unwrap_or(0),
            price: parse_money(&self.price, "price")?.unwrap_or(0.0),
            image_path: optional(&self.image_path),
            year: optional(&self.year),
            location: optional(&self.location),
        })
    }

    pub fn parse_update(&self) -> AppResult<ItemUpdate> {
        let update = ItemUpdate {
            category: optional(&self.category),
            quantity: parse_quantity(&self.quantity)?,
            price: parse_money(&self.price, "price")?,
            image_path: optional(&self.image_path),
            year: optional(&self.year),
            location: optional(&self.location),
            threshold: parse_money(&self.threshold, "threshold")?,
        };
        if update.is_empty() {
            return Err(AppError::Validation("no fields supplied to update".to_string()));
        }
        Ok(update)
    }

    pub fn parse_threshold(&self) -> AppResult<f64> {
        parse_money(&self.threshold, "threshold")?.ok_or_else(|| {
            AppError::Validation("sell-watch entries require a threshold".to_string())
        })
    }
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_quantity(raw: &str) -> AppResult<Option<u32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| AppError::Validation(format!("quantity '{}' is not a non-negative integer", trimmed)))
}

fn parse_money(raw: &str, field: &str) -> AppResult<Option<f64>> {
    let trimmed = raw.trim().trim_start_matches('$').trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| AppError::Validation(format!("{} '{}' is not a number", field, trimmed)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!("{} must be a non-negative number", field)));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> ItemForm {
        ItemForm {
            name: "Stamp A".to_string(),
            category: "Stamps".to_string(),
            quantity: "2".to_string(),
            price: "10.00".to_string(),
            year: "1990".to_string(),
            ..ItemForm::default()
        }
    }

    #[test]
    fn parse_new_reads_all_fields() {
        let item = filled_form().parse_new().expect("parse");
        assert_eq!(item.name, "Stamp A");
        assert_eq!(item.category, "Stamps");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price, 10.0);
        assert_eq!(item.year.as_deref(), Some("1990"));
        assert!(item.image_path.is_none());
        assert!(item.location.is_none());
    }

    #[test]
    fn parse_new_rejects_empty_name() {
        let mut form = filled_form();
        form.name = "   ".to_string();
        assert!(matches!(form.parse_new(), Err(AppError::Validation(_))));
    }

    #[test]
    fn parse_new_rejects_non_numeric_quantity() {
        let mut form = filled_form();
        form.quantity = "two".to_string();
        assert!(matches!(form.parse_new(), Err(AppError::Validation(_))));
    }

    #[test]
    fn parse_new_rejects_negative_price() {
        let mut form = filled_form();
        form.price = "-3".to_string();
        assert!(matches!(form.parse_new(), Err(AppError::Validation(_))));
    }

    #[test]
    fn parse_update_keeps_only_supplied_fields() {
        let form = ItemForm {
            price: "12.50".to_string(),
            ..ItemForm::default()
        };
        let update = form.parse_update().expect("parse");
        assert_eq!(update.price, Some(12.5));
        assert!(update.quantity.is_none());
        assert!(update.category.is_none());
    }

    #[test]
    fn parse_update_rejects_blank_form() {
        let form = ItemForm::default();
        assert!(matches!(form.parse_update(), Err(AppError::Validation(_))));
    }

    #[test]
    fn parse_threshold_requires_value() {
        let form = ItemForm::default();
        assert!(matches!(form.parse_threshold(), Err(AppError::Validation(_))));

        let form = ItemForm {
            threshold: "$50.00".to_string(),
            ..ItemForm::default()
        };
        assert_eq!(form.parse_threshold().expect("parse"), 50.0);
    }

    #[test]
    fn collection_parse_accepts_shell_spellings() {
        assert_eq!(Collection::parse("inventory").unwrap(), Collection::Inventory);
        assert_eq!(Collection::parse("Wanted").unwrap(), Collection::Wanted);
        assert_eq!(Collection::parse("sell").unwrap(), Collection::SellWatch);
        assert_eq!(Collection::parse("sell-watch").unwrap(), Collection::SellWatch);
        assert!(Collection::parse("attic").is_err());
    }
}
