//! Line items (grid rows) and their per-item price records.

use rust_decimal::Decimal;

use super::sanitizer::{sanitize_with_limit, to_number};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub editable: bool,
    /// Backend identifier; `None` when the item could not be resolved.
    pub external_id: Option<String>,
}

impl LineItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            editable: true,
            external_id: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.external_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Sell,
    Buy,
    Note,
}

/// Unit price data for one line item. Prices are stored as sanitized text so
/// the display can tell "0" from "not entered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceRecord {
    pub sell_price: String,
    pub buy_price: String,
    pub note: String,
}

impl PriceRecord {
    pub fn sell_value(&self) -> Decimal {
        to_number(&self.sell_price)
    }

    pub fn buy_value(&self) -> Decimal {
        to_number(&self.buy_price)
    }

    pub fn set(&mut self, field: PriceField, text: &str, max_fraction_digits: Option<usize>) {
        match field {
            PriceField::Sell => self.sell_price = sanitize_with_limit(text, max_fraction_digits),
            PriceField::Buy => self.buy_price = sanitize_with_limit(text, max_fraction_digits),
            PriceField::Note => self.note = text.trim().to_string(),
        }
    }
}
