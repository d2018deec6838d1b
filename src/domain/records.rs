//! Records read back from the planning backend.
//!
//! Older endpoints name the item key `businessEarningId` and the quantity
//! `value`; both spellings are accepted. Identifiers and months arrive as
//! either JSON numbers or strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// One saved cell value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(alias = "businessEarningId", deserialize_with = "string_or_number")]
    pub item_external_id: String,
    #[serde(deserialize_with = "month_number")]
    pub month: u32,
    #[serde(alias = "value")]
    pub amount: Decimal,
}

impl RemoteRecord {
    pub fn new(item_external_id: impl Into<String>, month: u32, amount: Decimal) -> Self {
        Self {
            item_external_id: item_external_id.into(),
            month,
            amount,
        }
    }
}

/// One saved price row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePrice {
    #[serde(alias = "businessEarningId", deserialize_with = "string_or_number")]
    pub item_external_id: String,
    #[serde(default)]
    pub sell_price: Option<Decimal>,
    #[serde(default)]
    pub buy_price: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

/// An entry of the unit lookup list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// How a remote load combines with the current grid contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Clear every quantity first; cells missing from the response end blank.
    #[default]
    Replace,
    /// Overwrite only the cells present in the response.
    Merge,
}

/// Outcome counts of applying remote records to a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub applied: usize,
    pub unmatched: usize,
    pub invalid: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s.trim().to_string(),
        StringOrNumber::Int(n) => n.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}

fn month_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = string_or_number(deserializer)?;
    raw.parse::<u32>()
        .map_err(|_| serde::de::Error::custom(format!("invalid month: {raw}")))
}
