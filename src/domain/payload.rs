//! Save payload construction and the request bodies of the write endpoints.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::grid::GridModel;

/// Identifiers a save needs. Any of the first four missing disables editing
/// and saving for the instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveContext {
    pub branch_id: Option<String>,
    pub plan_id: Option<String>,
    pub year: Option<i32>,
    pub default_unit_id: Option<String>,
    /// Unit name (lowercase) → backend unit id; refreshed after each save.
    pub units: HashMap<String, String>,
}

impl SaveContext {
    /// Names of the required identifiers that are not set.
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if is_blank(self.branch_id.as_deref()) {
            missing.push("branch".to_string());
        }
        if is_blank(self.plan_id.as_deref()) && self.year.is_none() {
            missing.push("plan or year".to_string());
        }
        if is_blank(self.default_unit_id.as_deref()) {
            missing.push("default unit".to_string());
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Unit id for an item's unit name, falling back to the default unit.
    pub fn unit_id_for(&self, unit_name: &str) -> Option<&str> {
        self.units
            .get(&unit_name.trim().to_lowercase())
            .map(String::as_str)
            .or(self.default_unit_id.as_deref())
    }

    /// The plan id when set, otherwise the year rendered as a plan key.
    pub fn plan_key(&self) -> String {
        match (&self.plan_id, self.year) {
            (Some(plan), _) if !plan.trim().is_empty() => plan.clone(),
            (_, Some(year)) => year.to_string(),
            _ => String::new(),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub item_external_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sell_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub buy_price: Decimal,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEntry {
    pub unit_id: String,
    pub item_external_id: String,
    pub month: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavePayload {
    pub prices: Vec<PriceEntry>,
    pub cells: Vec<CellEntry>,
    /// Ids of items left out because they have no backend identifier.
    pub skipped_items: Vec<String>,
}

/// Collect prices for every resolvable item and the non-zero cells.
///
/// `amount` on the wire carries the entered quantity; the server applies the
/// stored unit price itself, and reading it back restores the same cells.
pub fn build_payload(grid: &GridModel, ctx: &SaveContext) -> SavePayload {
    let mut payload = SavePayload::default();

    for item in grid.items() {
        let external_id = match &item.external_id {
            Some(ext) if item.is_resolved() => ext.trim().to_string(),
            _ => {
                payload.skipped_items.push(item.id.clone());
                continue;
            }
        };

        let price = grid.price(&item.id).cloned().unwrap_or_default();
        payload.prices.push(PriceEntry {
            item_external_id: external_id.clone(),
            sell_price: price.sell_value(),
            buy_price: price.buy_value(),
            note: price.note.clone(),
        });

        let Some(unit_id) = ctx.unit_id_for(&item.unit) else {
            continue;
        };
        for period in grid.calendar().periods() {
            let quantity = grid
                .cell(&item.id, &period.key)
                .map(|c| c.numeric_value())
                .unwrap_or(Decimal::ZERO);
            if quantity.is_zero() {
                continue;
            }
            payload.cells.push(CellEntry {
                unit_id: unit_id.to_string(),
                item_external_id: external_id.clone(),
                month: period.calendar_month,
                amount: quantity.normalize(),
            });
        }
    }

    if !payload.skipped_items.is_empty() {
        log::warn!(
            "{} line items have no backend identifier and were left out of the save: {}",
            payload.skipped_items.len(),
            payload.skipped_items.join(", ")
        );
    }
    payload
}

/// Body of the bulk price write. Exactly one of `plan_id`/`year` is set,
/// depending on the endpoint shape being tried.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBulkBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub items: &'a [PriceEntry],
}

/// Body of a single-item price write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceItemBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(flatten)]
    pub item: &'a PriceEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellBulkBody<'a> {
    pub plan_id: String,
    pub branch_id: String,
    pub cells: &'a [CellEntry],
}

/// The two body shapes the price endpoints accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceShape {
    PlanKeyed,
    YearKeyed,
}

impl PriceShape {
    pub const ORDER: [PriceShape; 2] = [PriceShape::PlanKeyed, PriceShape::YearKeyed];

    /// Scope fields for this shape, or `None` if the context lacks them.
    pub fn scope(self, ctx: &SaveContext) -> Option<(Option<String>, Option<i32>)> {
        match self {
            PriceShape::PlanKeyed => ctx
                .plan_id
                .as_ref()
                .filter(|p| !p.trim().is_empty())
                .map(|p| (Some(p.clone()), None)),
            PriceShape::YearKeyed => ctx.year.map(|y| (None, Some(y))),
        }
    }

    pub fn bulk_body<'a>(self, ctx: &SaveContext, items: &'a [PriceEntry]) -> Option<PriceBulkBody<'a>> {
        let (plan_id, year) = self.scope(ctx)?;
        Some(PriceBulkBody {
            plan_id,
            year,
            items,
        })
    }

    pub fn item_body<'a>(self, ctx: &SaveContext, item: &'a PriceEntry) -> Option<PriceItemBody<'a>> {
        let (plan_id, year) = self.scope(ctx)?;
        Some(PriceItemBody { plan_id, year, item })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::line_item::{LineItem, PriceField};
    use crate::domain::period::FiscalCalendar;

    fn ctx() -> SaveContext {
        SaveContext {
            branch_id: Some("12".into()),
            plan_id: Some("7".into()),
            year: Some(2025),
            default_unit_id: Some("3".into()),
            units: HashMap::from([("bag".to_string(), "9".to_string())]),
        }
    }

    fn grid() -> GridModel {
        let items = vec![
            LineItem::new("rice", "Rice", "kg").with_external_id("101"),
            LineItem::new("beans", "Beans", "Bag").with_external_id("102"),
            LineItem::new("coffee", "Coffee", "kg"),
        ];
        GridModel::new(items, FiscalCalendar::starting_at(4).unwrap(), None).unwrap()
    }

    #[test]
    fn all_blank_grid_yields_no_cells() {
        let payload = build_payload(&grid(), &ctx());
        assert!(payload.cells.is_empty());
        assert_eq!(payload.prices.len(), 2);
        assert_eq!(payload.skipped_items, vec!["coffee"]);
    }

    #[test]
    fn zero_and_blank_cells_are_omitted() {
        let mut g = grid();
        g.set_cell("rice", "apr", "0").unwrap();
        g.set_cell("rice", "may", "0.000").unwrap();
        g.set_cell("rice", "jun", "4.50").unwrap();
        g.set_cell("beans", "jan", "2").unwrap();
        g.set_cell("coffee", "apr", "9").unwrap();

        let payload = build_payload(&g, &ctx());
        assert_eq!(
            payload.cells,
            vec![
                CellEntry {
                    unit_id: "3".into(),
                    item_external_id: "101".into(),
                    month: 6,
                    amount: Decimal::new(45, 1),
                },
                CellEntry {
                    unit_id: "9".into(),
                    item_external_id: "102".into(),
                    month: 1,
                    amount: Decimal::from(2),
                },
            ]
        );
    }

    #[test]
    fn prices_cover_every_resolvable_item() {
        let mut g = grid();
        g.set_price("rice", PriceField::Sell, "1500").unwrap();
        g.set_price("rice", PriceField::Buy, "1200").unwrap();
        g.set_price("rice", PriceField::Note, "milled").unwrap();
        let payload = build_payload(&g, &ctx());
        let rice = &payload.prices[0];
        assert_eq!(rice.item_external_id, "101");
        assert_eq!(rice.sell_price, Decimal::from(1500));
        assert_eq!(rice.note, "milled");
        assert_eq!(payload.prices[1].sell_price, Decimal::ZERO);
    }

    #[test]
    fn context_reports_missing_identifiers() {
        let mut c = ctx();
        assert!(c.is_complete());
        c.branch_id = None;
        c.default_unit_id = Some(" ".into());
        assert_eq!(c.missing(), vec!["branch", "default unit"]);
        c.plan_id = None;
        c.year = None;
        assert_eq!(c.missing(), vec!["branch", "plan or year", "default unit"]);
    }

    #[test]
    fn body_shapes_serialize_with_wire_names() {
        let entries = vec![PriceEntry {
            item_external_id: "101".into(),
            sell_price: Decimal::new(125, 1),
            buy_price: Decimal::ZERO,
            note: String::new(),
        }];
        let c = ctx();

        let plan = PriceShape::PlanKeyed.bulk_body(&c, &entries).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["planId"], "7");
        assert!(json.get("year").is_none());
        assert_eq!(json["items"][0]["itemExternalId"], "101");
        assert_eq!(json["items"][0]["sellPrice"], 12.5);

        let year = PriceShape::YearKeyed.item_body(&c, &entries[0]).unwrap();
        let json = serde_json::to_value(&year).unwrap();
        assert_eq!(json["year"], 2025);
        assert!(json.get("planId").is_none());
        assert_eq!(json["itemExternalId"], "101");
    }

    #[test]
    fn shape_without_scope_is_unavailable() {
        let mut c = ctx();
        c.year = None;
        assert!(PriceShape::YearKeyed.bulk_body(&c, &[]).is_none());
        assert!(PriceShape::PlanKeyed.bulk_body(&c, &[]).is_some());
    }

    #[test]
    fn cell_body_serializes_camel_case() {
        let cells = vec![CellEntry {
            unit_id: "3".into(),
            item_external_id: "101".into(),
            month: 4,
            amount: Decimal::from(5),
        }];
        let body = CellBulkBody {
            plan_id: "7".into(),
            branch_id: "12".into(),
            cells: &cells,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["branchId"], "12");
        assert_eq!(json["cells"][0]["unitId"], "3");
        assert_eq!(json["cells"][0]["month"], 4);
        assert_eq!(json["cells"][0]["amount"], 5.0);
    }
}
