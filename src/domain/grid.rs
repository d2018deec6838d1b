//! Grid model: line items × fiscal periods of sanitized quantity cells, plus
//! one price record per item.

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::error::GridError;
use super::line_item::{LineItem, PriceField, PriceRecord};
use super::navigation::{GridCoord, PRICE_COL};
use super::period::FiscalCalendar;
use super::records::{LoadMode, LoadSummary, RemotePrice, RemoteRecord};
use super::sanitizer::{from_number, sanitize_with_limit, to_number};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    raw: String,
}

impl Cell {
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn numeric_value(&self) -> Decimal {
        to_number(&self.raw)
    }

    pub fn is_blank(&self) -> bool {
        self.raw.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EditTarget {
    Cell { item_id: String, period_key: String },
    Price { item_id: String },
}

/// Local edits captured by [`GridModel::edits_since`], to be put back on
/// top of a reload with [`GridModel::restore_edits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalEdits {
    cells: Vec<(String, String, String)>,
    prices: Vec<(String, PriceRecord)>,
}

impl LocalEdits {
    pub fn len(&self) -> usize {
        self.cells.len() + self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.prices.is_empty()
    }
}

/// What a navigator coordinate points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellTarget<'a> {
    Price { item_id: &'a str },
    Quantity { item_id: &'a str, period_key: &'a str },
}

#[derive(Debug, Clone)]
pub struct GridModel {
    items: Vec<LineItem>,
    item_index: HashMap<String, usize>,
    calendar: FiscalCalendar,
    cells: HashMap<String, HashMap<String, Cell>>,
    prices: HashMap<String, PriceRecord>,
    max_fraction_digits: Option<usize>,
    /// Bumped on every user edit.
    revision: u64,
    edited_at: HashMap<EditTarget, u64>,
}

impl GridModel {
    /// Build an empty grid. Fails if two items share an id.
    pub fn new(
        items: Vec<LineItem>,
        calendar: FiscalCalendar,
        max_fraction_digits: Option<usize>,
    ) -> Result<Self, GridError> {
        let mut item_index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if item_index.insert(item.id.clone(), i).is_some() {
                return Err(GridError::DuplicateItem(item.id.clone()));
            }
        }

        let cells = items
            .iter()
            .map(|item| {
                let row = calendar
                    .periods()
                    .iter()
                    .map(|p| (p.key.clone(), Cell::default()))
                    .collect();
                (item.id.clone(), row)
            })
            .collect();
        let prices = items
            .iter()
            .map(|item| (item.id.clone(), PriceRecord::default()))
            .collect();

        Ok(Self {
            items,
            item_index,
            calendar,
            cells,
            prices,
            max_fraction_digits,
            revision: 0,
            edited_at: HashMap::new(),
        })
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&LineItem> {
        self.item_index.get(item_id).map(|&i| &self.items[i])
    }

    /// Items that take part in keyboard navigation, in row order.
    pub fn editable_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|item| item.editable)
    }

    /// Items without a backend identifier; shown flagged, never saved.
    pub fn unresolved_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|item| !item.is_resolved())
    }

    pub fn calendar(&self) -> &FiscalCalendar {
        &self.calendar
    }

    pub fn max_fraction_digits(&self) -> Option<usize> {
        self.max_fraction_digits
    }

    pub fn cell(&self, item_id: &str, period_key: &str) -> Option<&Cell> {
        self.cells.get(item_id)?.get(period_key)
    }

    pub fn price(&self, item_id: &str) -> Option<&PriceRecord> {
        self.prices.get(item_id)
    }

    /// Sanitize `text` and store it as the quantity of one cell.
    pub fn set_cell(&mut self, item_id: &str, period_key: &str, text: &str) -> Result<&Cell, GridError> {
        let item = self
            .item(item_id)
            .ok_or_else(|| GridError::UnknownItem(item_id.to_string()))?;
        if !item.editable {
            return Err(GridError::ReadOnlyItem(item_id.to_string()));
        }
        if self.calendar.by_key(period_key).is_none() {
            return Err(GridError::UnknownPeriod(period_key.to_string()));
        }

        let raw = sanitize_with_limit(text, self.max_fraction_digits);
        self.touch(EditTarget::Cell {
            item_id: item_id.to_string(),
            period_key: period_key.to_string(),
        });
        let cell = self
            .cells
            .get_mut(item_id)
            .and_then(|row| row.get_mut(period_key))
            .ok_or_else(|| GridError::UnknownPeriod(period_key.to_string()))?;
        cell.raw = raw;
        Ok(cell)
    }

    /// Update one price field. Quantities are untouched; derived amounts for
    /// the item change on the next snapshot.
    pub fn set_price(&mut self, item_id: &str, field: PriceField, text: &str) -> Result<&PriceRecord, GridError> {
        let item = self
            .item(item_id)
            .ok_or_else(|| GridError::UnknownItem(item_id.to_string()))?;
        if !item.editable {
            return Err(GridError::ReadOnlyItem(item_id.to_string()));
        }
        let limit = self.max_fraction_digits;
        self.touch(EditTarget::Price {
            item_id: item_id.to_string(),
        });
        let record = self
            .prices
            .get_mut(item_id)
            .ok_or_else(|| GridError::UnknownItem(item_id.to_string()))?;
        record.set(field, text, limit);
        Ok(record)
    }

    /// Blank every quantity cell; prices survive unless `preserve_prices` is
    /// false.
    pub fn reset(&mut self, preserve_prices: bool) {
        let mut touched: Vec<EditTarget> = self
            .cells
            .iter()
            .flat_map(|(item_id, row)| {
                row.keys().map(move |period_key| EditTarget::Cell {
                    item_id: item_id.clone(),
                    period_key: period_key.clone(),
                })
            })
            .collect();
        if !preserve_prices {
            touched.extend(self.prices.keys().map(|item_id| EditTarget::Price {
                item_id: item_id.clone(),
            }));
        }
        for target in touched {
            self.touch(target);
        }

        self.clear_quantities();
        if !preserve_prices {
            for record in self.prices.values_mut() {
                *record = PriceRecord::default();
            }
        }
    }

    fn clear_quantities(&mut self) {
        for row in self.cells.values_mut() {
            for cell in row.values_mut() {
                cell.raw.clear();
            }
        }
    }

    fn touch(&mut self, target: EditTarget) {
        self.revision += 1;
        self.edited_at.insert(target, self.revision);
    }

    /// Counter of user edits; compare with [`edits_since`](Self::edits_since).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current text of every cell and price edited after `revision`.
    pub fn edits_since(&self, revision: u64) -> LocalEdits {
        let mut edits = LocalEdits::default();
        for (target, _) in self.edited_at.iter().filter(|(_, at)| **at > revision) {
            match target {
                EditTarget::Cell { item_id, period_key } => {
                    if let Some(cell) = self.cell(item_id, period_key) {
                        edits
                            .cells
                            .push((item_id.clone(), period_key.clone(), cell.raw.clone()));
                    }
                }
                EditTarget::Price { item_id } => {
                    if let Some(record) = self.prices.get(item_id) {
                        edits.prices.push((item_id.clone(), record.clone()));
                    }
                }
            }
        }
        edits
    }

    /// Put captured edits back, e.g. over values just reloaded from the
    /// server. The edits keep their revisions, so they stay unsaved.
    pub fn restore_edits(&mut self, edits: &LocalEdits) {
        for (item_id, period_key, raw) in &edits.cells {
            if let Some(cell) = self
                .cells
                .get_mut(item_id.as_str())
                .and_then(|row| row.get_mut(period_key.as_str()))
            {
                cell.raw = raw.clone();
            }
        }
        for (item_id, record) in &edits.prices {
            if let Some(current) = self.prices.get_mut(item_id.as_str()) {
                *current = record.clone();
            }
        }
    }

    /// Apply saved values from the backend. Records whose external id matches
    /// no item, whose month is outside the calendar, or whose amount is
    /// negative are discarded and counted.
    pub fn load_from_records(&mut self, records: &[RemoteRecord], mode: LoadMode) -> LoadSummary {
        if mode == LoadMode::Replace {
            self.clear_quantities();
        }

        let by_external = self.external_index();
        let mut summary = LoadSummary::default();

        for record in records {
            let Some(item_id) = by_external.get(record.item_external_id.as_str()) else {
                summary.unmatched += 1;
                continue;
            };
            let Some(period) = self.calendar.by_calendar_month(record.month) else {
                summary.invalid += 1;
                continue;
            };
            let Some(raw) = from_number(record.amount, self.max_fraction_digits) else {
                summary.invalid += 1;
                continue;
            };
            if let Some(cell) = self
                .cells
                .get_mut(item_id.as_str())
                .and_then(|row| row.get_mut(&period.key))
            {
                cell.raw = raw;
                summary.applied += 1;
            }
        }

        if summary.unmatched > 0 || summary.invalid > 0 {
            log::warn!(
                "discarded {} unmatched and {} invalid records during load",
                summary.unmatched,
                summary.invalid
            );
        }
        summary
    }

    /// Apply saved prices from the backend; unmatched rows are ignored.
    pub fn load_prices(&mut self, prices: &[RemotePrice]) -> usize {
        let by_external = self.external_index();
        let limit = self.max_fraction_digits;
        let mut applied = 0;
        for remote in prices {
            let Some(item_id) = by_external.get(remote.item_external_id.as_str()) else {
                continue;
            };
            let Some(record) = self.prices.get_mut(item_id.as_str()) else {
                continue;
            };
            if let Some(text) = remote.sell_price.and_then(|v| from_number(v, limit)) {
                record.sell_price = text;
            }
            if let Some(text) = remote.buy_price.and_then(|v| from_number(v, limit)) {
                record.buy_price = text;
            }
            if let Some(note) = &remote.note {
                record.note = note.trim().to_string();
            }
            applied += 1;
        }
        applied
    }

    /// Resolve a navigator coordinate to the field it addresses. Rows count
    /// editable items only; column 0 is the price.
    pub fn target_at(&self, coord: GridCoord) -> Option<CellTarget<'_>> {
        let item = self.editable_items().nth(coord.row)?;
        if coord.col == PRICE_COL {
            return Some(CellTarget::Price { item_id: &item.id });
        }
        let period = self.calendar.get(coord.col - 1)?;
        Some(CellTarget::Quantity {
            item_id: &item.id,
            period_key: &period.key,
        })
    }

    fn external_index(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .filter(|item| item.is_resolved())
            .filter_map(|item| {
                item.external_id
                    .as_ref()
                    .map(|ext| (ext.trim().to_string(), item.id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_grid() -> GridModel {
        let items = vec![
            LineItem::new("rice", "Rice", "kg").with_external_id("101"),
            LineItem::new("beans", "Beans", "kg").with_external_id("102"),
            LineItem::new("levy", "Levy", "unit").read_only(),
            LineItem::new("coffee", "Coffee", "kg"),
        ];
        GridModel::new(items, FiscalCalendar::starting_at(4).unwrap(), Some(2)).unwrap()
    }

    #[test]
    fn new_grid_is_blank() {
        let grid = sample_grid();
        for item in grid.items() {
            for period in grid.calendar().periods() {
                assert!(grid.cell(&item.id, &period.key).unwrap().is_blank());
            }
            assert_eq!(grid.price(&item.id), Some(&PriceRecord::default()));
        }
    }

    #[test]
    fn loaded_values_respect_the_fraction_limit() {
        let mut grid = sample_grid();
        let records = [
            RemoteRecord::new("101", 4, Decimal::from_str("1.23456").unwrap()),
            RemoteRecord::new("102", 4, Decimal::from_str("123456789").unwrap()),
        ];
        let summary = grid.load_from_records(&records, LoadMode::Replace);
        assert_eq!(grid.cell("rice", "apr").unwrap().raw_text(), "1.23");
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.invalid, 1);

        grid.load_prices(&[RemotePrice {
            item_external_id: "101".into(),
            sell_price: Some(Decimal::from_str("4.5678").unwrap()),
            buy_price: None,
            note: None,
        }]);
        assert_eq!(grid.price("rice").unwrap().sell_price, "4.56");
    }

    #[test]
    fn edits_since_reports_later_edits_only() {
        let mut grid = sample_grid();
        grid.set_cell("rice", "apr", "1").unwrap();
        let mark = grid.revision();
        grid.set_cell("rice", "may", "2").unwrap();
        grid.set_price("beans", PriceField::Sell, "3").unwrap();

        let edits = grid.edits_since(mark);
        assert_eq!(edits.len(), 2);

        grid.load_from_records(&[], LoadMode::Replace);
        assert!(grid.cell("rice", "may").unwrap().is_blank());
        grid.restore_edits(&edits);
        assert_eq!(grid.cell("rice", "may").unwrap().raw_text(), "2");
        assert!(grid.cell("rice", "apr").unwrap().is_blank());
        assert_eq!(grid.price("beans").unwrap().sell_price, "3");
    }

    #[test]
    fn loading_is_not_an_edit() {
        let mut grid = sample_grid();
        let mark = grid.revision();
        grid.load_from_records(&[RemoteRecord::new("101", 4, Decimal::ONE)], LoadMode::Replace);
        assert_eq!(grid.revision(), mark);
        assert!(grid.edits_since(mark).is_empty());
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let items = vec![LineItem::new("a", "A", "kg"), LineItem::new("a", "A2", "kg")];
        let result = GridModel::new(items, FiscalCalendar::starting_at(1).unwrap(), None);
        assert!(matches!(result, Err(GridError::DuplicateItem(id)) if id == "a"));
    }

    #[test]
    fn set_cell_sanitizes_input() {
        let mut grid = sample_grid();
        let cell = grid.set_cell("rice", "apr", "1a2.3.45").unwrap();
        assert_eq!(cell.raw_text(), "12.34");
        assert_eq!(cell.numeric_value(), Decimal::from_str("12.34").unwrap());
    }

    #[test]
    fn set_cell_rejects_unknown_targets_and_read_only_items() {
        let mut grid = sample_grid();
        assert!(matches!(grid.set_cell("nope", "apr", "1"), Err(GridError::UnknownItem(_))));
        assert!(matches!(grid.set_cell("rice", "xyz", "1"), Err(GridError::UnknownPeriod(_))));
        assert!(matches!(grid.set_cell("levy", "apr", "1"), Err(GridError::ReadOnlyItem(_))));
    }

    #[test]
    fn price_change_leaves_quantities_alone() {
        let mut grid = sample_grid();
        grid.set_cell("rice", "apr", "3").unwrap();
        grid.set_price("rice", PriceField::Sell, "10").unwrap();
        grid.set_price("rice", PriceField::Sell, "12").unwrap();
        assert_eq!(grid.cell("rice", "apr").unwrap().raw_text(), "3");
        assert_eq!(grid.price("rice").unwrap().sell_value(), Decimal::from(12));
    }

    #[test]
    fn reset_preserves_prices_by_convention() {
        let mut grid = sample_grid();
        grid.set_cell("rice", "apr", "3").unwrap();
        grid.set_price("rice", PriceField::Sell, "10").unwrap();

        grid.reset(true);
        assert!(grid.cell("rice", "apr").unwrap().is_blank());
        assert_eq!(grid.price("rice").unwrap().sell_price, "10");

        grid.reset(false);
        assert_eq!(grid.price("rice").unwrap().sell_price, "");
    }

    #[test]
    fn replace_load_blanks_cells_missing_from_response() {
        let mut grid = sample_grid();
        grid.set_cell("rice", "may", "7").unwrap();

        let records = vec![
            RemoteRecord::new("101", 4, Decimal::from(5)),
            RemoteRecord::new("102", 1, Decimal::from_str("2.5").unwrap()),
            RemoteRecord::new("999", 4, Decimal::from(1)),
            RemoteRecord::new("101", 13, Decimal::from(1)),
            RemoteRecord::new("101", 6, Decimal::from(-1)),
        ];
        let summary = grid.load_from_records(&records, LoadMode::Replace);

        assert_eq!(summary, LoadSummary { applied: 2, unmatched: 1, invalid: 2 });
        assert_eq!(grid.cell("rice", "apr").unwrap().raw_text(), "5");
        assert_eq!(grid.cell("beans", "jan").unwrap().raw_text(), "2.5");
        assert!(grid.cell("rice", "may").unwrap().is_blank());
    }

    #[test]
    fn merge_load_keeps_unmatched_cells() {
        let mut grid = sample_grid();
        grid.set_cell("rice", "may", "7").unwrap();
        grid.load_from_records(&[RemoteRecord::new("101", 4, Decimal::from(5))], LoadMode::Merge);
        assert_eq!(grid.cell("rice", "may").unwrap().raw_text(), "7");
        assert_eq!(grid.cell("rice", "apr").unwrap().raw_text(), "5");
    }

    #[test]
    fn load_prices_matches_by_external_id() {
        let mut grid = sample_grid();
        let prices = vec![
            RemotePrice {
                item_external_id: "101".into(),
                sell_price: Some(Decimal::from(1500)),
                buy_price: Some(Decimal::from_str("1200.50").unwrap()),
                note: Some("milled".into()),
            },
            RemotePrice {
                item_external_id: "nope".into(),
                sell_price: Some(Decimal::ONE),
                buy_price: None,
                note: None,
            },
        ];
        assert_eq!(grid.load_prices(&prices), 1);
        let rice = grid.price("rice").unwrap();
        assert_eq!(rice.sell_price, "1500");
        assert_eq!(rice.buy_price, "1200.5");
        assert_eq!(rice.note, "milled");
    }

    #[test]
    fn unresolved_items_are_listed() {
        let grid = sample_grid();
        let ids: Vec<&str> = grid.unresolved_items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["levy", "coffee"]);
    }

    #[test]
    fn target_at_skips_read_only_rows() {
        let grid = sample_grid();
        assert_eq!(
            grid.target_at(GridCoord::new(0, PRICE_COL)),
            Some(CellTarget::Price { item_id: "rice" })
        );
        assert_eq!(
            grid.target_at(GridCoord::new(2, 1)),
            Some(CellTarget::Quantity { item_id: "coffee", period_key: "apr" })
        );
        assert_eq!(grid.target_at(GridCoord::new(3, 1)), None);
        assert_eq!(grid.target_at(GridCoord::new(0, 13)), None);
    }
}
