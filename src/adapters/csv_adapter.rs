//! CSV import and export of a grid.
//!
//! Layout (one row per line item):
//! `item,name,unit,sell_price,buy_price,note,<period keys…>,total_quantity,total_amount`
//! followed by a `TOTAL` footer on export. Import accepts any subset of
//! those columns as long as `item` is present; totals and the footer are
//! ignored.

use std::io::{Read, Write};
use std::path::Path;

use crate::domain::aggregation::compute_snapshot;
use crate::domain::error::GridError;
use crate::domain::grid::GridModel;
use crate::domain::line_item::PriceField;

pub const FOOTER_LABEL: &str = "TOTAL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub cells: usize,
    pub prices: usize,
    /// Rows not applied, with the reason.
    pub skipped: Vec<String>,
}

enum Column {
    Period(String),
    Price(PriceField),
    Ignored,
}

fn csv_error(e: csv::Error) -> GridError {
    GridError::Csv {
        reason: e.to_string(),
    }
}

pub fn import_file<P: AsRef<Path>>(path: P, grid: &mut GridModel) -> Result<ImportSummary, GridError> {
    let file = std::fs::File::open(path.as_ref())?;
    import_edits(file, grid)
}

/// Apply quantity and price edits from CSV. Every value goes through the
/// sanitizer; unknown and read-only items are skipped, not fatal.
pub fn import_edits<R: Read>(reader: R, grid: &mut GridModel) -> Result<ImportSummary, GridError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?.clone();
    let item_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("item"))
        .ok_or_else(|| GridError::Csv {
            reason: "missing item column".to_string(),
        })?;
    let columns: Vec<Column> = headers
        .iter()
        .map(|h| match h.to_ascii_lowercase().as_str() {
            "sell_price" | "price" => Column::Price(PriceField::Sell),
            "buy_price" => Column::Price(PriceField::Buy),
            "note" => Column::Price(PriceField::Note),
            key if grid.calendar().by_key(key).is_some() => Column::Period(key.to_string()),
            _ => Column::Ignored,
        })
        .collect();

    let mut summary = ImportSummary::default();
    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        let Some(item_id) = record.get(item_col).filter(|id| !id.is_empty()) else {
            continue;
        };
        if item_id == FOOTER_LABEL {
            continue;
        }

        let applied = apply_row(grid, item_id, &columns, &record);
        match applied {
            Ok((cells, prices)) => {
                summary.cells += cells;
                summary.prices += prices;
            }
            Err(e) => {
                log::warn!("CSV row for {item_id} skipped: {e}");
                summary.skipped.push(format!("{item_id}: {e}"));
            }
        }
    }
    Ok(summary)
}

fn apply_row(
    grid: &mut GridModel,
    item_id: &str,
    columns: &[Column],
    record: &csv::StringRecord,
) -> Result<(usize, usize), GridError> {
    let item = grid
        .item(item_id)
        .ok_or_else(|| GridError::UnknownItem(item_id.to_string()))?;
    if !item.editable {
        return Err(GridError::ReadOnlyItem(item_id.to_string()));
    }

    let (mut cells, mut prices) = (0, 0);
    for (column, value) in columns.iter().zip(record.iter()) {
        match column {
            Column::Period(key) => {
                grid.set_cell(item_id, key, value)?;
                cells += 1;
            }
            Column::Price(field) => {
                grid.set_price(item_id, *field, value)?;
                prices += 1;
            }
            Column::Ignored => {}
        }
    }
    Ok((cells, prices))
}

pub fn export_file<P: AsRef<Path>>(path: P, grid: &GridModel, placeholder: &str) -> Result<(), GridError> {
    let file = std::fs::File::create(path.as_ref())?;
    export_grid(file, grid, placeholder)
}

/// Write the grid with row totals and a totals footer. Cells carry the
/// stored text; totals are rounded for display.
pub fn export_grid<W: Write>(writer: W, grid: &GridModel, placeholder: &str) -> Result<(), GridError> {
    let snapshot = compute_snapshot(grid);
    let periods = grid.calendar().periods();
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["item", "name", "unit", "sell_price", "buy_price", "note"];
    header.extend(periods.iter().map(|p| p.key.as_str()));
    header.extend(["total_quantity", "total_amount"]);
    wtr.write_record(&header).map_err(csv_error)?;

    for item in grid.items() {
        let price = grid.price(&item.id).cloned().unwrap_or_default();
        let mut row = vec![
            item.id.clone(),
            item.name.clone(),
            item.unit.clone(),
            price.sell_price,
            price.buy_price,
            price.note,
        ];
        row.extend(periods.iter().map(|p| {
            grid.cell(&item.id, &p.key)
                .map(|c| c.raw_text().to_string())
                .unwrap_or_default()
        }));
        let totals = snapshot.item(&item.id).copied().unwrap_or_default();
        row.push(totals.display_quantity(placeholder));
        row.push(totals.display_amount(placeholder));
        wtr.write_record(&row).map_err(csv_error)?;
    }

    let mut footer = vec![FOOTER_LABEL.to_string()];
    footer.extend(std::iter::repeat_n(String::new(), 5));
    footer.extend(periods.iter().map(|p| {
        snapshot
            .period(&p.key)
            .copied()
            .unwrap_or_default()
            .display_amount(placeholder)
    }));
    footer.push(snapshot.grand.display_quantity(placeholder));
    footer.push(snapshot.grand.display_amount(placeholder));
    wtr.write_record(&footer).map_err(csv_error)?;

    wtr.flush()?;
    Ok(())
}
