//! Row, column and grand totals over a grid.
//!
//! Amounts are accumulated in fixed-point decimals and never rounded here;
//! rounding happens only when a value is formatted for display, so the three
//! views of the grand total agree exactly.

use rust_decimal::{Decimal, RoundingStrategy};

use super::grid::GridModel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub quantity: Decimal,
    pub amount: Decimal,
    /// At least one cell in scope has non-empty text.
    pub any: bool,
}

impl Totals {
    fn add(&mut self, quantity: Decimal, amount: Decimal, entered: bool) {
        self.quantity = self.quantity.saturating_add(quantity);
        self.amount = self.amount.saturating_add(amount);
        self.any |= entered;
    }

    pub fn display_quantity(&self, placeholder: &str) -> String {
        if self.any {
            format_quantity(self.quantity)
        } else {
            placeholder.to_string()
        }
    }

    pub fn display_amount(&self, placeholder: &str) -> String {
        if self.any {
            format_money(self.amount)
        } else {
            placeholder.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTotals {
    pub item_id: String,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodTotals {
    pub period_key: String,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub items: Vec<ItemTotals>,
    pub periods: Vec<PeriodTotals>,
    pub grand: Totals,
}

impl AggregateSnapshot {
    pub fn item(&self, item_id: &str) -> Option<&Totals> {
        self.items
            .iter()
            .find(|t| t.item_id == item_id)
            .map(|t| &t.totals)
    }

    pub fn period(&self, period_key: &str) -> Option<&Totals> {
        self.periods
            .iter()
            .find(|t| t.period_key == period_key)
            .map(|t| &t.totals)
    }
}

/// Sum quantities and amounts per item, per period and overall in one pass.
/// Items and periods come out in grid order, so identical grids always give
/// identical snapshots.
pub fn compute_snapshot(grid: &GridModel) -> AggregateSnapshot {
    let periods = grid.calendar().periods();
    let mut period_totals = vec![Totals::default(); periods.len()];
    let mut item_totals = Vec::with_capacity(grid.items().len());
    let mut grand = Totals::default();

    for item in grid.items() {
        let price = grid
            .price(&item.id)
            .map(|p| p.sell_value())
            .unwrap_or(Decimal::ZERO);
        let mut row = Totals::default();

        for (col, period) in periods.iter().enumerate() {
            let Some(cell) = grid.cell(&item.id, &period.key) else {
                continue;
            };
            let quantity = cell.numeric_value();
            let amount = quantity.saturating_mul(price);
            let entered = !cell.is_blank();

            row.add(quantity, amount, entered);
            period_totals[col].add(quantity, amount, entered);
            grand.add(quantity, amount, entered);
        }

        item_totals.push(ItemTotals {
            item_id: item.id.clone(),
            totals: row,
        });
    }

    AggregateSnapshot {
        items: item_totals,
        periods: periods
            .iter()
            .zip(period_totals)
            .map(|(p, totals)| PeriodTotals {
                period_key: p.key.clone(),
                totals,
            })
            .collect(),
        grand,
    }
}

/// Money with two decimal places and thousands separators.
pub fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{rounded:.2}");
    group_thousands(&text)
}

/// Quantity with trailing zeros removed and thousands separators.
pub fn format_quantity(value: Decimal) -> String {
    group_thousands(&value.normalize().to_string())
}

fn group_thousands(text: &str) -> String {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (integer, fraction) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
