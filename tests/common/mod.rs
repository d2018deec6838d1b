#![allow(dead_code)]

use coopledger::domain::error::GridError;
use coopledger::domain::grid_config::{ApiSettings, EndpointSet, GridConfig};
use coopledger::domain::line_item::LineItem;
use coopledger::domain::payload::{CellBulkBody, PriceBulkBody, PriceEntry, PriceItemBody, PriceShape, SaveContext};
use coopledger::domain::records::{RemotePrice, RemoteRecord, UnitRecord};
use coopledger::domain::session::Role;
use coopledger::ports::plan_api_port::PlanApiPort;
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchRecords,
    FetchPrices,
    FetchUnits,
    PutPricesBulk(PriceShape),
    PutPriceItem(PriceShape, String),
    PutCellsBulk,
    /// Emitted when the cell write has been answered.
    CellsWritten,
}

/// In-memory planning backend. Writes land in `stored_*` and are served back
/// by the reads, so reconciliation sees what was saved. Every call yields to
/// the scheduler once before answering.
#[derive(Default)]
pub struct MockPlanApi {
    pub calls: RefCell<Vec<Call>>,
    pub stored_records: RefCell<Vec<RemoteRecord>>,
    pub stored_prices: RefCell<Vec<RemotePrice>>,
    pub units: Vec<UnitRecord>,
    pub bulk_rejections: Vec<(PriceShape, u16)>,
    pub item_rejections: Vec<(PriceShape, String, u16)>,
    pub network_down_for_prices: bool,
    pub fail_record_reads: Cell<bool>,
    pub fail_units: bool,
    pub hang_on_cells: bool,
}

impl MockPlanApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, records: Vec<RemoteRecord>) -> Self {
        self.stored_records.replace(records);
        self
    }

    pub fn with_units(mut self, units: &[(&str, &str)]) -> Self {
        self.units = units
            .iter()
            .map(|(id, name)| UnitRecord {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
        self
    }

    pub fn reject_bulk(mut self, shape: PriceShape, status: u16) -> Self {
        self.bulk_rejections.push((shape, status));
        self
    }

    pub fn reject_item(mut self, shape: PriceShape, external_id: &str, status: u16) -> Self {
        self.item_rejections.push((shape, external_id.to_string(), status));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c == call)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn store_prices(&self, entries: &[PriceEntry]) {
        let mut stored = self.stored_prices.borrow_mut();
        for entry in entries {
            stored.retain(|p| p.item_external_id != entry.item_external_id);
            stored.push(RemotePrice {
                item_external_id: entry.item_external_id.clone(),
                sell_price: Some(entry.sell_price),
                buy_price: Some(entry.buy_price),
                note: Some(entry.note.clone()),
            });
        }
    }
}

fn http(status: u16, detail: &str) -> GridError {
    GridError::Http {
        status,
        detail: detail.to_string(),
    }
}

impl PlanApiPort for MockPlanApi {
    async fn fetch_records(&self, _ctx: &SaveContext) -> Result<Vec<RemoteRecord>, GridError> {
        self.record(Call::FetchRecords);
        tokio::task::yield_now().await;
        if self.fail_record_reads.get() {
            return Err(http(503, "Service Unavailable"));
        }
        Ok(self.stored_records.borrow().clone())
    }

    async fn fetch_prices(&self, _ctx: &SaveContext) -> Result<Vec<RemotePrice>, GridError> {
        self.record(Call::FetchPrices);
        tokio::task::yield_now().await;
        Ok(self.stored_prices.borrow().clone())
    }

    async fn fetch_units(&self) -> Result<Vec<UnitRecord>, GridError> {
        self.record(Call::FetchUnits);
        tokio::task::yield_now().await;
        if self.fail_units {
            return Err(http(500, "units unavailable"));
        }
        Ok(self.units.clone())
    }

    async fn put_prices_bulk(&self, shape: PriceShape, body: &PriceBulkBody<'_>) -> Result<(), GridError> {
        self.record(Call::PutPricesBulk(shape));
        tokio::task::yield_now().await;
        if self.network_down_for_prices {
            return Err(GridError::Network {
                reason: "connection refused".into(),
            });
        }
        if let Some((_, status)) = self.bulk_rejections.iter().find(|(s, _)| *s == shape) {
            return Err(http(*status, "Not Found"));
        }
        self.store_prices(body.items);
        Ok(())
    }

    async fn put_price_item(&self, shape: PriceShape, body: &PriceItemBody<'_>) -> Result<(), GridError> {
        let id = body.item.item_external_id.clone();
        self.record(Call::PutPriceItem(shape, id.clone()));
        tokio::task::yield_now().await;
        if let Some((_, _, status)) = self
            .item_rejections
            .iter()
            .find(|(s, ext, _)| *s == shape && *ext == id)
        {
            return Err(http(*status, "rejected"));
        }
        self.store_prices(std::slice::from_ref(body.item));
        Ok(())
    }

    async fn put_cells_bulk(&self, body: &CellBulkBody<'_>) -> Result<(), GridError> {
        self.record(Call::PutCellsBulk);
        if self.hang_on_cells {
            std::future::pending::<()>().await;
        }
        tokio::task::yield_now().await;
        self.stored_records.replace(
            body.cells
                .iter()
                .map(|c| RemoteRecord::new(c.item_external_id.clone(), c.month, c.amount))
                .collect(),
        );
        self.record(Call::CellsWritten);
        Ok(())
    }
}

pub fn complete_context() -> SaveContext {
    SaveContext {
        branch_id: Some("12".into()),
        plan_id: Some("7".into()),
        year: Some(2025),
        default_unit_id: Some("3".into()),
        units: Default::default(),
    }
}

/// Two items A (ext 101) and B (ext 102) plus an unresolved item C.
pub fn sample_items() -> Vec<LineItem> {
    vec![
        LineItem::new("a", "Item A", "kg").with_external_id("101"),
        LineItem::new("b", "Item B", "Bag").with_external_id("102"),
        LineItem::new("c", "Item C", "kg"),
    ]
}

pub fn sample_config() -> GridConfig {
    GridConfig {
        name: "earnings".into(),
        items: sample_items(),
        fiscal_start_month: 4,
        max_fraction_digits: None,
        placeholder: "-".into(),
        api: ApiSettings {
            base_url: "http://localhost:9".into(),
            timeout_secs: 5,
            credentials_path: None,
        },
        endpoints: EndpointSet::default(),
        context: complete_context(),
        role: Role::Manager,
    }
}

pub fn dec(text: &str) -> Decimal {
    text.parse().unwrap()
}
