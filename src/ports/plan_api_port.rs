//! Planning backend port trait.
//!
//! The grid engine talks to the backend only through this trait; the HTTP
//! adapter implements it for production and tests script it directly.

use crate::domain::error::GridError;
use crate::domain::payload::{CellBulkBody, PriceBulkBody, PriceItemBody, PriceShape, SaveContext};
use crate::domain::records::{RemotePrice, RemoteRecord, UnitRecord};

#[allow(async_fn_in_trait)]
pub trait PlanApiPort {
    /// Saved cell values for the context's plan/year and branch.
    async fn fetch_records(&self, ctx: &SaveContext) -> Result<Vec<RemoteRecord>, GridError>;

    /// Saved prices for the context's plan/year.
    async fn fetch_prices(&self, ctx: &SaveContext) -> Result<Vec<RemotePrice>, GridError>;

    /// Unit lookup list (name → id).
    async fn fetch_units(&self) -> Result<Vec<UnitRecord>, GridError>;

    async fn put_prices_bulk(&self, shape: PriceShape, body: &PriceBulkBody<'_>) -> Result<(), GridError>;

    async fn put_price_item(&self, shape: PriceShape, body: &PriceItemBody<'_>) -> Result<(), GridError>;

    async fn put_cells_bulk(&self, body: &CellBulkBody<'_>) -> Result<(), GridError>;
}
