//! Save and load protocol against the planning backend.
//!
//! A save runs `Idle → Saving → Reconciling → Idle`: prices first (bulk,
//! then the alternate body shape, then item by item), then the bulk cell
//! write, then a full reload of what the server now holds. A load holds the
//! gateway in `Loading`. Only one save or load may be in flight per gateway,
//! and every network call is tied to the gateway's cancellation token.
//!
//! Editing stays open during a save. Edits made after the payload was built
//! are put back on top of the reload and reported as pending.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::cancel::CancelToken;
use super::error::GridError;
use super::grid::GridModel;
use super::payload::{build_payload, CellBulkBody, PriceEntry, PriceShape, SaveContext};
use super::records::{LoadMode, LoadSummary};
use crate::ports::plan_api_port::PlanApiPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Loading,
    Saving,
    Reconciling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceOutcome {
    /// No resolvable items, nothing to write.
    Skipped,
    Bulk(PriceShape),
    /// Bulk writes were rejected; items were written one by one.
    PerItem { saved: usize, failed: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub prices: PriceOutcome,
    pub cells_written: usize,
    pub skipped_items: Vec<String>,
    /// Result of the read-after-write reload; `Err` holds the failure text.
    pub reconciled: Result<LoadSummary, String>,
    pub units_refreshed: bool,
    /// Edits made while the save ran; kept locally, not yet saved.
    pub pending_edits: usize,
}

/// Resets the gateway to idle however the operation ends, including when
/// its future is dropped mid-flight.
struct StateGuard<'a> {
    state: &'a Cell<SaveState>,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a Cell<SaveState>, next: SaveState) -> Result<Self, GridError> {
        match state.get() {
            SaveState::Idle => {}
            SaveState::Loading => return Err(GridError::LoadInProgress),
            SaveState::Saving | SaveState::Reconciling => return Err(GridError::SaveInProgress),
        }
        state.set(next);
        Ok(Self { state })
    }

    fn advance(&self, next: SaveState) {
        self.state.set(next);
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.state.set(SaveState::Idle);
    }
}

pub struct PersistenceGateway<P> {
    api: P,
    context: RefCell<SaveContext>,
    state: Cell<SaveState>,
    cancel: CancelToken,
}

impl<P: PlanApiPort> PersistenceGateway<P> {
    pub fn new(api: P, context: SaveContext, cancel: CancelToken) -> Self {
        Self {
            api,
            context: RefCell::new(context),
            state: Cell::new(SaveState::Idle),
            cancel,
        }
    }

    pub fn api(&self) -> &P {
        &self.api
    }

    pub fn state(&self) -> SaveState {
        self.state.get()
    }

    pub fn context(&self) -> SaveContext {
        self.context.borrow().clone()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fails with `ConfigurationGap` when a required identifier is missing.
    pub fn ensure_context(&self) -> Result<(), GridError> {
        let missing = self.context.borrow().missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GridError::ConfigurationGap { missing })
        }
    }

    /// Load saved cells (and prices, when the backend serves them) into the
    /// grid, then refresh the unit lookup.
    pub async fn load(&self, grid: &RefCell<GridModel>, mode: LoadMode) -> Result<LoadSummary, GridError> {
        self.ensure_context()?;
        let _guard = StateGuard::enter(&self.state, SaveState::Loading)?;
        let (summary, _) = self.reload(grid, mode, None).await?;
        self.refresh_units().await;
        log::info!(
            "loaded {} cells ({} unmatched, {} invalid)",
            summary.applied,
            summary.unmatched,
            summary.invalid
        );
        Ok(summary)
    }

    /// Persist the grid and reconcile it with the server's view.
    pub async fn save(&self, grid: &RefCell<GridModel>) -> Result<SaveReport, GridError> {
        self.ensure_context()?;
        let guard = StateGuard::enter(&self.state, SaveState::Saving)?;
        let ctx = self.context();
        let (payload, revision) = {
            let grid = grid.borrow();
            (build_payload(&grid, &ctx), grid.revision())
        };

        let prices = self.persist_prices(&ctx, &payload.prices).await?;

        let body = CellBulkBody {
            plan_id: ctx.plan_key(),
            branch_id: ctx.branch_id.clone().unwrap_or_default(),
            cells: &payload.cells,
        };
        log::debug!("writing {} cells", payload.cells.len());
        self.cancel.run(self.api.put_cells_bulk(&body)).await?;

        guard.advance(SaveState::Reconciling);
        let (reconciled, pending_edits) = match self.reload(grid, LoadMode::Replace, Some(revision)).await {
            Ok((summary, pending)) => (Ok(summary), pending),
            Err(GridError::Cancelled) => return Err(GridError::Cancelled),
            Err(e) => {
                log::warn!("save succeeded but reload failed: {e}");
                let pending = grid.borrow().edits_since(revision).len();
                (Err(e.to_string()), pending)
            }
        };
        if pending_edits > 0 {
            log::info!("{pending_edits} edits made during the save were kept locally");
        }
        let units_refreshed = self.refresh_units().await;

        log::info!(
            "saved {} prices and {} cells",
            payload.prices.len(),
            payload.cells.len()
        );
        Ok(SaveReport {
            prices,
            cells_written: payload.cells.len(),
            skipped_items: payload.skipped_items,
            reconciled,
            units_refreshed,
            pending_edits,
        })
    }

    async fn persist_prices(&self, ctx: &SaveContext, prices: &[PriceEntry]) -> Result<PriceOutcome, GridError> {
        if prices.is_empty() {
            return Ok(PriceOutcome::Skipped);
        }

        for shape in PriceShape::ORDER {
            let Some(body) = shape.bulk_body(ctx, prices) else {
                continue;
            };
            log::debug!("bulk price write ({shape:?}, {} items)", prices.len());
            match self.cancel.run(self.api.put_prices_bulk(shape, &body)).await {
                Ok(()) => return Ok(PriceOutcome::Bulk(shape)),
                Err(e) if e.is_rejection() => {
                    log::warn!("bulk price write ({shape:?}) rejected: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let mut saved = 0;
        let mut failed = Vec::new();
        let mut last_error = None;
        for entry in prices {
            match self.persist_price_item(ctx, entry).await {
                Ok(()) => saved += 1,
                Err(GridError::Cancelled) => return Err(GridError::Cancelled),
                Err(e) => {
                    log::warn!("price write for item {} failed: {e}", entry.item_external_id);
                    failed.push(entry.item_external_id.clone());
                    last_error = Some(e);
                }
            }
        }

        if saved == 0 {
            return Err(match last_error {
                Some(e) if !e.is_rejection() => e,
                _ => GridError::PricesRejected {
                    attempted: prices.len(),
                },
            });
        }
        Ok(PriceOutcome::PerItem { saved, failed })
    }

    async fn persist_price_item(&self, ctx: &SaveContext, entry: &PriceEntry) -> Result<(), GridError> {
        let mut last_error = GridError::PricesRejected { attempted: 1 };
        for shape in PriceShape::ORDER {
            let Some(body) = shape.item_body(ctx, entry) else {
                continue;
            };
            match self.cancel.run(self.api.put_price_item(shape, &body)).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_rejection() => last_error = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    /// Fetch and apply the server's values. With `keep_since`, edits made
    /// after that grid revision survive the reload; their count is returned.
    async fn reload(
        &self,
        grid: &RefCell<GridModel>,
        mode: LoadMode,
        keep_since: Option<u64>,
    ) -> Result<(LoadSummary, usize), GridError> {
        let ctx = self.context();
        let records = self.cancel.run(self.api.fetch_records(&ctx)).await?;
        let prices = match self.cancel.run(self.api.fetch_prices(&ctx)).await {
            Ok(prices) => prices,
            Err(GridError::Cancelled) => return Err(GridError::Cancelled),
            Err(e) => {
                log::warn!("price reload failed, keeping local prices: {e}");
                Vec::new()
            }
        };

        let mut grid = grid.borrow_mut();
        let local = keep_since.map(|revision| grid.edits_since(revision)).unwrap_or_default();
        let summary = grid.load_from_records(&records, mode);
        grid.load_prices(&prices);
        grid.restore_edits(&local);
        Ok((summary, local.len()))
    }

    /// Refresh the unit lookup. Failures keep the previous list.
    async fn refresh_units(&self) -> bool {
        match self.cancel.run(self.api.fetch_units()).await {
            Ok(units) => {
                let lookup: HashMap<String, String> = units
                    .into_iter()
                    .map(|u| (u.name.trim().to_lowercase(), u.id))
                    .collect();
                self.context.borrow_mut().units = lookup;
                true
            }
            Err(e) => {
                log::warn!("unit list refresh failed: {e}");
                false
            }
        }
    }
}
