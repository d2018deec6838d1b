//! One editable table: the model, its navigator, the scroll synchronizer and
//! the persistence gateway, bound to a session.
//!
//! Everything is single-threaded. The model sits in a `RefCell` that is only
//! borrowed for the duration of a synchronous step, so edits made while a
//! save is awaiting the network go through and are then overwritten by the
//! reconciliation reload.

use std::cell::{Ref, RefCell, RefMut};

use super::aggregation::{compute_snapshot, AggregateSnapshot};
use super::cancel::CancelToken;
use super::error::GridError;
use super::grid::GridModel;
use super::grid_config::GridConfig;
use super::line_item::PriceField;
use super::navigation::{CellNavigator, Direction, FocusHandle, GridCoord, NavigationOutcome, ViewportMetrics};
use super::persistence::PersistenceGateway;
use super::records::LoadMode;
use super::scroll_sync::ScrollSynchronizer;
use super::session::Session;
use super::status::StatusMessage;
use crate::ports::plan_api_port::PlanApiPort;

pub struct GridInstance<P, H> {
    name: String,
    placeholder: String,
    grid: RefCell<GridModel>,
    navigator: RefCell<CellNavigator<H>>,
    scroll: RefCell<ScrollSynchronizer>,
    gateway: PersistenceGateway<P>,
    session: Session,
    cancel: CancelToken,
    status: RefCell<Option<StatusMessage>>,
}

impl<P: PlanApiPort, H: FocusHandle> GridInstance<P, H> {
    pub fn new(config: &GridConfig, api: P, session: Session) -> Result<Self, GridError> {
        let grid = config.model()?;
        let rows = grid.editable_items().count();
        let periods = grid.calendar().len();
        let cancel = CancelToken::new();

        let mut context = config.context.clone();
        if context.branch_id.is_none() {
            context.branch_id = session.branch_id.clone();
        }

        let unresolved: Vec<&str> = grid.unresolved_items().map(|i| i.id.as_str()).collect();
        if !unresolved.is_empty() {
            log::warn!(
                "grid {}: line items without a backend identifier: {}",
                config.name,
                unresolved.join(", ")
            );
        }

        Ok(Self {
            name: config.name.clone(),
            placeholder: config.placeholder.clone(),
            grid: RefCell::new(grid),
            navigator: RefCell::new(CellNavigator::new(rows, periods)),
            scroll: RefCell::new(ScrollSynchronizer::new()),
            gateway: PersistenceGateway::new(api, context, cancel.clone()),
            session,
            cancel,
            status: RefCell::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn grid(&self) -> Ref<'_, GridModel> {
        self.grid.borrow()
    }

    pub fn gateway(&self) -> &PersistenceGateway<P> {
        &self.gateway
    }

    pub fn scroll(&self) -> RefMut<'_, ScrollSynchronizer> {
        self.scroll.borrow_mut()
    }

    /// Last status produced by a load or save.
    pub fn status(&self) -> Option<StatusMessage> {
        self.status.borrow().clone()
    }

    /// `Ok` when the session may edit and the backend context is complete.
    pub fn can_edit(&self) -> Result<(), GridError> {
        if !self.session.role.can_edit_grid() {
            return Err(GridError::ReadOnly {
                role: self.session.role.to_string(),
            });
        }
        self.gateway.ensure_context()
    }

    /// Store a quantity edit; returns the sanitized text to echo back into
    /// the input.
    pub fn edit_cell(&self, item_id: &str, period_key: &str, text: &str) -> Result<String, GridError> {
        self.can_edit()?;
        let mut grid = self.grid.borrow_mut();
        let cell = grid.set_cell(item_id, period_key, text)?;
        Ok(cell.raw_text().to_string())
    }

    pub fn edit_price(&self, item_id: &str, field: PriceField, text: &str) -> Result<(), GridError> {
        self.can_edit()?;
        self.grid.borrow_mut().set_price(item_id, field, text)?;
        Ok(())
    }

    /// Edit whatever the navigator coordinate addresses. Column 0 edits the
    /// sell price.
    pub fn edit_at(&self, coord: GridCoord, text: &str) -> Result<String, GridError> {
        self.can_edit()?;
        let mut grid = self.grid.borrow_mut();
        let (item_id, period_key) = match grid.target_at(coord) {
            Some(super::grid::CellTarget::Price { item_id }) => (item_id.to_string(), None),
            Some(super::grid::CellTarget::Quantity { item_id, period_key }) => {
                (item_id.to_string(), Some(period_key.to_string()))
            }
            None => {
                return Err(GridError::OutOfBounds {
                    row: coord.row,
                    col: coord.col,
                    rows: self.navigator.borrow().rows(),
                    cols: self.navigator.borrow().cols(),
                });
            }
        };
        match period_key {
            Some(period) => Ok(grid.set_cell(&item_id, &period, text)?.raw_text().to_string()),
            None => Ok(grid.set_price(&item_id, PriceField::Sell, text)?.sell_price.clone()),
        }
    }

    /// Run a bulk edit (e.g. an import) against the model under the same
    /// permission checks as single-cell edits.
    pub fn edit<T>(&self, f: impl FnOnce(&mut GridModel) -> T) -> Result<T, GridError> {
        self.can_edit()?;
        Ok(f(&mut self.grid.borrow_mut()))
    }

    /// Clear every quantity (and prices unless preserved). Gated like any
    /// other edit.
    pub fn reset(&self, preserve_prices: bool) -> Result<(), GridError> {
        self.can_edit()?;
        self.grid.borrow_mut().reset(preserve_prices);
        Ok(())
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        compute_snapshot(&self.grid.borrow())
    }

    pub fn register_handle(&self, coord: GridCoord, handle: H) -> Result<Option<H>, GridError> {
        self.navigator.borrow_mut().register(coord, handle)
    }

    pub fn unregister_handle(&self, coord: GridCoord) -> Option<H> {
        self.navigator.borrow_mut().unregister(coord)
    }

    /// Handle a key press in the input at `from`. Returns `None` for keys
    /// that do not navigate and for moves without a registered target.
    /// Horizontal scrolling goes through the synchronizer so the frozen
    /// strips follow on the next frame.
    pub fn handle_key(
        &self,
        from: GridCoord,
        key: &str,
        shift: bool,
        viewport: &ViewportMetrics,
    ) -> Option<NavigationOutcome> {
        let direction = Direction::from_key(key, shift)?;
        let outcome = self.navigator.borrow_mut().navigate(from, direction, viewport)?;
        if let Some(target) = outcome.scroll {
            if target.left != viewport.scroll_left {
                self.scroll.borrow_mut().scroll_body_to(target.left);
            }
        }
        Some(outcome)
    }

    pub async fn load(&self, mode: LoadMode) -> StatusMessage {
        let message = match self.gateway.load(&self.grid, mode).await {
            Ok(summary) => StatusMessage::from_load(&summary),
            Err(e) => {
                log::warn!("grid {}: load failed: {e}", self.name);
                StatusMessage::from_error(&e)
            }
        };
        self.status.replace(Some(message.clone()));
        message
    }

    pub async fn save(&self) -> StatusMessage {
        let message = match self.can_edit() {
            Err(e) => StatusMessage::from_error(&e),
            Ok(()) => match self.gateway.save(&self.grid).await {
                Ok(report) => StatusMessage::from_report(&report),
                Err(e) => {
                    log::warn!("grid {}: save failed: {e}", self.name);
                    StatusMessage::from_error(&e)
                }
            },
        };
        self.status.replace(Some(message.clone()));
        message
    }

    /// Cancel every in-flight network operation. Called on drop.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}

impl<P, H> Drop for GridInstance<P, H> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
