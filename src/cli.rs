//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregation::compute_snapshot;
use crate::domain::error::GridError;
use crate::domain::grid::GridModel;
use crate::domain::grid_config::{build_grid_config, unlisted_item_sections, GridConfig};
use crate::domain::payload::{build_payload, CellBulkBody, PriceShape};

#[derive(Parser, Debug)]
#[command(name = "coopledger", about = "Cooperative plan grid: edit, total and save")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a grid configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the grid with totals
    Show {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV edits to apply before printing
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Load saved values from the server first
        #[arg(long)]
        remote: bool,
    },
    /// Write the grid with totals to CSV
    Export {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        remote: bool,
    },
    /// Apply CSV edits and save them to the server
    Save {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        /// Print the request bodies instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { config } => run_validate(&config),
        Command::Show {
            config,
            input,
            remote,
        } => run_show(&config, input.as_deref(), remote),
        Command::Export {
            config,
            output,
            input,
            remote,
        } => run_export(&config, &output, input.as_deref(), remote),
        Command::Save {
            config,
            input,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, &input)
            } else {
                run_save(&config, &input)
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<GridConfig, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path).map_err(|e| fail(&e))?;
    for section in unlisted_item_sections(&adapter) {
        eprintln!("warning: [{section}] is not listed in [items] order and is ignored");
    }
    build_grid_config(&adapter).map_err(|e| fail(&e))
}

fn fail(err: &GridError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let grid = match config.model() {
        Ok(g) => g,
        Err(e) => return fail(&e),
    };

    eprintln!("Grid:    {}", config.name);
    eprintln!(
        "Periods: {} .. {}",
        grid.calendar().periods().first().map_or("", |p| p.label.as_str()),
        grid.calendar().periods().last().map_or("", |p| p.label.as_str())
    );
    eprintln!("Items:   {} ({} editable)", grid.items().len(), grid.editable_items().count());
    for item in grid.unresolved_items() {
        eprintln!("warning: item {} has no external id and will not be saved", item.id);
    }

    let missing = config.context.missing();
    if missing.is_empty() {
        eprintln!("Context: complete (plan {})", config.context.plan_key());
    } else {
        eprintln!("warning: editing disabled, missing {}", missing.join(", "));
    }
    if !config.role.can_edit_grid() {
        eprintln!("warning: role {} is read-only", config.role);
    }

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}

/// Build the grid, optionally loading remote values and applying CSV edits.
pub fn prepare_grid(config: &GridConfig, input: Option<&Path>, remote: bool) -> Result<GridModel, GridError> {
    let mut grid = if remote {
        load_remote(config)?
    } else {
        config.model()?
    };
    if let Some(path) = input {
        eprintln!("Applying edits from {}", path.display());
        let summary = csv_adapter::import_file(path, &mut grid)?;
        eprintln!("  {} cells, {} price fields", summary.cells, summary.prices);
        for skipped in &summary.skipped {
            eprintln!("warning: skipped {skipped}");
        }
    }
    Ok(grid)
}

#[cfg(feature = "http")]
fn load_remote(config: &GridConfig) -> Result<GridModel, GridError> {
    use crate::adapters::http_plan_adapter::HttpPlanAdapter;
    use crate::domain::cancel::CancelToken;
    use crate::domain::persistence::PersistenceGateway;
    use crate::domain::records::LoadMode;
    use std::cell::RefCell;

    let api = HttpPlanAdapter::from_config(config)?;
    let gateway = PersistenceGateway::new(api, config.context.clone(), CancelToken::new());
    let grid = RefCell::new(config.model()?);

    eprintln!("Loading saved values from {}", config.api.base_url);
    let summary = runtime()?.block_on(gateway.load(&grid, LoadMode::Replace))?;
    eprintln!(
        "  {} cells loaded ({} unmatched, {} invalid)",
        summary.applied, summary.unmatched, summary.invalid
    );
    Ok(grid.into_inner())
}

#[cfg(not(feature = "http"))]
fn load_remote(_config: &GridConfig) -> Result<GridModel, GridError> {
    Err(GridError::Network {
        reason: "http feature is required for remote access".to_string(),
    })
}

#[cfg(feature = "http")]
fn runtime() -> Result<tokio::runtime::Runtime, GridError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

pub fn run_show(config_path: &Path, input: Option<&Path>, remote: bool) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    match prepare_grid(&config, input, remote) {
        Ok(grid) => {
            print!("{}", render_table(&grid, &config.placeholder));
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn run_export(config_path: &Path, output: &Path, input: Option<&Path>, remote: bool) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let result = prepare_grid(&config, input, remote)
        .and_then(|grid| csv_adapter::export_file(output, &grid, &config.placeholder));
    match result {
        Ok(()) => {
            eprintln!("Grid written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn run_dry_run(config_path: &Path, input: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let missing = config.context.missing();
    if !missing.is_empty() {
        return fail(&GridError::ConfigurationGap { missing });
    }
    let grid = match prepare_grid(&config, Some(input), false) {
        Ok(g) => g,
        Err(e) => return fail(&e),
    };

    let ctx = &config.context;
    let payload = build_payload(&grid, ctx);
    let prices = PriceShape::ORDER
        .into_iter()
        .find_map(|shape| shape.bulk_body(ctx, &payload.prices));
    let cells = CellBulkBody {
        plan_id: ctx.plan_key(),
        branch_id: ctx.branch_id.clone().unwrap_or_default(),
        cells: &payload.cells,
    };
    let bodies = serde_json::json!({
        "prices": prices,
        "cells": cells,
    });
    match serde_json::to_string_pretty(&bodies) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            return fail(&GridError::Parse {
                reason: e.to_string(),
            })
        }
    }

    for id in &payload.skipped_items {
        eprintln!("warning: item {id} has no external id and is left out");
    }
    eprintln!(
        "\nDry run complete: {} prices, {} cells would be written",
        payload.prices.len(),
        payload.cells.len()
    );
    ExitCode::SUCCESS
}

#[cfg(feature = "http")]
fn run_save(config_path: &Path, input: &Path) -> ExitCode {
    use crate::adapters::http_plan_adapter::HttpPlanAdapter;
    use crate::domain::instance::GridInstance;
    use crate::domain::navigation::{FocusHandle, Rect};
    use crate::domain::records::LoadMode;

    /// The CLI has no focusable inputs.
    struct NoFocus;

    impl FocusHandle for NoFocus {
        fn focus(&mut self) {}
        fn select_all(&mut self) {}
        fn bounds(&self) -> Rect {
            Rect::default()
        }
    }

    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let api = match HttpPlanAdapter::from_config(&config) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let instance: GridInstance<_, NoFocus> = match GridInstance::new(&config, api, config.session()) {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };
    if let Err(e) = instance.can_edit() {
        return fail(&e);
    }
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => return fail(&e),
    };

    eprintln!("Loading saved values from {}", config.api.base_url);
    let loaded = rt.block_on(instance.load(LoadMode::Replace));
    eprintln!("  {}: {}", loaded.title, loaded.detail);
    if loaded.is_error() {
        return ExitCode::from(3);
    }

    eprintln!("Applying edits from {}", input.display());
    let imported = instance.edit(|grid| csv_adapter::import_file(input, grid));
    match imported {
        Ok(Ok(summary)) => {
            eprintln!("  {} cells, {} price fields", summary.cells, summary.prices);
            for skipped in &summary.skipped {
                eprintln!("warning: skipped {skipped}");
            }
        }
        Ok(Err(e)) | Err(e) => return fail(&e),
    }

    eprintln!("Saving {}...", instance.name());
    let status = rt.block_on(instance.save());
    eprintln!("{}: {}", status.title, status.detail);
    if status.is_error() {
        return ExitCode::from(5);
    }
    print!("{}", render_table(&instance.grid(), instance.placeholder()));
    ExitCode::SUCCESS
}

#[cfg(not(feature = "http"))]
fn run_save(_config_path: &Path, _input: &Path) -> ExitCode {
    eprintln!("error: http feature is required for save");
    ExitCode::from(1)
}

/// Plain-text grid: one row per item, one column per period, row totals on
/// the right and period totals in the footer.
pub fn render_table(grid: &GridModel, placeholder: &str) -> String {
    let snapshot = compute_snapshot(grid);
    let periods = grid.calendar().periods();

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(grid.items().len() + 2);
    let mut header = vec!["Item".to_string(), "Price".to_string()];
    header.extend(periods.iter().map(|p| p.label.chars().take(3).collect()));
    header.extend(["Qty".to_string(), "Amount".to_string()]);
    rows.push(header);

    for item in grid.items() {
        let mut name = item.name.clone();
        if !item.is_resolved() {
            name.push_str(" (!)");
        }
        let price = grid
            .price(&item.id)
            .map(|p| p.sell_price.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| placeholder.to_string());
        let mut row = vec![name, price];
        row.extend(periods.iter().map(|p| match grid.cell(&item.id, &p.key) {
            Some(cell) if !cell.is_blank() => cell.raw_text().to_string(),
            _ => placeholder.to_string(),
        }));
        let totals = snapshot.item(&item.id).copied().unwrap_or_default();
        row.push(totals.display_quantity(placeholder));
        row.push(totals.display_amount(placeholder));
        rows.push(row);
    }

    let mut footer = vec!["Total".to_string(), String::new()];
    footer.extend(
        snapshot
            .periods
            .iter()
            .map(|p| p.totals.display_amount(placeholder)),
    );
    footer.push(snapshot.grand.display_quantity(placeholder));
    footer.push(snapshot.grand.display_amount(placeholder));
    rows.push(footer);

    let cols = rows[0].len();
    let widths: Vec<usize> = (0..cols)
        .map(|c| rows.iter().map(|r| r[c].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, text)| {
                if c == 0 {
                    format!("{text:<width$}", width = widths[c])
                } else {
                    format!("{text:>width$}", width = widths[c])
                }
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
