//! Grid instance configuration: validation and construction from a
//! [`ConfigPort`].
//!
//! Everything a table needs (line items, fiscal calendar, backend context,
//! endpoint templates) is read here, so one engine serves every table.

use std::collections::HashSet;

use crate::domain::error::GridError;
use crate::domain::grid::GridModel;
use crate::domain::line_item::LineItem;
use crate::domain::payload::{PriceShape, SaveContext};
use crate::domain::period::{FiscalCalendar, PERIODS_PER_YEAR};
use crate::domain::sanitizer::MAX_FRACTION_DIGITS;
use crate::domain::session::{Role, Session};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_FISCAL_START_MONTH: u32 = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// JSON credential store holding the bearer token.
    pub credentials_path: Option<String>,
}

/// Path templates of the backend endpoints. Placeholders: `{plan}`,
/// `{year}`, `{branch}`, `{unit}` and `{item}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    pub records: String,
    pub cells: String,
    pub prices: String,
    pub prices_by_year: String,
    pub price_item: String,
    pub price_item_by_year: String,
    pub prices_read: String,
    pub units: String,
}

impl Default for EndpointSet {
    fn default() -> Self {
        Self {
            records: "/plans/{plan}/branches/{branch}/cells?unit={unit}".to_string(),
            cells: "/plans/{plan}/branches/{branch}/cells".to_string(),
            prices: "/plans/{plan}/prices".to_string(),
            prices_by_year: "/years/{year}/prices".to_string(),
            price_item: "/plans/{plan}/prices/{item}".to_string(),
            price_item_by_year: "/years/{year}/prices/{item}".to_string(),
            prices_read: "/plans/{plan}/prices".to_string(),
            units: "/units".to_string(),
        }
    }
}

impl EndpointSet {
    pub fn bulk_prices(&self, shape: PriceShape) -> &str {
        match shape {
            PriceShape::PlanKeyed => &self.prices,
            PriceShape::YearKeyed => &self.prices_by_year,
        }
    }

    pub fn price_item(&self, shape: PriceShape) -> &str {
        match shape {
            PriceShape::PlanKeyed => &self.price_item,
            PriceShape::YearKeyed => &self.price_item_by_year,
        }
    }

    /// Fill a template from the save context. Unknown values render empty.
    pub fn render(template: &str, ctx: &SaveContext, item: Option<&str>) -> String {
        template
            .replace("{plan}", &ctx.plan_key())
            .replace("{year}", &ctx.year.map(|y| y.to_string()).unwrap_or_default())
            .replace("{branch}", ctx.branch_id.as_deref().unwrap_or_default())
            .replace("{unit}", ctx.default_unit_id.as_deref().unwrap_or_default())
            .replace("{item}", item.unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub name: String,
    pub items: Vec<LineItem>,
    pub fiscal_start_month: u32,
    pub max_fraction_digits: Option<usize>,
    pub placeholder: String,
    pub api: ApiSettings,
    pub endpoints: EndpointSet,
    pub context: SaveContext,
    pub role: Role,
}

impl GridConfig {
    pub fn calendar(&self) -> Result<FiscalCalendar, GridError> {
        FiscalCalendar::starting_at(self.fiscal_start_month)
    }

    /// An empty grid for this configuration.
    pub fn model(&self) -> Result<GridModel, GridError> {
        GridModel::new(self.items.clone(), self.calendar()?, self.max_fraction_digits)
    }

    pub fn session(&self) -> Session {
        Session::new(self.role, self.context.branch_id.clone())
    }
}

pub fn validate_grid_config(config: &dyn ConfigPort) -> Result<(), GridError> {
    validate_base_url(config)?;
    validate_timeout(config)?;
    validate_start_month(config)?;
    validate_fraction_digits(config)?;
    validate_year(config)?;
    validate_items(config)?;
    Ok(())
}

/// Validate, then assemble the [`GridConfig`].
pub fn build_grid_config(config: &dyn ConfigPort) -> Result<GridConfig, GridError> {
    validate_grid_config(config)?;

    let defaults = EndpointSet::default();
    let endpoint = |key: &str, fallback: &str| non_blank(config, "endpoints", key).unwrap_or_else(|| fallback.to_string());
    let endpoints = EndpointSet {
        records: endpoint("records", &defaults.records),
        cells: endpoint("cells", &defaults.cells),
        prices: endpoint("prices", &defaults.prices),
        prices_by_year: endpoint("prices_by_year", &defaults.prices_by_year),
        price_item: endpoint("price_item", &defaults.price_item),
        price_item_by_year: endpoint("price_item_by_year", &defaults.price_item_by_year),
        prices_read: endpoint("prices_read", &defaults.prices_read),
        units: endpoint("units", &defaults.units),
    };

    let api = ApiSettings {
        base_url: non_blank(config, "api", "base_url")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
        timeout_secs: parse_int(config, "api", "timeout_secs")?.map_or(DEFAULT_TIMEOUT_SECS, |v| v as u64),
        credentials_path: non_blank(config, "api", "credentials_path"),
    };

    let context = SaveContext {
        branch_id: non_blank(config, "context", "branch_id"),
        plan_id: non_blank(config, "context", "plan_id"),
        year: parse_int(config, "context", "year")?.map(|y| y as i32),
        default_unit_id: non_blank(config, "context", "default_unit_id"),
        units: Default::default(),
    };

    Ok(GridConfig {
        name: non_blank(config, "grid", "name").unwrap_or_else(|| "grid".to_string()),
        items: read_items(config),
        fiscal_start_month: parse_int(config, "grid", "fiscal_start_month")?
            .map_or(DEFAULT_FISCAL_START_MONTH, |m| m as u32),
        max_fraction_digits: parse_int(config, "grid", "max_fraction_digits")?.map(|d| d as usize),
        placeholder: config
            .get_string("grid", "placeholder")
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string()),
        api,
        endpoints,
        context,
        role: Role::parse(&config.get_string("context", "role").unwrap_or_default()),
    })
}

fn validate_base_url(config: &dyn ConfigPort) -> Result<(), GridError> {
    match non_blank(config, "api", "base_url") {
        None => Err(GridError::ConfigMissing {
            section: "api".to_string(),
            key: "base_url".to_string(),
        }),
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            Err(GridError::ConfigInvalid {
                section: "api".to_string(),
                key: "base_url".to_string(),
                reason: "base_url must start with http:// or https://".to_string(),
            })
        }
        Some(_) => Ok(()),
    }
}

fn validate_timeout(config: &dyn ConfigPort) -> Result<(), GridError> {
    if let Some(value) = parse_int(config, "api", "timeout_secs")? {
        if value < 1 {
            return Err(GridError::ConfigInvalid {
                section: "api".to_string(),
                key: "timeout_secs".to_string(),
                reason: "timeout_secs must be at least 1".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_start_month(config: &dyn ConfigPort) -> Result<(), GridError> {
    if let Some(value) = parse_int(config, "grid", "fiscal_start_month")? {
        if !(1..=PERIODS_PER_YEAR as i64).contains(&value) {
            return Err(GridError::ConfigInvalid {
                section: "grid".to_string(),
                key: "fiscal_start_month".to_string(),
                reason: "fiscal_start_month must be between 1 and 12".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_fraction_digits(config: &dyn ConfigPort) -> Result<(), GridError> {
    if let Some(value) = parse_int(config, "grid", "max_fraction_digits")? {
        if !(0..=MAX_FRACTION_DIGITS as i64).contains(&value) {
            return Err(GridError::ConfigInvalid {
                section: "grid".to_string(),
                key: "max_fraction_digits".to_string(),
                reason: format!("max_fraction_digits must be between 0 and {MAX_FRACTION_DIGITS}"),
            });
        }
    }
    Ok(())
}

fn validate_year(config: &dyn ConfigPort) -> Result<(), GridError> {
    if let Some(value) = parse_int(config, "context", "year")? {
        if !(1900..=9999).contains(&value) {
            return Err(GridError::ConfigInvalid {
                section: "context".to_string(),
                key: "year".to_string(),
                reason: "year must be a four-digit year".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_items(config: &dyn ConfigPort) -> Result<(), GridError> {
    let order = config.get_list("items", "order");
    if order.is_empty() {
        return Err(GridError::ConfigMissing {
            section: "items".to_string(),
            key: "order".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for id in &order {
        if !seen.insert(id.as_str()) {
            return Err(GridError::DuplicateItem(id.clone()));
        }
        let section = item_section(id);
        if non_blank(config, &section, "unit").is_none() {
            return Err(GridError::ConfigMissing {
                section,
                key: "unit".to_string(),
            });
        }
    }
    Ok(())
}

/// `[item.<id>]` sections whose id is not listed in `[items] order`. They
/// are ignored when building the grid, which usually means a typo.
pub fn unlisted_item_sections(config: &dyn ConfigPort) -> Vec<String> {
    let order: HashSet<String> = config.get_list("items", "order").into_iter().collect();
    config
        .sections()
        .into_iter()
        .filter(|name| {
            name.strip_prefix("item.")
                .is_some_and(|id| !order.contains(id))
        })
        .collect()
}

fn read_items(config: &dyn ConfigPort) -> Vec<LineItem> {
    config
        .get_list("items", "order")
        .into_iter()
        .map(|id| {
            let section = item_section(&id);
            let name = non_blank(config, &section, "name").unwrap_or_else(|| id.clone());
            let unit = non_blank(config, &section, "unit").unwrap_or_default();
            let mut item = LineItem::new(id, name, unit);
            if let Some(ext) = non_blank(config, &section, "external_id") {
                item = item.with_external_id(ext);
            }
            if !config.get_bool(&section, "editable", true) {
                item = item.read_only();
            }
            item
        })
        .collect()
}

fn item_section(id: &str) -> String {
    format!("item.{id}")
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `None` when absent or blank; an error when present but not an integer.
fn parse_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, GridError> {
    match non_blank(config, section, key) {
        None => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| GridError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("expected an integer, got {raw:?}"),
        }),
    }
}
