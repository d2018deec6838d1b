//! Planning backend over HTTP (reqwest).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapters::credential_file_adapter::CredentialFileAdapter;
use crate::domain::error::GridError;
use crate::domain::grid_config::{ApiSettings, EndpointSet, GridConfig};
use crate::domain::payload::{CellBulkBody, PriceBulkBody, PriceItemBody, PriceShape, SaveContext};
use crate::domain::records::{RemotePrice, RemoteRecord, UnitRecord};
use crate::ports::credential_port::resolve_bearer;
use crate::ports::plan_api_port::PlanApiPort;

/// Envelope keys list endpoints may wrap their array in.
const LIST_KEYS: [&str; 4] = ["items", "data", "records", "results"];

pub struct HttpPlanAdapter {
    http: reqwest::Client,
    base_url: String,
    endpoints: EndpointSet,
    token: Option<String>,
}

impl HttpPlanAdapter {
    pub fn new(api: &ApiSettings, endpoints: EndpointSet, token: Option<String>) -> Result<Self, GridError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("coopledger/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| GridError::Network {
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        if token.is_none() {
            log::warn!("no bearer token found; requests will be sent unauthenticated");
        }
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            endpoints,
            token,
        })
    }

    /// Build the adapter from a grid configuration, reading the bearer token
    /// from the configured credential store.
    pub fn from_config(config: &GridConfig) -> Result<Self, GridError> {
        let token = match &config.api.credentials_path {
            Some(path) => resolve_bearer(&CredentialFileAdapter::from_file(path)?),
            None => None,
        };
        Self::new(&config.api, config.endpoints.clone(), token)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, GridError> {
        let url = self.url(path);
        log::debug!("GET {url}");
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| GridError::Network { reason: e.to_string() })?;
        let body = check_status(response).await?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| GridError::Parse {
            reason: e.to_string(),
        })?;
        let mut skipped = 0;
        let list = unwrap_list(value)?
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<T>(entry) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    skipped += 1;
                    log::debug!("malformed entry from {url}: {e}");
                    None
                }
            })
            .collect();
        if skipped > 0 {
            log::warn!("{skipped} malformed entries skipped from {url}");
        }
        Ok(list)
    }

    async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), GridError> {
        let url = self.url(path);
        log::debug!("PUT {url}");
        let response = self
            .authorize(self.http.put(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| GridError::Network { reason: e.to_string() })?;
        check_status(response).await?;
        Ok(())
    }
}

impl PlanApiPort for HttpPlanAdapter {
    async fn fetch_records(&self, ctx: &SaveContext) -> Result<Vec<RemoteRecord>, GridError> {
        self.get_list(&EndpointSet::render(&self.endpoints.records, ctx, None))
            .await
    }

    async fn fetch_prices(&self, ctx: &SaveContext) -> Result<Vec<RemotePrice>, GridError> {
        self.get_list(&EndpointSet::render(&self.endpoints.prices_read, ctx, None))
            .await
    }

    async fn fetch_units(&self) -> Result<Vec<UnitRecord>, GridError> {
        self.get_list(&self.endpoints.units).await
    }

    async fn put_prices_bulk(&self, shape: PriceShape, body: &PriceBulkBody<'_>) -> Result<(), GridError> {
        let ctx = scope_context(body.plan_id.as_deref(), body.year);
        let path = EndpointSet::render(self.endpoints.bulk_prices(shape), &ctx, None);
        self.put_json(&path, body).await
    }

    async fn put_price_item(&self, shape: PriceShape, body: &PriceItemBody<'_>) -> Result<(), GridError> {
        let ctx = scope_context(body.plan_id.as_deref(), body.year);
        let path = EndpointSet::render(
            self.endpoints.price_item(shape),
            &ctx,
            Some(&body.item.item_external_id),
        );
        self.put_json(&path, body).await
    }

    async fn put_cells_bulk(&self, body: &CellBulkBody<'_>) -> Result<(), GridError> {
        let ctx = SaveContext {
            branch_id: Some(body.branch_id.clone()),
            plan_id: Some(body.plan_id.clone()),
            ..Default::default()
        };
        let path = EndpointSet::render(&self.endpoints.cells, &ctx, None);
        self.put_json(&path, body).await
    }
}

/// Context carrying only the scope a price body was built for, so the path
/// and the body always agree.
fn scope_context(plan_id: Option<&str>, year: Option<i32>) -> SaveContext {
    SaveContext {
        plan_id: plan_id.map(str::to_string),
        year,
        ..Default::default()
    }
}

async fn check_status(response: reqwest::Response) -> Result<String, GridError> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_success() {
        Ok(body)
    } else {
        Err(GridError::Http {
            status: status.as_u16(),
            detail: extract_error_detail(status.as_u16(), &body),
        })
    }
}

/// Best-effort error text: `detail` or `message` from a JSON body, else the
/// raw body, else the status code alone.
pub fn extract_error_detail(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["detail", "message"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
                Some(serde_json::Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}

/// Accept a bare array or an object wrapping one under a known key.
fn unwrap_list(value: serde_json::Value) -> Result<Vec<serde_json::Value>, GridError> {
    match value {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => LIST_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(serde_json::Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| GridError::Parse {
                reason: "expected a JSON array or an object with an items/data/records list".to_string(),
            }),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(GridError::Parse {
            reason: format!("expected a JSON array, got {other}"),
        }),
    }
}
