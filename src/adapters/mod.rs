//! Concrete adapter implementations for ports.

pub mod credential_file_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http")]
pub mod http_plan_adapter;
