//! Grid engine: data model, sanitization, aggregation, navigation, scroll
//! synchronization and the save protocol.

pub mod sanitizer;
pub mod period;
pub mod line_item;
pub mod records;
pub mod grid;
pub mod aggregation;
pub mod navigation;
pub mod scroll_sync;
pub mod cancel;
pub mod session;
pub mod payload;
pub mod persistence;
pub mod status;
pub mod grid_config;
pub mod instance;
pub mod error;
