//! Port traits: the seams between the grid engine and the outside world.

pub mod config_port;
pub mod credential_port;
pub mod plan_api_port;
