//! coopledger: editable financial grid engine for cooperative planning.
//!
//! Hexagonal architecture: the grid engine in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`], and the command-line
//! front end in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
