//! # tran-probe — one-shot line-protocol client
//!
//! Loads a TOML configuration, connects with `tran-core`, sends a single
//! request and prints the assembled response.

pub mod config;
pub mod probe;
