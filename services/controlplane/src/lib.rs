//! Gatehouse governance service library crate.
//!
//! # Purpose
//! Exposes the governance engine, the HTTP API surface, configuration, and
//! storage implementations for use by the binary and tests.
//!
//! # Notes
//! Access resolution itself is pure and lives in `gatehouse-authz`; this crate
//! loads permission sources, governs changes to them, and serves the results.
pub mod api;
pub mod app;
pub mod config;
pub mod governance;
pub mod model;
pub mod observability;
pub mod store;
