//! Instance cache, navigation and secret-aware sharing for a formal modeling
//! workbench.
//!
//! - [`controller`]: runs solver commands and navigates their instances
//! - [`cache`]: the per-session instance cache behind navigation
//! - [`secrets`]: secret regions in model source and their redaction
//! - [`db`]: models, links and the derivation lineage
//! - [`api`]: HTTP surface for sharing and link resolution

pub mod api;
pub mod cache;
pub mod client;
pub mod commands;
pub mod controller;
pub mod db;
pub mod models;
pub mod secrets;
pub mod solver;
pub mod terminal;
