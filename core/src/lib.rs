//! Recipe catalog and meal log backed by SQLite.
//!
//! [`service::CatalogService`] is the entry point for front ends; the
//! lower-level [`db::Database`] is public for tools that want raw access.

pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod names;
pub mod service;
