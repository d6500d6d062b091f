//! Quotawatch - REST API over parliamentary expense reimbursements
//!
//! This crate serves the chamber's reimbursement dataset through:
//! - A filterable, paginated list endpoint
//! - Single-record retrieval by document id
//! - A memoized receipt existence check against the chamber's document host
//! - A CSV importer for dataset refreshes

pub mod config;
pub mod loader;
pub mod models;
pub mod receipt;
pub mod server;
pub mod storage;
