//! Integration tests for HomeFinder
//!
//! Sources run against wiremock servers; storage is SQLite (in memory or in
//! a temporary directory).

mod common;
mod fetcher_tests;
mod pipeline_tests;
mod traversal_tests;
