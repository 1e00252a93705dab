//! Integration tests for doc-harvest
//!
//! These tests use wiremock to create mock HTTP servers and drive the public
//! API end-to-end.

mod common;
mod crawl_tests;
mod search_tests;
mod topic_tests;
