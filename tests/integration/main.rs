//! Integration tests for a11y-crawl
//!
//! Scans run end-to-end against an in-process fake browser; HTTP
//! collaborators are served by wiremock.

mod remote_tests;
mod scan_tests;
mod service_tests;
mod support;
