//! # devops-app Test Utilities
//!
//! Shared test utilities for the devops-app service.
//!
//! This crate provides:
//! - Server test harness (`TestAppServer` for E2E tests)
//! - Exposition helpers (`scrape_counter`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devops_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestAppServer::spawn().await?;
//!
//!     let response = reqwest::get(format!("{}/healthz", server.url())).await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod exposition;
pub mod server_harness;

// Re-export commonly used items
pub use exposition::*;
pub use server_harness::*;
