//! HTTP request handlers.

pub mod health;
pub mod info;
pub mod metrics;

pub use health::health_check;
pub use info::{favicon, hello, index, not_found, work};
pub use metrics::metrics_handler;
