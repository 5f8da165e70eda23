//! Pull-free observability for newsreact
//!
//! Metrics live in an in-process Prometheus registry and are rendered on
//! demand (the CLI prints them with `--metrics`). Nothing listens on a port.

pub mod metrics;

pub use metrics::Metrics;
