//! PABX Exporter Library
//!
//! Polls a PABX telephony server's HTTP management API, classifies the
//! active calls by trunk and republishes call and system gauges for
//! Prometheus to scrape.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod pabx;
pub mod session;
pub mod shutdown;

pub use classifier::CallClassifier;
pub use config::Config;
pub use engine::PollingEngine;
pub use metrics::{MetricsSink, PrometheusSink};
pub use pabx::PabxClient;
pub use session::{Session, SessionManager};
pub use shutdown::ShutdownCoordinator;

/// Common error type for application plumbing
pub type Result<T> = anyhow::Result<T>;
