//! Metrics Module
//! 
//! Gauge sink written by the polling engine, its Prometheus registry and
//! the HTTP listener Prometheus scrapes.

pub mod collector;
pub mod server;
pub mod sink;

pub use collector::PrometheusSink;
pub use server::MetricsServer;
pub use sink::{Gauge, MetricsSink};
