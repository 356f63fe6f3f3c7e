//! Prometheus Collector
//!
//! [`MetricsSink`] backed by a private `prometheus::Registry`.

use super::sink::{Gauge, MetricsSink};
use crate::Result;
use anyhow::Context;
use prometheus::{GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use tracing::{error, warn};

/// Registry holding every exporter gauge
pub struct PrometheusSink {
    registry: Registry,
    prefix: String,
    plain: HashMap<Gauge, prometheus::Gauge>,
    labeled: HashMap<Gauge, GaugeVec>,
}

impl PrometheusSink {
    /// Create and register all gauges under `prefix`
    pub fn new(prefix: &str) -> Result<Self> {
        let registry = Registry::new();
        let mut plain = HashMap::new();
        let mut labeled = HashMap::new();

        for gauge in Gauge::ALL {
            let name = metric_name(prefix, gauge);
            let opts = Opts::new(name.clone(), gauge.help());

            if gauge.is_labeled() {
                let vec = GaugeVec::new(opts, gauge.label_names())
                    .with_context(|| format!("Failed to create {} gauge", name))?;
                registry
                    .register(Box::new(vec.clone()))
                    .with_context(|| format!("Failed to register {}", name))?;
                labeled.insert(gauge, vec);
            } else {
                let single = prometheus::Gauge::with_opts(opts)
                    .with_context(|| format!("Failed to create {} gauge", name))?;
                registry
                    .register(Box::new(single.clone()))
                    .with_context(|| format!("Failed to register {}", name))?;
                plain.insert(gauge, single);
            }
        }

        Ok(Self {
            registry,
            prefix: prefix.to_string(),
            plain,
            labeled,
        })
    }

    /// Also export CPU, memory and file-descriptor metrics of this process,
    /// under the same prefix
    #[cfg(target_os = "linux")]
    pub fn with_process_metrics(self) -> Result<Self> {
        let pid = std::process::id() as i32;
        let collector = prometheus::process_collector::ProcessCollector::new(pid, self.prefix.clone());
        self.registry
            .register(Box::new(collector))
            .context("Failed to register process collector")?;
        Ok(self)
    }

    #[cfg(not(target_os = "linux"))]
    pub fn with_process_metrics(self) -> Result<Self> {
        warn!("Process metrics are only available on Linux");
        Ok(self)
    }

    /// Current value of a gauge, if that series exists
    pub fn value(&self, gauge: Gauge, labels: &[&str]) -> Option<f64> {
        if !gauge.is_labeled() {
            return self.plain.get(&gauge).map(|g| g.get());
        }

        let name = metric_name(&self.prefix, gauge);
        let families = self.registry.gather();
        let family = families.iter().find(|f| f.get_name() == name)?;

        family
            .get_metric()
            .iter()
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && gauge.label_names().iter().zip(labels).all(|(label_name, wanted)| {
                        pairs
                            .iter()
                            .any(|p| p.get_name() == *label_name && p.get_value() == *wanted)
                    })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }
}

impl MetricsSink for PrometheusSink {
    fn set(&self, gauge: Gauge, value: f64) {
        match self.plain.get(&gauge) {
            Some(g) => g.set(value),
            None => warn!(gauge = ?gauge, "Labeled gauge written without labels"),
        }
    }

    fn set_labeled(&self, gauge: Gauge, labels: &[&str], value: f64) {
        let Some(vec) = self.labeled.get(&gauge) else {
            warn!(gauge = ?gauge, "Plain gauge written with labels");
            return;
        };

        // One info series at a time: a new label set replaces the old one
        if gauge == Gauge::SystemInfo {
            vec.reset();
        }

        match vec.get_metric_with_label_values(labels) {
            Ok(g) => g.set(value),
            Err(e) => warn!(gauge = ?gauge, labels = ?labels, error = %e, "Rejected gauge labels"),
        }
    }
}

fn metric_name(prefix: &str, gauge: Gauge) -> String {
    if prefix.is_empty() {
        gauge.suffix().to_string()
    } else {
        format!("{}_{}", prefix, gauge.suffix())
    }
}
