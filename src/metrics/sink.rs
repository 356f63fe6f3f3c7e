//! Metrics Sink
//!
//! The polling engine only ever writes gauges; reading and exposing them
//! is the sink owner's business.

/// Every gauge the exporter publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gauge {
    ActiveCalls,
    TrunkCalls,
    MaxSimultaneousCalls,
    DiskUsage,
    DiskUsageRecording,
    DiskUsageChat,
    DiskUsageLog,
    SystemInfo,
    RegisteredExtensions,
    TotalExtensions,
    RegisteredTrunks,
    TotalTrunks,
    ErrorCapture,
}

impl Gauge {
    pub const ALL: [Gauge; 13] = [
        Gauge::ActiveCalls,
        Gauge::TrunkCalls,
        Gauge::MaxSimultaneousCalls,
        Gauge::DiskUsage,
        Gauge::DiskUsageRecording,
        Gauge::DiskUsageChat,
        Gauge::DiskUsageLog,
        Gauge::SystemInfo,
        Gauge::RegisteredExtensions,
        Gauge::TotalExtensions,
        Gauge::RegisteredTrunks,
        Gauge::TotalTrunks,
        Gauge::ErrorCapture,
    ];

    /// Metric name without the configured prefix
    pub fn suffix(self) -> &'static str {
        match self {
            Gauge::ActiveCalls => "active_calls_total",
            Gauge::TrunkCalls => "trunk_calls_total",
            Gauge::MaxSimultaneousCalls => "max_simultaneous_total",
            Gauge::DiskUsage => "disk_usage_percentage_total",
            Gauge::DiskUsageRecording => "disk_usage_recording_percentage_total",
            Gauge::DiskUsageChat => "disk_usage_chat_total",
            Gauge::DiskUsageLog => "disk_usage_log_total",
            Gauge::SystemInfo => "system_info",
            Gauge::RegisteredExtensions => "registered_extensions_total",
            Gauge::TotalExtensions => "total_extensions",
            Gauge::RegisteredTrunks => "registered_trunks_total",
            Gauge::TotalTrunks => "trunks_total",
            Gauge::ErrorCapture => "error_capture",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Gauge::ActiveCalls => "Total active calls",
            Gauge::TrunkCalls => "Total calls per trunk",
            Gauge::MaxSimultaneousCalls => "Maximum number of simultaneous calls allowed",
            Gauge::DiskUsage => "Disk usage percentage",
            Gauge::DiskUsageRecording => "Disk usage percentage for recording",
            Gauge::DiskUsageChat => "Disk space used by chat",
            Gauge::DiskUsageLog => "Disk space used by logs",
            Gauge::SystemInfo => "System information",
            Gauge::RegisteredExtensions => "Number of registered extensions",
            Gauge::TotalExtensions => "Total number of extensions",
            Gauge::RegisteredTrunks => "Number of registered trunks",
            Gauge::TotalTrunks => "Number of trunks",
            Gauge::ErrorCapture => "Last outcome per operation (0 = healthy, 1 = failing)",
        }
    }

    /// Label names, empty for plain gauges
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            Gauge::TrunkCalls => &["trunk"],
            Gauge::SystemInfo => &["Version", "OS", "Ip", "Fqdn"],
            Gauge::ErrorCapture => &["error"],
            _ => &[],
        }
    }

    pub fn is_labeled(self) -> bool {
        !self.label_names().is_empty()
    }
}

/// Write-only gauge store
pub trait MetricsSink: Send + Sync {
    fn set(&self, gauge: Gauge, value: f64);

    /// `labels` are positional, in [`Gauge::label_names`] order
    fn set_labeled(&self, gauge: Gauge, labels: &[&str], value: f64);
}
