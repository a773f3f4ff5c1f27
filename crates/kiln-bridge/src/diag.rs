//! Host-facing log sink.
//!
//! Library code logs through `tracing`; the host can additionally register a
//! sink to receive bridge-level diagnostics through its own channel (the
//! editor console, a file, a callback into managed code).

use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);
}

/// Default sink: forwards everything to `tracing`.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => debug!("{message}"),
            Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}
