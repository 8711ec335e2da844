use std::time::Duration;

use serde_json::json;

use crate::logging::{LogEvent, LogFields, LogLevel};

/// Counters accumulated by the event host while the engine runs.
#[derive(Debug, Default, Clone)]
pub struct EngineMetrics {
    events: u64,
    dry_runs: u64,
    claims_committed: u64,
    claims_rejected: u64,
    items_added: u64,
    items_deleted: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self) {
        self.events = self.events.saturating_add(1);
    }

    pub fn record_dry_run(&mut self) {
        self.dry_runs = self.dry_runs.saturating_add(1);
    }

    pub fn record_claim(&mut self, committed: bool) {
        if committed {
            self.claims_committed = self.claims_committed.saturating_add(1);
        } else {
            self.claims_rejected = self.claims_rejected.saturating_add(1);
        }
    }

    pub fn record_add(&mut self) {
        self.items_added = self.items_added.saturating_add(1);
    }

    pub fn record_delete(&mut self) {
        self.items_deleted = self.items_deleted.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            events: self.events,
            dry_runs: self.dry_runs,
            claims_committed: self.claims_committed,
            claims_rejected: self.claims_rejected,
            items_added: self.items_added,
            items_deleted: self.items_deleted,
        }
    }
}

/// Point-in-time view of the counters, ready for logging.
#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub events: u64,
    pub dry_runs: u64,
    pub claims_committed: u64,
    pub claims_rejected: u64,
    pub items_added: u64,
    pub items_deleted: u64,
}

impl MetricSnapshot {
    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("events".to_string(), json!(self.events));
        map.insert("dry_runs".to_string(), json!(self.dry_runs));
        map.insert(
            "claims_committed".to_string(),
            json!(self.claims_committed),
        );
        map.insert("claims_rejected".to_string(), json!(self.claims_rejected));
        map.insert("items_added".to_string(), json!(self.items_added));
        map.insert("items_deleted".to_string(), json!(self.items_deleted));
        map
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(
            LogLevel::Info,
            target.to_string(),
            "engine_metrics".to_string(),
            self.as_fields(),
        )
    }
}
