//! Audit trail consumer
//!
//! Records every event for compliance: per-type counters, a v7 UUID per
//! audit row (time-sortable for chronological queries), and a contiguity
//! check on the journal sequence. A gap here means an upstream bug, not a
//! recoverable condition, so it is counted and logged loudly.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use types::events::Event;
use uuid::Uuid;

use super::OutputSlot;

#[derive(Debug, Default)]
struct TrailState {
    counts_by_type: BTreeMap<String, u64>,
    last_sequence: Option<u64>,
    gaps_detected: u64,
    entries: u64,
}

/// Shared handle to the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    inner: Arc<Mutex<TrailState>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring handler feeding this trail.
    pub fn handler(&self) -> AuditHandler {
        AuditHandler {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Total audited events.
    pub fn entries(&self) -> u64 {
        self.inner.lock().expect("audit state poisoned").entries
    }

    /// Sequence gaps observed. Anything above zero is a defect upstream.
    pub fn gaps_detected(&self) -> u64 {
        self.inner.lock().expect("audit state poisoned").gaps_detected
    }

    /// Event counts keyed by wire type string.
    pub fn counts_by_type(&self) -> BTreeMap<String, u64> {
        self.inner
            .lock()
            .expect("audit state poisoned")
            .counts_by_type
            .clone()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.inner.lock().expect("audit state poisoned").last_sequence
    }
}

/// `EventHandler` half of the trail, owned by the consumer thread.
pub struct AuditHandler {
    inner: Arc<Mutex<TrailState>>,
}

impl AuditHandler {
    fn record(&mut self, event: &Event) {
        let audit_id = Uuid::now_v7();
        let mut state = self.inner.lock().expect("audit state poisoned");

        if let Some(last) = state.last_sequence {
            let expected = last + 1;
            if event.sequence_id != expected {
                state.gaps_detected += 1;
                warn!(
                    expected,
                    got = event.sequence_id,
                    "audit trail observed a sequence gap"
                );
            }
        }
        state.last_sequence = Some(event.sequence_id);
        state.entries += 1;
        *state
            .counts_by_type
            .entry(event.event_type().to_string())
            .or_insert(0) += 1;

        debug!(
            %audit_id,
            sequence_id = event.sequence_id,
            event_type = event.event_type(),
            symbol = event.symbol(),
            "audit entry"
        );
    }
}

impl disruptor::EventHandler<OutputSlot> for AuditHandler {
    fn on_event(&mut self, slot: &OutputSlot, _sequence: i64, _end_of_batch: bool) {
        if let Some(event) = &slot.event {
            self.record(event);
        }
    }

    fn on_shutdown(&mut self) {
        let state = self.inner.lock().expect("audit state poisoned");
        info!(
            entries = state.entries,
            gaps = state.gaps_detected,
            "audit trail stopped"
        );
    }
}
