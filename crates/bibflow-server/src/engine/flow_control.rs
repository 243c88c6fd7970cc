//! Backpressure over raw-record ingestion
//!
//! One process-wide in-flight counter, incremented by the size of each
//! received chunk and decremented once per record-processed event. When the
//! counter climbs past `max_simultaneous_records`, every registered
//! raw-chunk consumer that is still demanding records is paused; when it
//! falls back to `records_threshold`, paused consumers are resumed.
//! Pause and resume are idempotent, so precision of the counter under
//! concurrent trackers is not load-bearing.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// A raw-chunk-read consumer that can be cooperatively paused and resumed
///
/// `demand` reports how many records the consumer is currently willing to
/// take; a paused consumer reports zero.
pub trait PausableConsumer: Send + Sync {
    fn consumer_id(&self) -> &str;
    fn demand(&self) -> usize;
    fn pause(&self);
    fn resume(&self);
}

/// Flow-control thresholds, loaded from [`crate::config::FlowControlConfig`]
#[derive(Debug, Clone, Copy)]
pub struct FlowControlSettings {
    pub enabled: bool,
    pub max_simultaneous_records: i64,
    pub records_threshold: i64,
}

impl Default for FlowControlSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_simultaneous_records: 20_000,
            records_threshold: 10_000,
        }
    }
}

/// Process-wide flow control shared by all chunk handlers of a node
pub struct RawRecordsFlowControl {
    settings: FlowControlSettings,
    in_flight: AtomicI64,
    consumers: Mutex<Vec<Arc<dyn PausableConsumer>>>,
}

impl RawRecordsFlowControl {
    pub fn new(settings: FlowControlSettings) -> Self {
        Self {
            settings,
            in_flight: AtomicI64::new(0),
            consumers: Mutex::new(Vec::new()),
        }
    }

    /// Register a consumer for pause/resume management
    pub fn register(&self, consumer: Arc<dyn PausableConsumer>) {
        if !self.settings.enabled {
            return;
        }
        let mut consumers = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        consumers.push(consumer);
    }

    /// Current in-flight record count
    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Account for a newly received chunk of `chunk_size` records
    pub fn track_chunk_received(&self, chunk_size: i64) {
        if !self.settings.enabled {
            return;
        }
        let current = self.in_flight.fetch_add(chunk_size, Ordering::SeqCst) + chunk_size;
        tracing::debug!(in_flight = current, chunk_size, "Tracked chunk receipt");
        if current > self.settings.max_simultaneous_records {
            self.pause_demanding_consumers(current);
        }
    }

    /// Account for one record that finished processing (success or failure)
    pub fn track_record_complete(&self) {
        if !self.settings.enabled {
            return;
        }
        let mut current = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if current < 0 {
            // A completion event can outrun its chunk-received tracking
            // during rebalancing; clamp rather than go negative.
            tracing::debug!(in_flight = current, "In-flight counter underflow, clamping to 0");
            self.in_flight
                .fetch_max(0, Ordering::SeqCst);
            current = 0;
        }
        if current <= self.settings.records_threshold {
            self.resume_paused_consumers(current);
        }
    }

    fn pause_demanding_consumers(&self, in_flight: i64) {
        let consumers = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        for consumer in consumers.iter() {
            // Already-paused consumers report zero demand; leave them alone.
            if consumer.demand() > 0 {
                tracing::info!(
                    consumer_id = consumer.consumer_id(),
                    in_flight,
                    max = self.settings.max_simultaneous_records,
                    "Pausing raw-records consumer"
                );
                consumer.pause();
            }
        }
    }

    fn resume_paused_consumers(&self, in_flight: i64) {
        let consumers = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        for consumer in consumers.iter() {
            if consumer.demand() == 0 {
                tracing::info!(
                    consumer_id = consumer.consumer_id(),
                    in_flight,
                    threshold = self.settings.records_threshold,
                    "Resuming raw-records consumer"
                );
                consumer.resume();
            }
        }
    }
}
