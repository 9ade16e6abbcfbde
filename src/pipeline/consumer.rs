/// Single consumer of recognition results
///
/// Drains the result channel, restores dispatch order and delivers each
/// snapshot to a [`SnapshotSink`]. The sink state (dedup memory, aggregate)
/// lives on this thread only, so it needs no locking.
use super::reorder::ReorderBuffer;
use crate::combat_log::CombatLogProcessor;
use crate::ocr::RecognizedSnapshot;
use crate::stats::{DamageAggregator, StatsHandle, StatsSnapshot};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Receives snapshots in strict sequence order
pub trait SnapshotSink {
    fn deliver(&mut self, snapshot: RecognizedSnapshot);
}

impl<F: FnMut(RecognizedSnapshot)> SnapshotSink for F {
    fn deliver(&mut self, snapshot: RecognizedSnapshot) {
        self(snapshot)
    }
}

/// Combat log processing, aggregation and stats publishing for one snapshot
pub struct SnapshotProcessor {
    combat_log: CombatLogProcessor,
    aggregator: DamageAggregator,
    stats: StatsHandle,
}

impl SnapshotProcessor {
    pub fn new(
        combat_log: CombatLogProcessor,
        aggregator: DamageAggregator,
        stats: StatsHandle,
    ) -> Self {
        Self {
            combat_log,
            aggregator,
            stats,
        }
    }

    pub fn aggregator(&self) -> &DamageAggregator {
        &self.aggregator
    }
}

impl SnapshotSink for SnapshotProcessor {
    fn deliver(&mut self, snapshot: RecognizedSnapshot) {
        let events = self.combat_log.process(&snapshot.text, snapshot.timestamp);
        self.aggregator.ingest(events, snapshot.timestamp);
        self.stats.publish(StatsSnapshot::from_aggregator(&self.aggregator));
    }
}

/// Consumer loop settings
#[derive(Debug, Clone, Copy)]
pub struct ConsumerOptions {
    /// Liveness timeout of the blocking receive
    pub poll_interval: Duration,
    /// Backlog size above which a warning is logged
    pub queue_warn_threshold: usize,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            queue_warn_threshold: 100,
        }
    }
}

/// What the consumer loop saw before the result channel closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub delivered: u64,
    /// Receives after which the backlog exceeded the warning threshold
    pub backlog_warnings: u64,
    pub peak_backlog: usize,
}

/// Deliver results in order until every producer has hung up
///
/// The channel disconnects only after all workers exit, and workers exit only
/// after the job queue is drained, so nothing in flight is lost.
pub fn run_consumer<S: SnapshotSink + ?Sized>(
    results: &Receiver<RecognizedSnapshot>,
    sink: &mut S,
    options: ConsumerOptions,
) -> ConsumerReport {
    let mut buffer = ReorderBuffer::new();
    let mut report = ConsumerReport::default();

    loop {
        match results.recv_timeout(options.poll_interval) {
            Ok(snapshot) => {
                let backlog = results.len();
                report.peak_backlog = report.peak_backlog.max(backlog);
                if backlog > options.queue_warn_threshold {
                    report.backlog_warnings += 1;
                    tracing::warn!(
                        "Recognition results are piling up ({backlog} queued), \
                         workers cannot keep up"
                    );
                }

                buffer.push(snapshot);
                while let Some(ready) = buffer.pop_ready() {
                    sink.deliver(ready);
                    report.delivered += 1;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!(
                    "No recognition result within {:?}, waiting for #{}",
                    options.poll_interval,
                    buffer.next_seq()
                );
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if buffer.pending() > 0 {
        tracing::warn!(
            "{} snapshots undelivered, #{} never arrived",
            buffer.pending(),
            buffer.next_seq()
        );
    }
    report
}
