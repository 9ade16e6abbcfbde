/// Capture → recognition → ordered processing pipeline
///
/// ## Threads
///
/// ```text
/// capture ──Frame──▶ ocr-worker-0..N ──RecognizedSnapshot──▶ consumer
///  (cadence,          (parallel, any                         (reorder, dedup,
///   change filter)     completion order)                      parse, aggregate)
/// ```
///
/// The capture thread owns the worker pool. When its loop ends (stop flag or
/// exhausted source) it shuts the pool down, waiting for in-flight frames.
/// Workers dropping their result senders disconnects the channel, which is
/// the consumer's signal that everything has been delivered.
///
/// # Submodules
/// - `cadence`: paced capture loop with the change filter
/// - `workers`: recognition thread pool
/// - `reorder`: sequence-id reorder buffer
/// - `consumer`: ordered delivery into combat log processing and stats

pub mod cadence;
pub mod consumer;
pub mod reorder;
pub mod workers;

pub use cadence::{frame_interval, run_capture_loop, CaptureReport};
pub use consumer::{
    run_consumer, ConsumerOptions, ConsumerReport, SnapshotProcessor, SnapshotSink,
};
pub use reorder::ReorderBuffer;
pub use workers::RecognitionPool;

use crate::capture::FrameSource;
use crate::combat_log::{
    CombatLogOptions, CombatLogProcessor, DamageParser, LogDeduplicator, ANCHOR_TOLERANCE,
    LINE_TOLERANCE,
};
use crate::error::PipelineError;
use crate::ocr::Recognizer;
use crate::state::{ProcessState, ProcessStateMachine};
use crate::stats::{DamageAggregator, StatsHandle, DEFAULT_HISTORY_POINTS, DEFAULT_WINDOW_MS};
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Runtime settings of a [`Pipeline`]
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub capture_fps: u32,
    pub worker_threads: usize,
    /// Frames at least this similar to the previous capture are skipped
    pub similarity_threshold: f32,
    pub anchor_tolerance: usize,
    pub line_tolerance: usize,
    pub window_ms: u64,
    pub poll_interval: Duration,
    pub queue_warn_threshold: usize,
    pub history_points: usize,
    pub combat_log: CombatLogOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_fps: 10,
            worker_threads: 4,
            similarity_threshold: 0.9,
            anchor_tolerance: ANCHOR_TOLERANCE,
            line_tolerance: LINE_TOLERANCE,
            window_ms: DEFAULT_WINDOW_MS,
            poll_interval: Duration::from_secs(10),
            queue_warn_threshold: 100,
            history_points: DEFAULT_HISTORY_POINTS,
            combat_log: CombatLogOptions::default(),
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub dispatched: u64,
    pub skipped: u64,
    pub delivered: u64,
    /// Times the result backlog was found above `queue_warn_threshold`
    pub backlog_warnings: u64,
    pub running_for: Duration,
}

struct RunningThreads {
    capture: JoinHandle<CaptureReport>,
    consumer: JoinHandle<ConsumerReport>,
}

pub struct Pipeline {
    config: PipelineConfig,
    state: ProcessStateMachine,
    stop_flag: Arc<AtomicBool>,
    stats: StatsHandle,
    threads: Option<RunningThreads>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let stats = StatsHandle::with_history(config.history_points);
        Self {
            config,
            state: ProcessStateMachine::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            stats,
            threads: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> ProcessState {
        self.state.state()
    }

    /// Pollable statistics, valid across runs
    pub fn stats(&self) -> StatsHandle {
        self.stats.clone()
    }

    /// Spawn the capture, worker and consumer threads
    pub fn start<S, R>(&mut self, source: S, recognizer: Arc<R>) -> Result<(), PipelineError>
    where
        S: FrameSource + 'static,
        S::Image: Clone,
        R: Recognizer<S::Image> + ?Sized + 'static,
    {
        self.state.start()?;
        self.stop_flag.store(false, Ordering::Release);

        match self.spawn_threads(source, recognizer) {
            Ok(threads) => {
                self.threads = Some(threads);
                self.state.mark_running()?;
                tracing::info!(
                    "Pipeline started: {} fps, {} workers",
                    self.config.capture_fps,
                    self.config.worker_threads
                );
                Ok(())
            }
            Err(err) => {
                self.state.force_stop();
                Err(err)
            }
        }
    }

    fn spawn_threads<S, R>(
        &self,
        mut source: S,
        recognizer: Arc<R>,
    ) -> Result<RunningThreads, PipelineError>
    where
        S: FrameSource + 'static,
        S::Image: Clone,
        R: Recognizer<S::Image> + ?Sized + 'static,
    {
        let config = &self.config;
        let (result_tx, result_rx) = unbounded();
        let pool = RecognitionPool::new(config.worker_threads, recognizer, result_tx)?;

        let mut processor = SnapshotProcessor::new(
            CombatLogProcessor::new(
                LogDeduplicator::with_tolerances(config.anchor_tolerance, config.line_tolerance),
                DamageParser::new(),
                config.combat_log.clone(),
            ),
            DamageAggregator::with_window(config.window_ms),
            self.stats.clone(),
        );
        let options = ConsumerOptions {
            poll_interval: config.poll_interval,
            queue_warn_threshold: config.queue_warn_threshold,
        };

        let consumer = thread::Builder::new()
            .name("consumer".to_string())
            .spawn(move || run_consumer(&result_rx, &mut processor, options))
            .map_err(|source| PipelineError::ThreadSpawnFailed {
                name: "consumer".to_string(),
                source,
            })?;
        // A failed spawn from here on drops the pool, which disconnects the
        // result channel and lets the consumer exit.

        let interval = frame_interval(config.capture_fps);
        let threshold = config.similarity_threshold;
        let stop_flag = Arc::clone(&self.stop_flag);
        let capture = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                let report = run_capture_loop(&mut source, &pool, interval, threshold, &stop_flag);
                pool.shutdown();
                report
            });

        match capture {
            Ok(capture) => Ok(RunningThreads { capture, consumer }),
            Err(source) => {
                let _ = consumer.join();
                Err(PipelineError::ThreadSpawnFailed {
                    name: "capture".to_string(),
                    source,
                })
            }
        }
    }

    /// True once the capture loop ended on its own (finite source)
    pub fn is_finished(&self) -> bool {
        self.threads
            .as_ref()
            .map_or(true, |threads| threads.capture.is_finished())
    }

    /// Request a cooperative stop and wait for everything in flight
    pub fn stop(&mut self) -> Result<PipelineSummary, PipelineError> {
        self.finish(true)
    }

    /// Wait for the source to run dry, then shut down
    pub fn join(&mut self) -> Result<PipelineSummary, PipelineError> {
        self.finish(false)
    }

    fn finish(&mut self, request_stop: bool) -> Result<PipelineSummary, PipelineError> {
        let running_for = self.state.state().running_duration().unwrap_or_default();
        self.state.stop()?;
        if request_stop {
            tracing::info!("Stopping pipeline");
            self.stop_flag.store(true, Ordering::Release);
        }

        let result = match self.threads.take() {
            Some(threads) => Self::wait(threads),
            None => Ok((CaptureReport::default(), ConsumerReport::default())),
        };
        let (capture, consumer) = match result {
            Ok(reports) => {
                self.state.mark_stopped()?;
                reports
            }
            Err(err) => {
                self.state.force_stop();
                return Err(err);
            }
        };

        let summary = PipelineSummary {
            dispatched: capture.dispatched,
            skipped: capture.skipped,
            delivered: consumer.delivered,
            backlog_warnings: consumer.backlog_warnings,
            running_for,
        };
        tracing::info!(
            "Pipeline stopped: {} frames dispatched, {} delivered, {} unchanged",
            summary.dispatched,
            summary.delivered,
            summary.skipped
        );
        Ok(summary)
    }

    fn wait(threads: RunningThreads) -> Result<(CaptureReport, ConsumerReport), PipelineError> {
        let capture = threads.capture.join();
        // The consumer finishes once the capture thread has shut the pool down
        let consumer = threads
            .consumer
            .join()
            .map_err(|_| PipelineError::ThreadPanicked("consumer"))?;
        let capture = capture.map_err(|_| PipelineError::ThreadPanicked("capture"))?;
        Ok((capture, consumer))
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.state.state().is_running() {
            if let Err(err) = self.stop() {
                tracing::warn!("Pipeline shutdown on drop failed: {err}");
            }
        }
    }
}
