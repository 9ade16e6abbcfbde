/// Fixed-size recognition worker pool
///
/// Frames are pushed onto a shared job channel; each worker thread takes
/// one frame at a time, runs recognition and publishes the snapshot to the
/// result channel. Workers share nothing else.
use crate::capture::Frame;
use crate::error::PipelineError;
use crate::ocr::{recognize_or_empty, RecognizedSnapshot, Recognizer};
use crate::utils::Timer;
use crossbeam_channel::{unbounded, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct RecognitionPool<I> {
    jobs: Option<Sender<Frame<I>>>,
    workers: Vec<JoinHandle<()>>,
}

impl<I: Send + 'static> RecognitionPool<I> {
    /// Spawn `size` workers (at least one)
    ///
    /// Every worker holds a clone of `results`; the result channel
    /// disconnects once the pool is shut down and all workers have exited.
    pub fn new<R>(
        size: usize,
        recognizer: Arc<R>,
        results: Sender<RecognizedSnapshot>,
    ) -> Result<Self, PipelineError>
    where
        R: Recognizer<I> + ?Sized + 'static,
    {
        let (job_tx, job_rx) = unbounded::<Frame<I>>();
        let mut workers = Vec::with_capacity(size.max(1));

        for index in 0..size.max(1) {
            let job_rx = job_rx.clone();
            let results = results.clone();
            let recognizer = Arc::clone(&recognizer);
            let name = format!("ocr-worker-{index}");

            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    tracing::debug!("Recognition worker {index} started");
                    while let Ok(frame) = job_rx.recv() {
                        let timer = Timer::start();
                        let snapshot = recognize_or_empty(recognizer.as_ref(), &frame);
                        tracing::trace!(
                            "Frame #{} recognized in {:.1}ms ({} bytes)",
                            snapshot.seq_id,
                            timer.elapsed_ms(),
                            snapshot.text.len()
                        );
                        if results.send(snapshot).is_err() {
                            tracing::warn!("Result queue closed, worker {index} exiting");
                            break;
                        }
                    }
                    tracing::debug!("Recognition worker {index} stopped");
                })
                .map_err(|source| PipelineError::ThreadSpawnFailed { name, source })?;
            workers.push(handle);
        }

        Ok(Self {
            jobs: Some(job_tx),
            workers,
        })
    }

    /// Queue a frame for recognition
    pub fn submit(&self, frame: Frame<I>) {
        if let Some(jobs) = &self.jobs {
            if jobs.send(frame).is_err() {
                tracing::warn!("Recognition pool is gone, frame dropped");
            }
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Frames queued but not yet picked up by a worker
    pub fn backlog(&self) -> usize {
        self.jobs.as_ref().map_or(0, |jobs| jobs.len())
    }

    /// Stop accepting frames and wait for in-flight recognitions to finish
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        // Workers exit once the job channel is empty and disconnected
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Recognition worker panicked");
            }
        }
    }
}

impl<I> Drop for RecognitionPool<I> {
    fn drop(&mut self) {
        self.jobs.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
