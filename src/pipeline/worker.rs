//! Single-flight detection worker.
//!
//! Frames are produced faster than detection can run, and stale frames are
//! worthless for live guidance. The worker therefore accepts a frame only
//! while no detection is in flight; anything submitted in the meantime is
//! dropped immediately instead of queued. Memory and latency stay bounded at
//! one frame.

use crate::detection::Detection;
use crate::image::OwnedFrame;
use crate::pipeline::DetectionPipeline;
use crate::trace::{trace_event, trace_warn};
use crate::util::SmartSightError;
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A frame submitted for detection.
#[derive(Clone, Debug)]
pub struct FrameJob {
    /// Captured pixels at source resolution.
    pub frame: OwnedFrame,
    /// Width of the surface the caller renders onto.
    pub display_width: usize,
}

/// Result of one processed frame, handed to the caller's sink.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub source_width: usize,
    pub source_height: usize,
    pub display_width: usize,
    /// Empty when the frame failed.
    pub detections: Vec<Detection>,
    /// Why the frame produced no detections, if it failed.
    pub error: Option<SmartSightError>,
}

/// Outcome of [`DetectionWorker::submit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The worker took the frame.
    Accepted,
    /// A detection was in flight; the frame was discarded.
    Dropped,
    /// The worker thread has exited; the frame was discarded.
    Stopped,
}

/// Counters shared between the producer and the worker thread.
#[derive(Debug, Default)]
pub struct WorkerStats {
    submitted: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

impl WorkerStats {
    /// Frames offered through `submit`, accepted or not.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Frames discarded because a detection was in flight.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames whose report reached the sink.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Processed frames that carried an error.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Owns the detection thread and its single-slot queue.
pub struct DetectionWorker {
    tx: Option<Sender<FrameJob>>,
    busy: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    /// Spawns the worker thread.
    ///
    /// `sink` is called on the worker thread once per accepted frame, after
    /// detection completes. A new frame is accepted only after `sink`
    /// returns.
    pub fn spawn<S>(mut pipeline: DetectionPipeline, mut sink: S) -> std::io::Result<Self>
    where
        S: FnMut(FrameReport) + Send + 'static,
    {
        let (tx, rx) = bounded::<FrameJob>(1);
        let busy = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(WorkerStats::default());

        let worker_busy = Arc::clone(&busy);
        let worker_stats = Arc::clone(&stats);
        let handle = std::thread::Builder::new()
            .name("smartsight-detect".to_owned())
            .spawn(move || {
                for job in rx.iter() {
                    let _idle = BusyGuard(&worker_busy);
                    let view = job.frame.view();
                    let outcome = catch_unwind(AssertUnwindSafe(|| pipeline.try_detect(view)))
                        .unwrap_or_else(|payload| {
                            Err(SmartSightError::ModelUnavailable {
                                reason: format!("inference panicked: {}", panic_message(&*payload)),
                            })
                        });
                    let (detections, error) = match outcome {
                        Ok(detections) => (detections, None),
                        Err(err) => {
                            worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                            (Vec::new(), Some(err))
                        }
                    };
                    let report = FrameReport {
                        source_width: job.frame.width(),
                        source_height: job.frame.height(),
                        display_width: job.display_width,
                        detections,
                        error,
                    };
                    drop(job);
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink(report))) {
                        trace_warn!("sink_panicked", reason = panic_message(&*payload).as_str());
                    }
                    worker_stats.processed.fetch_add(1, Ordering::Relaxed);
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            busy,
            stats,
            handle: Some(handle),
        })
    }

    /// Offers a frame to the worker, dropping it if a detection is running.
    pub fn submit(&self, job: FrameJob) -> Submission {
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if !self.is_running() {
            return Submission::Stopped;
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            return self.drop_frame();
        }
        let Some(tx) = self.tx.as_ref() else {
            self.busy.store(false, Ordering::Release);
            return Submission::Stopped;
        };
        match tx.try_send(job) {
            Ok(()) => Submission::Accepted,
            Err(TrySendError::Full(_)) => {
                self.busy.store(false, Ordering::Release);
                self.drop_frame()
            }
            Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::Release);
                Submission::Stopped
            }
        }
    }

    fn drop_frame(&self) -> Submission {
        let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        trace_event!("frame_dropped", dropped = dropped);
        Submission::Dropped
    }

    /// Returns `true` while a detection is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Returns `false` once the worker thread has exited.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Shared counters, updated live by the worker thread.
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Closes the queue and waits for any in-flight frame to finish.
    pub fn shutdown(mut self) -> Result<(), SmartSightError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), SmartSightError> {
        self.tx.take();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| SmartSightError::WorkerStopped),
            None => Ok(()),
        }
    }
}

/// Clears the busy flag when a frame is done, including on unwind.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
