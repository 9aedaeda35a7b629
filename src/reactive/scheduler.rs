//! Delivery contexts
//!
//! Everything observers see is published from a [`DeliveryContext`]. A context
//! runs the jobs posted to it one at a time and in posting order, so an
//! observer never sees two publications at once no matter which executor
//! thread produced the values.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::StreamExt;
use tokio::sync::mpsc;

use super::subject::{Observer, Subscription};
use crate::prelude::Arc;
use crate::runtime::{AsyncHandle, AsyncSpawner, SpawnerExt};

/// A unit of delivery work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single-threaded, ordered execution of posted jobs
pub trait DeliveryContext: Send + Sync + 'static {
    fn post(&self, job: Job);
}

fn run_job(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        log::error!("delivery job panicked; continuing with the next job");
    }
}

/// Delivers on a dedicated async task
///
/// Jobs are queued on an unbounded channel and drained by one task, which
/// stops once every clone of the context is gone and the queue is empty.
#[derive(Clone)]
pub struct SerialContext {
    tx: mpsc::UnboundedSender<Job>,
}

impl SerialContext {
    pub fn new(spawner: &dyn AsyncSpawner) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        // Dropping the handle detaches the task; it ends with the channel
        let _ = spawner.spawn(async move {
            while let Some(job) = rx.recv().await {
                run_job(job);
            }
            log::debug!("serial delivery context stopped");
        });
        Self { tx }
    }
}

impl DeliveryContext for SerialContext {
    fn post(&self, job: Job) {
        if self.tx.send(job).is_err() {
            log::warn!("serial delivery context is gone; dropping job");
        }
    }
}

/// Delivers on whichever thread calls [`PolledContext::run_pending`]
///
/// Meant for a UI thread that drains the queue once per frame. Only one
/// thread may drain a given context, otherwise ordering is lost.
#[derive(Clone)]
pub struct PolledContext {
    tx: Sender<Job>,
    rx: Receiver<Job>,
}

impl PolledContext {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Run every queued job on the calling thread. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(job) = self.rx.try_recv() {
            run_job(job);
            count += 1;
        }
        count
    }

    /// Number of jobs waiting for the next `run_pending`
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for PolledContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryContext for PolledContext {
    fn post(&self, job: Job) {
        // Cannot fail: this context holds its own receiver
        let _ = self.tx.send(job);
    }
}

/// Runs jobs inline on the posting thread
///
/// Only serial when every producer runs on the same thread, as in a
/// current-thread runtime or a test.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateContext;

impl DeliveryContext for ImmediateContext {
    fn post(&self, job: Job) {
        run_job(job);
    }
}

/// Re-publish every event of `source` into `target` from `context`
///
/// Terminal events are forwarded too: an error or completion of `source`
/// terminates `target`.
pub fn forward_on<T, O>(
    source: Subscription<T>,
    context: Arc<dyn DeliveryContext>,
    target: O,
    spawner: &dyn AsyncSpawner,
) -> Box<dyn AsyncHandle>
where
    T: Send + 'static,
    O: Observer<T> + Clone + 'static,
{
    spawner.spawn(async move {
        let mut source = source;
        while let Some(event) = source.next().await {
            let target = target.clone();
            match event {
                Ok(value) => context.post(Box::new(move || target.on_next(value))),
                Err(error) => {
                    context.post(Box::new(move || target.on_error(error)));
                    return;
                }
            }
        }
        context.post(Box::new(move || target.on_complete()));
    })
}
