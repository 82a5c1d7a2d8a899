use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use grotto_core::{channel, EventReceiver, EventSender, JobSystem};
use tracing::debug;

use super::{CpuLighting, LightRegion};

pub type LightTaskId = u64;

/// A region resolved off the main thread, ready for [`LightRegion::apply`].
#[derive(Debug)]
pub struct CompletedLight {
    pub id: LightTaskId,
    pub region: LightRegion,
}

enum LightTaskEvent {
    Finished(CompletedLight),
    Cancelled(LightTaskId),
}

/// Background light recomputation on the job pool. Results come back over
/// an event channel and are only visible once polled.
pub struct LightTaskQueue {
    jobs: Arc<JobSystem>,
    lighting: CpuLighting,
    completed_tx: EventSender<LightTaskEvent>,
    completed_rx: EventReceiver<LightTaskEvent>,
    generation: Arc<AtomicU64>,
    next_id: LightTaskId,
    in_flight: usize,
}

impl LightTaskQueue {
    pub fn new(jobs: Arc<JobSystem>) -> Self {
        let (completed_tx, completed_rx) = channel();
        Self {
            jobs,
            lighting: CpuLighting::new(),
            completed_tx,
            completed_rx,
            generation: Arc::new(AtomicU64::new(0)),
            next_id: 0,
            in_flight: 0,
        }
    }

    pub fn submit(&mut self, mut region: LightRegion) -> LightTaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.in_flight += 1;
        debug!("Submitted light task {id} for {:?}", region.inner());

        let lighting = self.lighting.clone();
        let generation = Arc::clone(&self.generation);
        let submitted_in = generation.load(Ordering::Acquire);
        let completed_tx = self.completed_tx.clone();
        self.jobs.spawn(move || {
            let event = if generation.load(Ordering::Acquire) != submitted_in {
                LightTaskEvent::Cancelled(id)
            } else {
                lighting.resolve(&mut region);
                LightTaskEvent::Finished(CompletedLight { id, region })
            };
            let _ = completed_tx.send(event);
        });
        id
    }

    pub fn pending(&self) -> usize {
        self.in_flight
    }

    /// Tasks submitted so far skip their work if they have not started yet.
    /// Later submissions are unaffected.
    pub fn cancel_pending(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Completed regions, without blocking.
    pub fn poll(&mut self) -> Vec<CompletedLight> {
        let events = self.completed_rx.drain();
        self.collect(events)
    }

    /// Blocks until every submitted task has reported back.
    pub fn wait(&mut self) -> Vec<CompletedLight> {
        let mut events = Vec::new();
        while self.in_flight > events.len() {
            match self.completed_rx.recv() {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        self.collect(events)
    }

    fn collect(&mut self, events: Vec<LightTaskEvent>) -> Vec<CompletedLight> {
        self.in_flight = self.in_flight.saturating_sub(events.len());
        events
            .into_iter()
            .filter_map(|event| match event {
                LightTaskEvent::Finished(done) => {
                    debug!("Light task {} finished", done.id);
                    Some(done)
                }
                LightTaskEvent::Cancelled(id) => {
                    debug!("Light task {id} cancelled");
                    None
                }
            })
            .collect()
    }

    /// Cancels what has not started and waits for the rest.
    pub fn shutdown(&mut self) {
        if self.in_flight == 0 {
            return;
        }
        self.cancel_pending();
        let finished = self.wait();
        debug!("Light queue shut down, {} results discarded", finished.len());
    }
}
