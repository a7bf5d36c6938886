//! Background recomputation scheduling.
//!
//! One worker thread per dispatcher, parked on a level-triggered flag.
//! Any subscribed change re-arms the flag; the worker debounces, clears
//! it, and runs a full collect-and-process pass over a snapshot of the
//! machine and document state. A trigger raised mid-pass leaves the flag
//! set, guaranteeing exactly one more pass after the current one. Errors
//! and panics inside a pass are logged and never terminate the worker.

use crate::collector::Collector;
use crate::document::DocumentList;
use crate::error::ProcessError;
use crate::processor::Processor;
use crate::result::{Move, ProcessResult};
use parking_lot::{Condvar, Mutex, RwLock};
use routekit_core::{EventBus, EventFilter, Loop, SubscriptionId};
use routekit_settings::Machine;
use std::panic;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::error;

/// Quiet period after a trigger before a pass starts, coalescing bursts
/// of rapid edits into one pass.
const DEBOUNCE: Duration = Duration::from_millis(10);

/// Output of one processing pass.
#[derive(Debug, Clone, Default)]
pub struct ProcessedData {
    /// The merged move list of all jobs, in job order.
    pub moves: Vec<Move>,
    /// Problem-region polygons for UI display.
    pub problem_regions: Vec<Loop>,
}

/// Runs one synchronous collect-and-process pass.
pub fn process_once(
    machine: &Machine,
    documents: &DocumentList,
) -> Result<ProcessedData, ProcessError> {
    let collector = Collector::new(documents, machine)?;
    let mut result = ProcessResult::new();
    for job in collector.into_jobs() {
        Processor::new(job).process(&mut result);
    }
    let (moves, problem_regions) = result.into_parts();
    Ok(ProcessedData {
        moves,
        problem_regions,
    })
}

#[derive(Default)]
struct TriggerState {
    armed: bool,
    shutdown: bool,
}

#[derive(Default)]
struct Trigger {
    state: Mutex<TriggerState>,
    condvar: Condvar,
}

impl Trigger {
    fn arm(&self) {
        self.state.lock().armed = true;
        self.condvar.notify_all();
    }

    fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.condvar.notify_all();
    }

    /// Blocks until armed or shut down. Returns false on shutdown.
    fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while !state.armed && !state.shutdown {
            self.condvar.wait(&mut state);
        }
        !state.shutdown
    }

    fn clear(&self) {
        self.state.lock().armed = false;
    }
}

type ResultCallback = Box<dyn Fn(ProcessedData) + Send + Sync>;

/// Drives reprocessing for one editing session.
///
/// Subscribes to the session's event bus on construction; the caller is
/// responsible for attaching the same bus to the machine and document
/// list so their mutations re-arm the trigger.
pub struct Dispatcher {
    trigger: Arc<Trigger>,
    callback: Arc<Mutex<Option<ResultCallback>>>,
    bus: Arc<EventBus>,
    subscription: SubscriptionId,
    worker: Option<thread::JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(
        machine: Arc<RwLock<Machine>>,
        documents: Arc<RwLock<DocumentList>>,
        bus: Arc<EventBus>,
    ) -> Self {
        let trigger = Arc::new(Trigger::default());
        let callback: Arc<Mutex<Option<ResultCallback>>> = Arc::new(Mutex::new(None));

        let subscription = {
            let trigger = trigger.clone();
            bus.subscribe(EventFilter::All, move |_| trigger.arm())
        };

        let worker = {
            let trigger = trigger.clone();
            let callback = callback.clone();
            thread::spawn(move || worker_loop(trigger, machine, documents, callback))
        };

        Self {
            trigger,
            callback,
            bus,
            subscription,
            worker: Some(worker),
        }
    }

    /// Registers the callback receiving each pass's merged output.
    pub fn on_result<F>(&self, handler: F)
    where
        F: Fn(ProcessedData) + Send + Sync + 'static,
    {
        *self.callback.lock() = Some(Box::new(handler));
    }

    /// Manually requests a reprocessing pass.
    pub fn trigger(&self) {
        self.trigger.arm();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscription);
        self.trigger.shutdown();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    trigger: Arc<Trigger>,
    machine: Arc<RwLock<Machine>>,
    documents: Arc<RwLock<DocumentList>>,
    callback: Arc<Mutex<Option<ResultCallback>>>,
) {
    while trigger.wait() {
        thread::sleep(DEBOUNCE);
        trigger.clear();

        // Snapshot under short-lived read locks: a running pass must
        // never block callers mutating the model.
        let machine_snapshot = machine.read().clone();
        let document_snapshot = documents.read().clone();

        let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            process_once(&machine_snapshot, &document_snapshot)
        }));
        match outcome {
            Ok(Ok(data)) => {
                if let Some(handler) = callback.lock().as_ref() {
                    handler(data);
                }
            }
            Ok(Err(err)) => error!("Processing pass failed: {err}"),
            Err(_) => error!("Panic during processing pass"),
        }
    }
}
