//! Borrowed worker thread for fork-join updates.
//!
//! A [`WorkerContext`] is one named thread that runs a fixed function over
//! payloads handed to it with [`WorkerContext::start`]; [`WorkerContext::join`]
//! blocks until the payload comes back. Panics inside the function are
//! caught and the payload is returned as [`Joined::Panicked`], so the caller
//! never loses ownership of what it sent.
//!
//! A [`WorkerPool`] owns a fixed set of contexts and lends each one to at
//! most one borrower at a time.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::SystemId;
use super::system::{ExplosionSystem, TickContext};
use crate::config::DebrisConfig;
use crate::error::DebrisError;
use crate::physics::Integrator;
use crate::world::ViewVolume;

enum WorkerCommand<P> {
    Run(P),
    Shutdown,
}

/// A payload handed back by [`WorkerContext::join`].
#[derive(Debug)]
pub enum Joined<P> {
    /// The run function returned normally.
    Finished(P),
    /// The run function panicked; the payload may be half-processed.
    Panicked(P),
}

/// One worker thread plus its command and result channels.
pub struct WorkerContext<P: Send + 'static> {
    name: String,
    tx_cmd: Sender<WorkerCommand<P>>,
    rx_done: Receiver<Joined<P>>,
    thread: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl<P: Send + 'static> WorkerContext<P> {
    /// Spawn a named worker running `run` on every payload. With `core`
    /// set, the thread pins itself to that core id when the machine has it.
    pub fn spawn(name: &str, core: Option<usize>, run: fn(&mut P)) -> Result<Self, DebrisError> {
        let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCommand<P>>();
        let (tx_done, rx_done) = mpsc::channel::<Joined<P>>();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(rx_cmd, tx_done, core, run))?;

        log::info!("Started worker thread '{name}'");
        Ok(Self {
            name: name.to_string(),
            tx_cmd,
            rx_done,
            thread: Some(thread),
            in_flight: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True between a successful `start` and the matching `join`.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Hand `payload` to the worker. On failure the payload comes back with
    /// the reason.
    pub fn start(&mut self, payload: P) -> Result<(), (DebrisError, P)> {
        if self.in_flight {
            return Err((DebrisError::WorkerBusy, payload));
        }
        match self.tx_cmd.send(WorkerCommand::Run(payload)) {
            Ok(()) => {
                self.in_flight = true;
                Ok(())
            }
            Err(mpsc::SendError(command)) => match command {
                WorkerCommand::Run(payload) => Err((DebrisError::WorkerDisconnected, payload)),
                WorkerCommand::Shutdown => unreachable!("start only sends Run"),
            },
        }
    }

    /// Block until the payload of the last `start` comes back.
    pub fn join(&mut self) -> Result<Joined<P>, DebrisError> {
        if !self.in_flight {
            return Err(DebrisError::WorkerIdle);
        }
        self.in_flight = false;
        self.rx_done.recv().map_err(|_| DebrisError::WorkerDisconnected)
    }
}

impl<P: Send + 'static> Drop for WorkerContext<P> {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        log::info!("Stopped worker thread '{}'", self.name);
    }
}

fn worker_loop<P>(
    rx_cmd: Receiver<WorkerCommand<P>>,
    tx_done: Sender<Joined<P>>,
    core: Option<usize>,
    run: fn(&mut P),
) {
    if let Some(index) = core
        && let Some(cores) = core_affinity::get_core_ids()
        && let Some(id) = cores.get(index)
    {
        let _ = core_affinity::set_for_current(*id);
    }

    while let Ok(command) = rx_cmd.recv() {
        match command {
            WorkerCommand::Run(mut payload) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| run(&mut payload)));
                let joined = match outcome {
                    Ok(()) => Joined::Finished(payload),
                    Err(_) => Joined::Panicked(payload),
                };
                if tx_done.send(joined).is_err() {
                    break;
                }
            }
            WorkerCommand::Shutdown => break,
        }
    }
}

/// Fixed set of workers, each lent to at most one borrower at a time.
pub struct WorkerPool<P: Send + 'static> {
    idle: Mutex<Vec<WorkerContext<P>>>,
    size: usize,
}

impl<P: Send + 'static> WorkerPool<P> {
    /// Spawn `count` workers named `{name}-{i}`. Worker `i` is pinned to
    /// core `i + 1`, leaving core 0 to the simulation thread.
    pub fn new(count: usize, name: &str, run: fn(&mut P)) -> Result<Self, DebrisError> {
        let mut idle = Vec::with_capacity(count);
        for i in 0..count {
            idle.push(WorkerContext::spawn(&format!("{name}-{i}"), Some(i + 1), run)?);
        }
        Ok(Self {
            idle: Mutex::new(idle),
            size: count,
        })
    }

    /// Borrow an idle worker, if any is left.
    pub fn take(&self) -> Option<WorkerContext<P>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    /// Return a borrowed worker.
    pub fn give_back(&self, worker: WorkerContext<P>) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(worker);
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of workers the pool was built with.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Half of a tick's systems, shipped to the worker and back.
pub struct UpdateJob {
    pub elapsed: f32,
    /// Index of the first shipped system in the scheduler's active list
    pub start_index: usize,
    /// One past the last shipped system
    pub end_index: usize,
    pub systems: Vec<ExplosionSystem>,
    /// Ids of shipped systems that died this tick
    pub dead: Vec<SystemId>,
    pub integrator: Arc<dyn Integrator>,
    pub view: ViewVolume,
    pub config: Arc<DebrisConfig>,
}

impl UpdateJob {
    /// Worker entry point.
    pub fn run(job: &mut UpdateJob) {
        let ctx = TickContext {
            integrator: job.integrator.as_ref(),
            view: job.view,
            config: job.config.as_ref(),
        };
        update_systems(&mut job.systems, job.elapsed, &ctx, &mut job.dead);
    }
}

/// Update a run of systems, recording the ids of those that died.
///
/// Both the serial path and the worker go through here.
pub fn update_systems(
    systems: &mut [ExplosionSystem],
    elapsed: f32,
    ctx: &TickContext<'_>,
    dead: &mut Vec<SystemId>,
) {
    for system in systems.iter_mut() {
        if system.update(elapsed, ctx) {
            dead.push(system.id());
        }
    }
}

/// Pool type the scheduler borrows from.
pub type UpdatePool = WorkerPool<UpdateJob>;

impl UpdatePool {
    /// Pool of `count` update workers.
    pub fn for_updates(count: usize) -> Result<Self, DebrisError> {
        WorkerPool::new(count, "debris-update", UpdateJob::run)
    }
}
