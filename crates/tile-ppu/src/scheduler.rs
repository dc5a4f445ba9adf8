//! Frame scheduler: a fixed pool of long-lived worker threads.
//!
//! One mutex guards the task queue, the active-worker count and the phase.
//! Two condition variables hang off it: `work_available` wakes parked
//! workers, and `frame_done` wakes the thread waiting in
//! [`WorkerPool::run_frame`].
//!
//! ## Phases
//! - `Idle`: queue empty, no worker running a task.
//! - `Dispatched`: tasks queued, workers draining them.
//! - `Draining`: queue empty, at least one worker still running.
//!
//! `run_frame` moves Idle → Dispatched. The worker that takes the last
//! queued task moves Dispatched → Draining. The worker that finishes when
//! the queue is empty and nobody else is active moves the phase back to Idle
//! and signals `frame_done`. That barrier condition is
//! [`State::is_quiescent`].

#![allow(unsafe_code)]

use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// A unit of frame work. May borrow from the caller of `run_frame`.
pub type Task<'a> = Box<dyn FnOnce() + Send + 'a>;

type QueuedTask = Box<dyn FnOnce() + Send + 'static>;

/// Where the pool is in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dispatched,
    Draining,
}

struct State {
    phase: Phase,
    queue: VecDeque<QueuedTask>,
    active: usize,
    panic: Option<Box<dyn Any + Send>>,
    shutdown: bool,
    frames: u64,
}

impl State {
    /// Queue empty and no worker mid-task.
    fn is_quiescent(&self) -> bool {
        self.queue.is_empty() && self.active == 0
    }
}

struct Shared {
    state: Mutex<State>,
    work_available: Condvar,
    frame_done: Condvar,
}

impl Shared {
    // Tasks run outside the lock and their panics are caught, so a poisoned
    // lock still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-size worker pool with a per-frame barrier.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one).
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let mut pool = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    queue: VecDeque::new(),
                    active: 0,
                    panic: None,
                    shutdown: false,
                    frames: 0,
                }),
                work_available: Condvar::new(),
                frame_done: Condvar::new(),
            }),
            workers: Vec::with_capacity(size),
        };

        for i in 0..size {
            let shared = Arc::clone(&pool.shared);
            // On failure `pool` drops here and joins the workers already spawned.
            let handle = thread::Builder::new()
                .name(format!("tile-ppu-worker-{i}"))
                .spawn(move || worker_loop(&shared))?;
            pool.workers.push(handle);
        }

        log::debug!("spawned {size} render workers");
        Ok(pool)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// Frames completed since the pool was created.
    #[must_use]
    pub fn frames_completed(&self) -> u64 {
        self.shared.lock().frames
    }

    /// Run every task on the pool and block until all have finished.
    ///
    /// Waits without a timeout and cannot be cancelled. If a task panics the
    /// rest of the frame still drains, then the first panic is re-raised here.
    pub fn run_frame<'a>(&self, tasks: Vec<Task<'a>>) {
        if tasks.is_empty() {
            return;
        }

        let mut state = self.shared.lock();
        debug_assert_eq!(state.phase, Phase::Idle, "run_frame re-entered");
        for task in tasks {
            // SAFETY: only the lifetime is erased. This function does not
            // return until the queue is empty and every worker has finished
            // (and dropped) its task, so nothing borrowed for 'a is used
            // after 'a ends.
            let task: QueuedTask = unsafe { std::mem::transmute::<Task<'a>, QueuedTask>(task) };
            state.queue.push_back(task);
        }
        state.phase = Phase::Dispatched;
        self.shared.work_available.notify_all();

        while state.phase != Phase::Idle {
            state = self
                .shared
                .frame_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        debug_assert!(state.is_quiescent());
        state.frames += 1;
        let panic = state.panic.take();
        drop(state);

        if let Some(payload) = panic {
            panic::resume_unwind(payload);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.work_available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        log::debug!("render workers shut down");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

fn worker_loop(shared: &Shared) {
    let mut state = shared.lock();
    loop {
        if let Some(task) = state.queue.pop_front() {
            state.active += 1;
            if state.queue.is_empty() {
                state.phase = Phase::Draining;
            }
            drop(state);

            let result = panic::catch_unwind(AssertUnwindSafe(task));

            state = shared.lock();
            state.active -= 1;
            if let Err(payload) = result {
                state.panic.get_or_insert(payload);
            }
            if state.is_quiescent() && state.phase != Phase::Idle {
                state.phase = Phase::Idle;
                shared.frame_done.notify_all();
            }
            continue;
        }

        if state.shutdown {
            break;
        }
        state = shared
            .work_available
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Split `rows` rows into at most `parts` contiguous, non-empty ranges whose
/// lengths differ by at most one.
#[must_use]
pub fn partition_rows(rows: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, rows.max(1));
    if rows == 0 {
        return Vec::new();
    }
    let base = rows / parts;
    let extra = rows % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}
