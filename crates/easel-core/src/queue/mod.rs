//! Task queue: bounded concurrency, FIFO admission, one execution per task.
//!
//! Shared state (backlog, running set, acknowledgment index) sits behind a
//! single mutex that is never held across an `await`, so each admission
//! decision is atomic. A task takes its place in line when it is admitted, even
//! though its SUBMITTED record is written afterwards. Units of work run on a
//! fixed [`WorkerGroup`]; the submitter awaits the unit's own envelope.

mod config;
mod counts;
mod worker;

pub use config::QueueConfig;
pub use counts::QueueCounts;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{Nonce, ResultCode, ResultEnvelope, SubmitResult, Task, TaskId};
use crate::pipeline::UnitOfWork;
use crate::ports::{Clock, TaskStore};
use worker::WorkerGroup;

/// How the backend finished a dispatched task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    Failed(String),
}

/// An accepted task waiting for (or holding) an execution slot.
struct Job {
    task: Task,
    work: Box<dyn UnitOfWork>,
    reply: oneshot::Sender<SubmitResult>,
}

/// A place in line. `job` stays empty until the SUBMITTED write lands.
struct Waiting {
    ticket: u64,
    task_id: TaskId,
    job: Option<Job>,
}

#[derive(Default)]
struct QueueState {
    /// Admitted tasks in admission order.
    pending: VecDeque<Waiting>,

    /// Snapshots of executing tasks.
    running: HashMap<TaskId, Task>,

    /// Dispatched tasks waiting for the backend acknowledgment. Not counted
    /// against the execution slots.
    awaiting_ack: HashMap<Nonce, Task>,

    next_ticket: u64,
    closed: bool,
}

impl QueueState {
    fn occupancy(&self) -> usize {
        self.pending.len() + self.running.len()
    }

    fn position_of(&self, ticket: u64) -> Option<usize> {
        self.pending.iter().position(|w| w.ticket == ticket)
    }

    fn front_is_ready(&self) -> bool {
        self.pending.front().is_some_and(|w| w.job.is_some())
    }
}

pub(crate) struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    config: QueueConfig,
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim a place in line for `task_id`, or explain why there is none.
    fn reserve(shared: &Arc<Shared>, task_id: TaskId) -> Result<Reservation, SubmitResult> {
        let mut state = shared.lock();
        if state.closed {
            return Err(SubmitResult::rejected(
                ResultCode::Cancelled,
                "queue is shut down",
            ));
        }
        if state.occupancy() >= shared.config.capacity() {
            return Err(SubmitResult::rejected(
                ResultCode::QueueFull,
                format!(
                    "queue is full: {} running, {} waiting",
                    state.running.len(),
                    state.pending.len()
                ),
            ));
        }
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.pending.push_back(Waiting {
            ticket,
            task_id,
            job: None,
        });
        Ok(Reservation {
            shared: Arc::clone(shared),
            ticket,
            armed: true,
        })
    }

    /// Record the submission and fill the reserved place with the job.
    async fn admit(
        shared: Arc<Shared>,
        reservation: Reservation,
        mut task: Task,
        work: Box<dyn UnitOfWork>,
    ) -> Result<oneshot::Receiver<SubmitResult>, SubmitResult> {
        let task_id = task.id();
        task.mark_submitted(shared.clock.now());
        if let Err(e) = shared.store.save(&task).await {
            warn!(task_id = %task_id, "failed to record submission: {e}");
            return Err(SubmitResult::from_envelope(task_id, e.into_envelope()));
        }

        let (reply, done) = oneshot::channel();
        let job = Job { task, work, reply };
        match shared.enqueue(reservation, job) {
            Ok(position) => info!(task_id = %task_id, position, "task queued"),
            Err(job) => shared.cancel_job(job, "queue is shut down").await,
        }
        Ok(done)
    }

    /// Hands the job back if the queue closed in the meantime.
    fn enqueue(&self, mut reservation: Reservation, job: Job) -> Result<usize, Job> {
        reservation.armed = false;
        let position = {
            let mut state = self.lock();
            match state.position_of(reservation.ticket) {
                Some(pos) if !state.closed => {
                    state.pending[pos].job = Some(job);
                    pos + 1
                }
                Some(pos) => {
                    state.pending.remove(pos);
                    return Err(job);
                }
                None => return Err(job),
            }
        };
        self.notify.notify_one();
        Ok(position)
    }

    /// Pop the oldest waiting job and mark it running. Nothing starts while
    /// an earlier admission is still being recorded.
    fn next_job(&self) -> Option<Job> {
        let mut state = self.lock();
        if !state.front_is_ready() {
            return None;
        }
        let mut job = state.pending.pop_front().and_then(|w| w.job)?;
        job.task.mark_started(self.clock.now());
        state.running.insert(job.task.id(), job.task.clone());
        if state.front_is_ready() {
            // A single stored permit may have covered several pushes.
            self.notify.notify_one();
        }
        Some(job)
    }

    async fn run(&self, worker_id: usize, job: Job) {
        let task_id = job.task.id();
        if job.reply.is_closed() {
            self.lock().running.remove(&task_id);
            info!(worker_id, task_id = %task_id, "submitter withdrew before the task started");
            self.cancel_job(job, "submitter withdrew before the task started")
                .await;
            return;
        }

        let Job {
            task,
            work,
            reply,
        } = job;
        self.persist(&task).await;
        info!(worker_id, task_id = %task_id, action = %task.action, "executing task");

        // Spawned so a panicking unit cannot take the worker down with it.
        let handle = tokio::spawn(async move {
            let mut task = task;
            let envelope = work.execute(&mut task).await;
            (task, envelope)
        });
        let (mut task, envelope) = match handle.await {
            Ok(done) => done,
            Err(e) => {
                warn!(worker_id, task_id = %task_id, "unit of work aborted: {e}");
                let snapshot = self.lock().running.get(&task_id).cloned();
                let envelope = ResultEnvelope::failure(
                    ResultCode::DispatchFailed,
                    format!("unit of work aborted: {e}"),
                );
                match snapshot {
                    Some(task) => (task, envelope),
                    None => {
                        self.lock().running.remove(&task_id);
                        let _ = reply.send(SubmitResult::from_envelope(task_id, envelope));
                        return;
                    }
                }
            }
        };

        if envelope.is_success() {
            task.mark_dispatched();
        } else {
            task.mark_failed(envelope.description.clone(), self.clock.now());
        }
        self.persist(&task).await;
        self.finish(&task, envelope.is_success());
        info!(worker_id, task_id = %task_id, code = %envelope.code, "task finished");

        if reply
            .send(SubmitResult::from_envelope(task_id, envelope))
            .is_err()
        {
            debug!(task_id = %task_id, "submitter no longer waiting");
        }
    }

    /// Free the execution slot. A dispatched task moves to the
    /// acknowledgment index under its nonce.
    fn finish(&self, task: &Task, dispatched: bool) {
        let mut state = self.lock();
        state.running.remove(&task.id());
        if dispatched {
            if let Some(nonce) = task.nonce() {
                state.awaiting_ack.insert(nonce, task.clone());
            }
        }
    }

    /// Status bookkeeping write. Failures are logged, not surfaced.
    async fn persist(&self, task: &Task) {
        if let Err(e) = self.store.save(task).await {
            warn!(task_id = %task.id(), status = ?task.status, "failed to record task status: {e}");
        }
    }

    /// Finalize a job that never ran.
    async fn cancel_job(&self, job: Job, reason: &str) {
        let Job { mut task, reply, .. } = job;
        let task_id = task.id();
        task.mark_cancelled(self.clock.now());
        self.persist(&task).await;
        let _ = reply.send(SubmitResult::from_envelope(
            task_id,
            ResultEnvelope::failure(ResultCode::Cancelled, reason),
        ));
    }
}

/// A place in line held while the SUBMITTED status is written.
/// Dropping it unfilled gives the place back.
struct Reservation {
    shared: Arc<Shared>,
    ticket: u64,
    armed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut state = self.shared.lock();
            if let Some(pos) = state.position_of(self.ticket) {
                state.pending.remove(pos);
            }
        }
        // The next place in line may be ready now.
        self.shared.notify.notify_one();
    }
}

/// Bounded, FIFO task queue with a fixed executor pool.
pub struct TaskQueue {
    shared: Arc<Shared>,
    workers: Mutex<Option<WorkerGroup>>,
}

impl TaskQueue {
    /// Build the queue and spawn `config.core_size` workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: QueueConfig, store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            config,
            store,
            clock,
        });
        let workers = WorkerGroup::spawn(config.core_size, Arc::clone(&shared));
        info!(
            core_size = config.core_size,
            queue_size = config.queue_size,
            "task queue started"
        );
        Self {
            shared,
            workers: Mutex::new(Some(workers)),
        }
    }

    /// Admit `task`, run `work` once a slot is free, and report its envelope.
    ///
    /// Returns `QUEUE_FULL` without touching `work` when the backlog is at its
    /// bound. An accepted task is recorded as `SUBMITTED` before it can run.
    ///
    /// Dropping the returned future does not strand the task: admission
    /// completes in the background, and a task whose submitter is gone is
    /// cancelled instead of started.
    pub async fn submit(&self, task: Task, work: Box<dyn UnitOfWork>) -> SubmitResult {
        let task_id = task.id();
        let reservation = match Shared::reserve(&self.shared, task_id) {
            Ok(reservation) => reservation,
            Err(mut rejected) => {
                warn!(task_id = %task_id, code = %rejected.code, "submission rejected: {}", rejected.description);
                rejected.task_id = Some(task_id);
                return rejected;
            }
        };

        let admission = tokio::spawn(Shared::admit(
            Arc::clone(&self.shared),
            reservation,
            task,
            work,
        ));
        let done = match admission.await {
            Ok(Ok(done)) => done,
            Ok(Err(rejected)) => return rejected,
            Err(e) => {
                return SubmitResult::from_envelope(
                    task_id,
                    ResultEnvelope::failure(
                        ResultCode::PersistenceFailed,
                        format!("recording the submission aborted: {e}"),
                    ),
                );
            }
        };

        match done.await {
            Ok(result) => result,
            Err(_) => SubmitResult::from_envelope(
                task_id,
                ResultEnvelope::failure(ResultCode::Cancelled, "queue dropped the task"),
            ),
        }
    }

    /// Withdraw a task that is still waiting for a slot.
    ///
    /// Returns `false` if the task is unknown, still being recorded, or already
    /// executing; a running unit always completes to its natural result.
    pub async fn cancel(&self, task_id: TaskId) -> bool {
        let job = {
            let mut state = self.shared.lock();
            let pos = state
                .pending
                .iter()
                .position(|w| w.task_id == task_id && w.job.is_some());
            pos.and_then(|pos| state.pending.remove(pos))
                .and_then(|w| w.job)
        };
        let Some(job) = job else {
            return false;
        };
        // Removing the head can unblock the next waiting task.
        self.shared.notify.notify_one();
        info!(task_id = %task_id, "task cancelled while waiting");
        self.shared
            .cancel_job(job, "task cancelled before it started")
            .await;
        true
    }

    pub fn counts(&self) -> QueueCounts {
        let state = self.shared.lock();
        QueueCounts {
            queued: state.pending.len(),
            running: state.running.len(),
            awaiting_ack: state.awaiting_ack.len(),
            core_size: self.shared.config.core_size,
            queue_size: self.shared.config.queue_size,
        }
    }

    /// Waiting task ids, next-to-run first.
    pub fn queued_task_ids(&self) -> Vec<TaskId> {
        self.shared
            .lock()
            .pending
            .iter()
            .map(|w| w.task_id)
            .collect()
    }

    /// Tasks that are executing or dispatched and waiting for the backend to
    /// acknowledge them.
    pub fn running_tasks(&self) -> Vec<Task> {
        let state = self.shared.lock();
        state
            .running
            .values()
            .chain(state.awaiting_ack.values())
            .cloned()
            .collect()
    }

    /// The in-flight task carrying `nonce`, executing or awaiting its
    /// acknowledgment.
    pub fn find_running_by_nonce(&self, nonce: Nonce) -> Option<Task> {
        let state = self.shared.lock();
        state
            .awaiting_ack
            .get(&nonce)
            .or_else(|| {
                state
                    .running
                    .values()
                    .find(|task| task.nonce() == Some(nonce))
            })
            .cloned()
    }

    /// Close out a dispatched task once the backend reports on it.
    ///
    /// Returns the final record, or `None` if no dispatched task carries
    /// `nonce`.
    pub async fn acknowledge(&self, nonce: Nonce, completion: Completion) -> Option<Task> {
        let mut task = self.shared.lock().awaiting_ack.remove(&nonce)?;
        let now = self.shared.clock.now();
        match completion {
            Completion::Succeeded => task.mark_succeeded(now),
            Completion::Failed(reason) => task.mark_failed(reason, now),
        }
        self.shared.persist(&task).await;
        info!(task_id = %task.id(), status = ?task.status, "task acknowledged");
        Some(task)
    }

    /// Stop accepting work, let running units finish, and cancel everything
    /// still waiting.
    pub async fn shutdown(&self) {
        let workers = {
            self.shared.lock().closed = true;
            self.workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        };
        if let Some(workers) = workers {
            workers.shutdown_and_join().await;
        }
        // Places still being recorded are cancelled by their own admission.
        let drained: Vec<Job> = self
            .shared
            .lock()
            .pending
            .drain(..)
            .filter_map(|w| w.job)
            .collect();
        for job in drained {
            self.shared.cancel_job(job, "queue is shut down").await;
        }
        info!("task queue stopped");
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        if let Some(workers) = self
            .workers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            workers.request_shutdown();
        }
    }
}
