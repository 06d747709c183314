//! Background work queues.
//!
//! A [`WorkQueue`] runs jobs on a shared, fixed-size [`WorkerPool`] and hands
//! their outputs back through a channel. The controlling thread calls
//! [`WorkQueue::drain`] once per tick and applies every finished output
//! itself; workers never touch chunk state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use terra_common::{JobError, JobId, TerrainError, TerrainResult};
use tracing::{info, trace};

/// Fixed-size pool of worker threads shared by all queues.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
    threads: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}

impl WorkerPool {
    /// Starts a pool. `None` uses the available parallelism.
    pub fn new(threads: Option<usize>) -> TerrainResult<Self> {
        let threads = threads
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(4)
            })
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("terra-worker-{i}"))
            .build()
            .map_err(|e| TerrainError::WorkerPool(e.to_string()))?;

        info!("Started worker pool with {threads} threads");
        Ok(Self {
            pool: Arc::new(pool),
            threads,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        self.pool.spawn(task);
    }
}

/// A finished job, routed back by its key.
#[derive(Debug)]
pub struct JobOutput<K, T> {
    /// Queue-local job identifier
    pub id: JobId,
    /// Routing key supplied at submission
    pub key: K,
    /// Job result, or why it produced none
    pub result: Result<T, JobError>,
}

/// Typed producer/consumer queue over a [`WorkerPool`].
pub struct WorkQueue<K, T> {
    name: &'static str,
    pool: WorkerPool,
    sender: Sender<JobOutput<K, T>>,
    receiver: Receiver<JobOutput<K, T>>,
    next_id: JobId,
    in_flight: Arc<AtomicUsize>,
}

impl<K, T> std::fmt::Debug for WorkQueue<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.name)
            .field("submitted", &self.next_id.raw())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .field("ready", &self.receiver.len())
            .finish()
    }
}

impl<K, T> WorkQueue<K, T>
where
    K: Send + 'static,
    T: Send + 'static,
{
    /// Creates a queue running on `pool`.
    #[must_use]
    pub fn new(name: &'static str, pool: &WorkerPool) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            name,
            pool: pool.clone(),
            sender,
            receiver,
            next_id: JobId::from_raw(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues `job` for background execution. It always runs to completion;
    /// its output is returned by a later [`drain`](Self::drain).
    pub fn submit<F>(&mut self, key: K, job: F) -> JobId
    where
        F: FnOnce() -> Result<T, JobError> + Send + 'static,
    {
        let id = self.next_id;
        self.next_id = id.next();
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let sender = self.sender.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let name = self.name;
        self.pool.spawn(move || {
            let result = match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(result) => result,
                Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
            };
            if sender.send(JobOutput { id, key, result }).is_err() {
                trace!("{name} queue dropped before {id} finished");
            }
            // Decrement only after the output is visible to drain.
            in_flight.fetch_sub(1, Ordering::Release);
        });

        trace!("{} queue: submitted {id}", self.name);
        id
    }

    /// Returns every finished output, in completion order.
    pub fn drain(&self) -> Vec<JobOutput<K, T>> {
        self.receiver.try_iter().collect()
    }

    /// Jobs submitted but not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Outputs waiting to be drained.
    #[must_use]
    pub fn ready(&self) -> usize {
        self.receiver.len()
    }

    /// Total jobs ever submitted.
    #[must_use]
    pub const fn submitted(&self) -> u64 {
        self.next_id.raw()
    }

    /// True when nothing is running and nothing is waiting to be drained.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0 && self.receiver.is_empty()
    }

    /// Queue name, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_idle<K: Send + 'static, T: Send + 'static>(queue: &WorkQueue<K, T>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while queue.in_flight() > 0 {
            assert!(Instant::now() < deadline, "queue did not settle");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_outputs_are_routed_by_key() {
        let pool = WorkerPool::new(Some(2)).expect("pool");
        let mut queue: WorkQueue<u32, u32> = WorkQueue::new("square", &pool);
        for key in 0..16 {
            queue.submit(key, move || Ok(key * key));
        }
        wait_idle(&queue);

        let mut outputs = queue.drain();
        assert_eq!(outputs.len(), 16);
        outputs.sort_by_key(|o| o.key);
        for output in outputs {
            assert_eq!(output.result, Ok(output.key * output.key));
        }
        assert!(queue.is_idle());
        assert_eq!(queue.submitted(), 16);
    }

    #[test]
    fn test_single_worker_completes_in_submission_order() {
        let pool = WorkerPool::new(Some(1)).expect("pool");
        let mut queue: WorkQueue<usize, ()> = WorkQueue::new("ordered", &pool);
        let ids: Vec<JobId> = (0..8).map(|i| queue.submit(i, || Ok(()))).collect();
        wait_idle(&queue);

        let drained: Vec<JobId> = queue.drain().into_iter().map(|o| o.id).collect();
        assert_eq!(drained, ids);
    }

    #[test]
    fn test_drain_consumes_each_output_once() {
        let pool = WorkerPool::new(Some(2)).expect("pool");
        let mut queue: WorkQueue<(), u8> = WorkQueue::new("once", &pool);
        queue.submit((), || Ok(7));
        wait_idle(&queue);

        assert_eq!(queue.ready(), 1);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_panicking_job_reports_failure() {
        let pool = WorkerPool::new(Some(1)).expect("pool");
        let mut queue: WorkQueue<&'static str, u8> = WorkQueue::new("panics", &pool);
        queue.submit("boom", || panic!("generator exploded"));
        queue.submit("fine", || Ok(1));
        wait_idle(&queue);

        let outputs = queue.drain();
        assert_eq!(outputs.len(), 2);
        let boom = outputs.iter().find(|o| o.key == "boom").expect("boom output");
        assert_eq!(
            boom.result,
            Err(JobError::Panicked("generator exploded".to_string()))
        );
        let fine = outputs.iter().find(|o| o.key == "fine").expect("fine output");
        assert_eq!(fine.result, Ok(1));
    }

    #[test]
    fn test_failed_job_is_delivered() {
        let pool = WorkerPool::new(Some(1)).expect("pool");
        let mut queue: WorkQueue<u8, u8> = WorkQueue::new("fails", &pool);
        queue.submit(3, || Err(JobError::Failed("no data".into())));
        wait_idle(&queue);

        let outputs = queue.drain();
        assert_eq!(outputs[0].result, Err(JobError::Failed("no data".into())));
    }

    #[test]
    fn test_zero_threads_is_floored() {
        let pool = WorkerPool::new(Some(0)).expect("pool");
        assert_eq!(pool.threads(), 1);
    }
}
