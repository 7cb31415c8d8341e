use crate::error::{CragError, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Shared cancellation flag with an optional deadline.
///
/// Clones observe the same flag, so cancelling any clone stops every worker
/// holding one.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// What a pool run produced. `completed` and `failed` are in arrival order.
#[derive(Debug)]
pub struct PoolOutcome<K, T> {
    pub completed: Vec<(K, T)>,
    pub failed: Vec<(K, CragError)>,
    pub cancelled: bool,
}

/// Fixed number of workers draining a shared queue.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` for every item.
    ///
    /// Workers check `cancel` before taking each item. When the deadline
    /// passes, outstanding workers are aborted and whatever already finished
    /// is returned with `cancelled` set.
    pub async fn run<K, T, F, Fut>(
        &self,
        items: Vec<K>,
        cancel: &CancelSignal,
        task: F,
    ) -> PoolOutcome<K, T>
    where
        K: Clone + Send + 'static,
        T: Send + 'static,
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let worker_count = self.workers.min(items.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let task = Arc::new(task);
        let (tx, mut rx) = mpsc::unbounded_channel::<(K, Result<T>)>();

        let mut set = JoinSet::new();
        for _ in 0..worker_count {
            let queue = Arc::clone(&queue);
            let task = Arc::clone(&task);
            let cancel = cancel.clone();
            let tx = tx.clone();
            set.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(item) = queue.lock().await.pop_front() else {
                        break;
                    };
                    let result = task(item.clone()).await;
                    if tx.send((item, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut outcome = PoolOutcome {
            completed: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        };
        let mut timed_out = false;

        loop {
            let next = match cancel.deadline() {
                Some(deadline) => tokio::select! {
                    msg = rx.recv() => msg,
                    _ = tokio::time::sleep_until(deadline) => {
                        timed_out = true;
                        None
                    }
                },
                None => rx.recv().await,
            };

            match next {
                Some((item, Ok(value))) => outcome.completed.push((item, value)),
                Some((item, Err(e))) => outcome.failed.push((item, e)),
                None => break,
            }
        }

        if timed_out {
            cancel.cancel();
            set.abort_all();
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    tracing::warn!("Worker task failed: {}", e);
                }
            }
        }

        // Results sent between the deadline firing and the abort
        while let Ok((item, result)) = rx.try_recv() {
            match result {
                Ok(value) => outcome.completed.push((item, value)),
                Err(e) => outcome.failed.push((item, e)),
            }
        }

        let abandoned = !queue.lock().await.is_empty();
        outcome.cancelled = timed_out || abandoned;

        tracing::debug!(
            workers = worker_count,
            completed = outcome.completed.len(),
            failed = outcome.failed.len(),
            cancelled = outcome.cancelled,
            "Worker pool finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn runs_every_item() {
        let pool = WorkerPool::new(4);
        let items: Vec<u32> = (0..20).collect();
        let outcome = pool
            .run(items, &CancelSignal::new(), |n| async move { Ok::<_, CragError>(n * 2) })
            .await;

        assert!(!outcome.cancelled);
        assert!(outcome.failed.is_empty());
        let mut values: Vec<u32> = outcome.completed.iter().map(|(_, v)| *v).collect();
        values.sort();
        assert_eq!(values, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let pool = WorkerPool::new(3);
        let outcome = pool
            .run((0..10).collect::<Vec<u32>>(), &CancelSignal::new(), |n| async move {
                if n % 2 == 1 {
                    Err(CragError::DataUnavailable(format!("item {}", n)))
                } else {
                    Ok::<_, CragError>(n)
                }
            })
            .await;
        assert_eq!(outcome.completed.len(), 5);
        assert_eq!(outcome.failed.len(), 5);
        assert!(outcome.failed.iter().all(|(n, _)| n % 2 == 1));
    }

    #[tokio::test]
    async fn deadline_returns_partial_results() {
        let pool = WorkerPool::new(1);
        let cancel = CancelSignal::with_timeout(Duration::from_millis(500));
        let outcome = pool
            .run((0..10).collect::<Vec<u32>>(), &cancel, |n| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, CragError>(n)
            })
            .await;

        assert!(outcome.cancelled);
        assert!(!outcome.completed.is_empty());
        assert!(outcome.completed.len() < 10);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn pre_cancelled_signal_does_no_work() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancelSignal::new();
        cancel.cancel();

        let counter = Arc::clone(&calls);
        let outcome = WorkerPool::new(2)
            .run(vec![1u32, 2, 3], &cancel, move |n| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CragError>(n)
                }
            })
            .await;

        assert!(outcome.cancelled);
        assert!(outcome.completed.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_input_is_not_cancelled() {
        let outcome = WorkerPool::new(4)
            .run(Vec::<u32>::new(), &CancelSignal::new(), |n| async move { Ok::<_, CragError>(n) })
            .await;
        assert!(outcome.completed.is_empty());
        assert!(!outcome.cancelled);
    }

    #[test]
    fn zero_workers_is_clamped() {
        assert_eq!(WorkerPool::new(0).workers(), 1);
    }
}
