//! Transition Queue
//!
//! Every playback-affecting operation runs as a job on a single worker, in
//! submission order; job N+1 starts only after job N has settled. Each job
//! runs in its own task so a panicking job fails its caller without taking
//! the worker down.
//!
//! Stale work is detected cooperatively. A [`CancellationToken`] names the
//! track instance it belongs to; user-initiated transitions supersede the
//! current token, and timers and queued auto-advances check theirs before
//! doing anything visible.

use crate::error::{PlaybackError, Result};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

/// Guard token for one track instance
#[derive(Debug, Clone)]
pub struct CancellationToken {
    track_instance_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Fresh, uncancelled token
    pub fn new(track_instance_id: u64) -> Self {
        Self {
            track_instance_id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Track instance this token guards
    pub fn track_instance_id(&self) -> u64 {
        self.track_instance_id
    }

    /// Mark the instance as superseded by the user
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the instance was superseded
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Issues track instances and cancels superseded ones
#[derive(Debug)]
pub struct TransitionGuard {
    current: watch::Sender<CancellationToken>,
}

impl TransitionGuard {
    /// Guard starting at instance 0
    pub fn new() -> Self {
        let (current, _) = watch::channel(CancellationToken::new(0));
        Self { current }
    }

    /// Cancel the current instance and start the next one
    pub fn supersede(&self) -> CancellationToken {
        let mut next = None;
        self.current.send_modify(|current| {
            current.cancel();
            *current = CancellationToken::new(current.track_instance_id + 1);
            next = Some(current.clone());
        });
        let token = next.unwrap_or_else(|| self.current());
        debug!(track_instance_id = token.track_instance_id, "New track instance");
        token
    }

    /// Start the next instance only if `token` is still the current one.
    ///
    /// Returns `None`, leaving the guard untouched, when another transition
    /// has already superseded `token`.
    pub fn supersede_if_current(&self, token: &CancellationToken) -> Option<CancellationToken> {
        let mut next = None;
        self.current.send_if_modified(|current| {
            if token.is_cancelled() || current.track_instance_id != token.track_instance_id {
                return false;
            }
            current.cancel();
            *current = CancellationToken::new(current.track_instance_id + 1);
            next = Some(current.clone());
            true
        });
        match &next {
            Some(token) => debug!(track_instance_id = token.track_instance_id, "New track instance"),
            None => debug!(
                track_instance_id = token.track_instance_id,
                "Instance already superseded"
            ),
        }
        next
    }

    /// Token of the current instance
    pub fn current(&self) -> CancellationToken {
        self.current.borrow().clone()
    }

    /// Whether `token` is uncancelled and still the current instance
    pub fn is_current(&self, token: &CancellationToken) -> bool {
        !token.is_cancelled() && self.current.borrow().track_instance_id == token.track_instance_id
    }
}

impl Default for TransitionGuard {
    fn default() -> Self {
        Self::new()
    }
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Single-worker FIFO queue of transitions
pub struct TransitionQueue {
    sender: mpsc::Sender<Job>,
    shutdown: watch::Sender<bool>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TransitionQueue {
    /// Start the worker on the current runtime
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(run_worker(receiver, shutdown_rx));

        Self {
            sender,
            shutdown,
            worker: tokio::sync::Mutex::new(Some(worker)),
        }
    }

    /// Run `task` after every previously submitted task has settled, and
    /// wait for its result.
    ///
    /// # Errors
    /// - `QueueClosed` when the worker has shut down
    /// - `TransitionAborted` when the task panicked
    /// - whatever the task itself returns
    pub async fn enqueue<F, Fut, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let _ = tx.send(task().await);
            }
            .boxed()
        });

        self.sender
            .send(job)
            .await
            .map_err(|_| PlaybackError::QueueClosed)?;

        match rx.await {
            Ok(result) => result,
            Err(_) if self.is_closed() => Err(PlaybackError::QueueClosed),
            Err(_) => Err(PlaybackError::TransitionAborted(
                "transition task did not complete".to_string(),
            )),
        }
    }

    /// Submit `task` without waiting for it
    pub async fn submit<F, Fut>(&self, task: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Box::new(move || task().boxed());
        self.sender
            .send(job)
            .await
            .map_err(|_| PlaybackError::QueueClosed)
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stop the worker once the running task settles; queued tasks are
    /// dropped
    pub async fn close(&self) {
        self.shutdown.send_replace(true);
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                error!(error = %e, "Transition worker ended abnormally");
            }
        }
    }
}

async fn run_worker(mut jobs: mpsc::Receiver<Job>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        if let Err(e) = tokio::spawn(job()).await {
            error!(error = %e, "Transition task panicked");
        }
    }
    debug!("Transition worker stopped");
}

/// One-shot auto-advance timer with pause support
#[derive(Debug, Default)]
pub struct AutoAdvanceTimer {
    task: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
    remaining: Option<Duration>,
}

impl AutoAdvanceTimer {
    /// Arm the timer; `on_fire` runs after `after` unless the token was
    /// cancelled in the meantime. Replaces any armed timer.
    pub fn arm<F>(&mut self, after: Duration, token: CancellationToken, on_fire: F)
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        self.cancel();
        debug!(
            track_instance_id = token.track_instance_id(),
            after_ms = after.as_millis() as u64,
            "Arming auto-advance"
        );
        self.deadline = Some(Instant::now() + after);
        self.task = Some(tokio::spawn(async move {
            sleep(after).await;
            if token.is_cancelled() {
                debug!(
                    track_instance_id = token.track_instance_id(),
                    "Auto-advance superseded"
                );
                return;
            }
            on_fire(token);
        }));
    }

    /// Stop the timer and remember how much time was left
    pub fn pause(&mut self) -> Option<Duration> {
        let remaining = self
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        self.cancel();
        self.remaining = remaining;
        remaining
    }

    /// Time left recorded by the last `pause`
    pub fn paused_remaining(&self) -> Option<Duration> {
        self.remaining
    }

    /// Time until the armed timer fires
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .or(self.remaining)
    }

    /// Whether a timer is armed
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Disarm and forget any paused remainder
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.deadline = None;
        self.remaining = None;
    }
}

impl Drop for AutoAdvanceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[tokio::test]
    async fn tasks_run_one_at_a_time_in_order() {
        let queue = Arc::new(TransitionQueue::new(8));
        let log = Arc::new(Mutex::new(Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..5u64 {
            let queue = queue.clone();
            let log = log.clone();
            let active = active.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(move || async move {
                        assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                        sleep(Duration::from_millis(5 * (5 - i))).await;
                        log.lock().unwrap().push(i);
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(i)
                    })
                    .await
            }));
            // Submission order is the spawn order
            tokio::task::yield_now().await;
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), i as u64);
        }
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn failed_task_does_not_block_the_next() {
        let queue = TransitionQueue::new(4);

        let err = queue
            .enqueue(|| async { Err::<(), _>(PlaybackError::MountFailed("bad".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::MountFailed(_)));

        let ok = queue.enqueue(|| async { Ok(7) }).await.unwrap();
        assert_eq!(ok, 7);
    }

    #[tokio::test]
    async fn panicking_task_is_reported_and_worker_survives() {
        let queue = TransitionQueue::new(4);

        let err = queue
            .enqueue(|| async {
                if true {
                    panic!("device exploded");
                }
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::TransitionAborted(_)));

        assert_eq!(queue.enqueue(|| async { Ok(1) }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn closed_queue_rejects_work() {
        let queue = TransitionQueue::new(4);
        queue.close().await;
        assert!(queue.is_closed());

        let err = queue.enqueue(|| async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, PlaybackError::QueueClosed));
    }

    #[test]
    fn supersede_cancels_previous_instance() {
        let guard = TransitionGuard::new();
        let first = guard.supersede();
        assert_eq!(first.track_instance_id(), 1);
        assert!(guard.is_current(&first));

        let second = guard.supersede();
        assert_eq!(second.track_instance_id(), 2);
        assert!(first.is_cancelled());
        assert!(!guard.is_current(&first));
        assert!(guard.is_current(&second));
        assert_eq!(guard.current().track_instance_id(), 2);
    }

    #[test]
    fn stale_token_does_not_supersede_newer_instance() {
        let guard = TransitionGuard::new();
        let captured = guard.current();
        let newer = guard.supersede();

        assert!(guard.supersede_if_current(&captured).is_none());
        assert!(guard.is_current(&newer));
        assert_eq!(guard.current().track_instance_id(), 1);

        let next = guard.supersede_if_current(&newer).unwrap();
        assert_eq!(next.track_instance_id(), 2);
        assert!(newer.is_cancelled());
        assert!(guard.is_current(&next));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = AutoAdvanceTimer::default();

        let counter = fired.clone();
        timer.arm(Duration::from_secs(3), CancellationToken::new(1), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_armed());

        sleep(Duration::from_millis(2_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_makes_timer_a_no_op() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = AutoAdvanceTimer::default();
        let token = CancellationToken::new(4);

        let counter = fired.clone();
        timer.arm(Duration::from_secs(1), token.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        token.cancel();

        sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_records_remaining_time() {
        let mut timer = AutoAdvanceTimer::default();
        timer.arm(Duration::from_secs(10), CancellationToken::new(1), |_| {});

        sleep(Duration::from_secs(4)).await;
        let remaining = timer.pause();
        assert_eq!(remaining, Some(Duration::from_secs(6)));
        assert!(!timer.is_armed());
        assert_eq!(timer.paused_remaining(), Some(Duration::from_secs(6)));

        sleep(Duration::from_secs(30)).await;
        assert_eq!(timer.remaining(), Some(Duration::from_secs(6)));
    }
}
