//! Deferred and repeating commands fed back into an actor's queue.
//!
//! Each timer is its own task. Dropping or cancelling the handle aborts it,
//! so a timer never outlives the state that scheduled it.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant};

pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Send `msg` once after `delay`
pub fn after<T: Send + 'static>(delay: Duration, tx: mpsc::Sender<T>, msg: T) -> TimerHandle {
    let task = tokio::spawn(async move {
        sleep(delay).await;
        let _ = tx.send(msg).await;
    });
    TimerHandle { task }
}

/// Send a clone of `msg` every `period` until cancelled or the receiver is gone.
/// The first send happens one period from now.
pub fn every<T: Clone + Send + 'static>(period: Duration, tx: mpsc::Sender<T>, msg: T) -> TimerHandle {
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            if tx.send(msg.clone()).await.is_err() {
                break;
            }
        }
    });
    TimerHandle { task }
}
