//! Bounded worker queues.
//!
//! Every worker reads one small FIFO. Producers never block: [`QueueSender::try_send`]
//! drops the message when the queue is full and counts the drop. The
//! receiving end sits behind an async mutex so a worker holds it only for
//! its lifetime; a restarted worker reacquires the same queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{Mutex, mpsc};

/// Receiving end shared between successive workers of one kind.
pub type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// A bounded queue with a drop counter.
#[derive(Debug)]
pub struct Queue<T> {
    tx: QueueSender<T>,
    rx: SharedReceiver<T>,
}

impl<T> Queue<T> {
    /// Create a queue holding at most `depth` messages.
    pub fn new(name: &'static str, depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(depth.max(1));
        Self {
            tx: QueueSender {
                name,
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn sender(&self) -> QueueSender<T> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> SharedReceiver<T> {
        Arc::clone(&self.rx)
    }
}

/// Producer handle of a [`Queue`].
#[derive(Debug)]
pub struct QueueSender<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue without waiting. Returns `false` if the message was dropped.
    pub fn try_send(&self, message: T) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!("{} queue full, message dropped ({} total)", self.name, total);
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Enqueue, waiting up to `timeout` for room.
    pub async fn send_timeout(&self, message: T, timeout: Duration) -> Result<(), T> {
        match self.tx.send_timeout(message, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(message)) | Err(SendTimeoutError::Closed(message)) => {
                Err(message)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Messages dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Messages currently waiting.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let queue = Queue::new("test", 2);
        let tx = queue.sender();
        assert!(tx.try_send(1));
        assert!(tx.try_send(2));
        assert!(!tx.try_send(3));
        assert_eq!(tx.dropped(), 1);
        assert_eq!(tx.pending(), 2);

        let rx = queue.receiver();
        let mut rx = rx.lock().await;
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(tx.pending(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_counter() {
        let queue: Queue<u8> = Queue::new("test", 1);
        let a = queue.sender();
        let b = a.clone();
        a.try_send(0);
        b.try_send(0);
        assert_eq!(a.dropped(), 1);
        assert_eq!(b.dropped(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_timeout_gives_message_back() {
        let queue = Queue::new("test", 1);
        let tx = queue.sender();
        tx.try_send(1);
        assert_eq!(tx.send_timeout(2, Duration::from_secs(5)).await, Err(2));
        assert_eq!(tx.dropped(), 0);
    }
}
