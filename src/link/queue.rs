//! Queue of one-off encoded commands awaiting dispatch.
//!
//! Producers never block: when the queue is full the oldest command is
//! evicted to make room. The dispatch loop is the only consumer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_queue::ArrayQueue;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::warn;

/// Default number of commands held before the oldest is evicted.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Bounded multi-producer FIFO of encoded packets.
#[derive(Debug)]
pub struct CommandQueue {
    packets: ArrayQueue<Bytes>,
    notify: Notify,
    dropped: AtomicU64,
}

impl CommandQueue {
    /// Create a queue holding at most `capacity` packets (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: ArrayQueue::new(capacity.max(1)),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a packet. Never blocks and never fails.
    pub fn enqueue(&self, packet: Bytes) {
        if let Some(evicted) = self.packets.force_push(packet) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                header = evicted.first().copied().unwrap_or_default(),
                capacity = self.packets.capacity(),
                "command queue full, dropped oldest command"
            );
        }
        self.notify.notify_one();
    }

    /// Pop the oldest packet, waiting up to `wait` for one to arrive.
    pub async fn try_dequeue(&self, wait: Duration) -> Option<Bytes> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(packet) = self.packets.pop() {
                return Some(packet);
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.packets.pop();
            }
        }
    }

    /// Number of queued packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Maximum number of queued packets.
    pub fn capacity(&self) -> usize {
        self.packets.capacity()
    }

    /// Number of packets evicted because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Take everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<Bytes> {
        std::iter::from_fn(|| self.packets.pop()).collect()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn packet(n: u8) -> Bytes {
        Bytes::from(vec![0x05, n])
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = CommandQueue::new(8);
        for n in 0..5 {
            queue.enqueue(packet(n));
        }

        for n in 0..5 {
            let popped = queue.try_dequeue(Duration::from_millis(10)).await.unwrap();
            assert_eq!(popped, packet(n));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_empty_times_out() {
        let queue = CommandQueue::new(4);
        let started = std::time::Instant::now();

        assert!(queue.try_dequeue(Duration::from_millis(50)).await.is_none());
        assert!(started.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn test_full_queue_drops_oldest() {
        let queue = CommandQueue::new(3);
        for n in 0..5 {
            queue.enqueue(packet(n));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped(), 2);
        for n in 2..5 {
            assert_eq!(queue.try_dequeue(Duration::ZERO).await.unwrap(), packet(n));
        }
    }

    #[tokio::test]
    async fn test_waiting_consumer_is_woken() {
        let queue = Arc::new(CommandQueue::new(4));
        let producer = Arc::clone(&queue);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.enqueue(packet(7));
        });

        let started = std::time::Instant::now();
        let popped = queue.try_dequeue(Duration::from_secs(2)).await;
        assert_eq!(popped, Some(packet(7)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let queue = CommandQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.enqueue(packet(1));
        queue.enqueue(packet(2));
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.drain(), vec![packet(2)]);
        assert!(queue.is_empty());
    }
}
