//! Bounded FIFO file-relay queue (C3). A thin wrapper over a bounded
//! `crossbeam_channel`, which already gives strict FIFO ordering, blocking
//! enqueue/dequeue and a non-blocking fullness probe for free.

use chat_common::FileItem;
use crossbeam_channel::{Receiver, Sender, bounded};

pub struct FileQueue {
  tx: Sender<FileItem>,
  rx: Receiver<FileItem>,
  capacity: usize,
}

impl FileQueue {
  #[must_use]
  pub fn new(capacity: usize) -> Self {
    let (tx, rx) = bounded(capacity.max(1));
    Self { tx, rx, capacity }
  }

  /// Blocks while full; on return the queue owns `item`.
  pub fn enqueue(&self, item: FileItem) {
    // A `send` can only fail if every receiver (every worker) has exited,
    // which happens only during/after shutdown; dropping the item then is
    // correct since nothing will ever dequeue it.
    let _ = self.tx.send(item);
  }

  /// Non-blocking; returns false iff full.
  #[must_use]
  pub fn try_enqueue(&self, item: FileItem) -> bool {
    self.tx.try_send(item).is_ok()
  }

  /// Blocks while empty. `None` once every producer has dropped its handle.
  #[must_use]
  pub fn dequeue(&self) -> Option<FileItem> {
    self.rx.recv().ok()
  }

  /// Non-blocking snapshot probe; not a guarantee for a subsequent enqueue.
  #[must_use]
  pub fn is_full(&self) -> bool {
    self.tx.len() >= self.capacity
  }

  #[must_use]
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Enqueues one sentinel per worker to unblock and end every worker's
  /// dequeue loop.
  pub fn shutdown(&self, worker_count: usize) {
    for _ in 0..worker_count {
      self.enqueue(FileItem::Sentinel);
    }
  }
}
