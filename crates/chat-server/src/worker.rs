//! Upload worker pool (C8): a fixed number of threads relaying queued files
//! to their target's notification channel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chat_common::FileItem;
use chat_common::protocol::file_header;
use log::{info, warn};

use crate::logsink::LogSink;
use crate::queue::FileQueue;
use crate::registry::ConnectionRegistry;

/// Spawns `count` worker threads draining `queue`. Each exits on the first
/// sentinel it dequeues.
pub fn spawn_upload_workers(
  count: usize,
  queue: Arc<FileQueue>,
  connections: Arc<ConnectionRegistry>,
  log: Arc<LogSink>,
) -> Vec<JoinHandle<()>> {
  (0..count)
    .map(|id| {
      let queue = queue.clone();
      let connections = connections.clone();
      let log = log.clone();
      thread::Builder::new()
        .name(format!("upload-worker-{id}"))
        .spawn(move || worker_loop(id, &queue, &connections, &log))
        .expect("failed to spawn upload worker thread")
    })
    .collect()
}

fn worker_loop(id: usize, queue: &Arc<FileQueue>, connections: &Arc<ConnectionRegistry>, log: &Arc<LogSink>) {
  info!("upload worker {id} started");
  loop {
    let Some(item) = queue.dequeue() else {
      break; // every producer handle dropped; only happens at process exit.
    };
    let data = match item {
      FileItem::Sentinel => break,
      FileItem::Data(data) => data,
    };

    match connections.lookup(&data.target) {
      None => {
        warn!("upload worker {id}: target '{}' offline, dropping '{}'", data.target, data.filename);
        log.write(&format!(
          "dropped file '{}' from {} for offline user {}",
          data.filename, data.sender, data.target
        ));
      }
      Some(target) => {
        let mut framed = Vec::with_capacity(data.payload.len() + data.filename.len() + 32);
        framed.extend_from_slice(file_header(&data.filename, data.payload.len() as u64, &data.sender).as_bytes());
        framed.push(b'\n');
        framed.extend_from_slice(&data.payload);
        // One channel item carries header+payload together, so the
        // single-consumer notification channel gives atomic delivery
        // ordering for free (no interleaving with another producer's write).
        target.notify.send_bytes(framed);
        log.write(&format!(
          "relayed file '{}' ({} bytes) from {} to {}",
          data.filename,
          data.payload.len(),
          data.sender,
          data.target
        ));
      }
    }
  }
  info!("upload worker {id} exited");
}
