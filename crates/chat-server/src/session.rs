//! The per-connection client session loop (C7).
//!
//! Realized as three cooperating OS threads rather than one thread selecting
//! over two sources: a reader thread owns all socket reads and command
//! dispatch, a writer thread owns the socket's write half and drains the
//! notification channel exclusively (this *is* the multiplexed wait), and a
//! supervisor thread spawns both, joins them in order and performs teardown.
//! The split still yields the single-writer invariant (I7): only the writer
//! thread ever calls `write` on this connection's socket.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chat_common::protocol::{
  MAX_FILE_SIZE, broadcast_join_room_first, broadcast_usage, chat_line, exit_reply,
  join_invalid_name, join_ok, join_registry_full, join_room_full, leave_not_in_room, leave_ok,
  out_of_memory, sendfile_invalid_size, sendfile_ok, sendfile_queue_full, sendfile_short_read,
  sendfile_usage, unknown_command, whisper_user_offline, whisper_usage,
};
use chat_common::validate::valid_room;
use chat_common::{ChatError, FileItem};
use crossbeam_channel::{Sender, bounded};
use log::{error, info, warn};
use parking_lot::Mutex;

use crate::logsink::LogSink;
use crate::notify::{DrainedMsg, NotifyReceiver};
use crate::queue::FileQueue;
use crate::registry::{Connection, ConnectionRegistry};
use crate::room::RoomRegistry;

/// Shared state every session loop needs. One instance per server run.
pub struct SessionContext {
  pub connections: Arc<ConnectionRegistry>,
  pub rooms: Arc<RoomRegistry>,
  pub queue: Arc<FileQueue>,
  pub log: Arc<LogSink>,
  /// Shutdown-only map from handle to a cloned socket handle, used to force
  /// a blocked reader to observe EOF/error when the server shuts down. Kept
  /// out of `Connection` itself so the registry stays free of transport
  /// concerns.
  sockets: Mutex<HashMap<String, TcpStream>>,
}

impl SessionContext {
  #[must_use]
  pub fn new(
    connections: Arc<ConnectionRegistry>,
    rooms: Arc<RoomRegistry>,
    queue: Arc<FileQueue>,
    log: Arc<LogSink>,
  ) -> Self {
    Self {
      connections,
      rooms,
      queue,
      log,
      sockets: Mutex::new(HashMap::new()),
    }
  }

  fn register_socket(&self, handle: &str, stream: TcpStream) {
    self.sockets.lock().insert(handle.to_string(), stream);
  }

  fn take_socket(&self, handle: &str) {
    self.sockets.lock().remove(handle);
  }

  /// Shuts down every tracked socket so every session's reader thread
  /// unblocks with an error or EOF. Used only during server shutdown.
  pub fn shutdown_all_sockets(&self) {
    for (_, stream) in self.sockets.lock().drain() {
      let _ = stream.shutdown(std::net::Shutdown::Both);
    }
  }
}

/// Spawns the reader/writer pair for `conn` and returns the supervisor's
/// join handle. Blocks until both threads are up, so the caller (the
/// acceptor) can rely on the connection's identity already being visible to
/// logs before moving on to the next handshake.
pub fn spawn(
  ctx: Arc<SessionContext>,
  stream: TcpStream,
  conn: Arc<Connection>,
  notify_rx: NotifyReceiver,
) -> JoinHandle<()> {
  let (ready_tx, ready_rx) = bounded::<()>(1);
  let supervisor = thread::Builder::new()
    .name(format!("session-{}-sup", conn.handle))
    .spawn(move || run_supervisor(ctx, stream, conn, notify_rx, ready_tx))
    .expect("failed to spawn session supervisor thread");
  let _ = ready_rx.recv();
  supervisor
}

fn run_supervisor(
  ctx: Arc<SessionContext>,
  stream: TcpStream,
  conn: Arc<Connection>,
  notify_rx: NotifyReceiver,
  ready_tx: Sender<()>,
) {
  let (shutdown_handle, writer_stream) = match (stream.try_clone(), stream.try_clone()) {
    (Ok(a), Ok(b)) => (a, b),
    _ => {
      error!("session {}: failed to clone socket, aborting session", conn.handle);
      let _ = ready_tx.send(());
      teardown(&ctx, &conn);
      return;
    }
  };
  ctx.register_socket(&conn.handle, shutdown_handle);

  let reader = BufReader::new(stream);
  let writer_handle = thread::Builder::new()
    .name(format!("session-{}-writer", conn.handle))
    .spawn(move || writer_loop(writer_stream, notify_rx))
    .expect("failed to spawn session writer thread");

  let reader_ctx = ctx.clone();
  let reader_conn = conn.clone();
  let reader_handle = thread::Builder::new()
    .name(format!("session-{}-reader", conn.handle))
    .spawn(move || reader_loop(&reader_ctx, &reader_conn, reader))
    .expect("failed to spawn session reader thread");

  let _ = ready_tx.send(());
  info!("session {} started ({})", conn.handle, conn.addr);

  let _ = reader_handle.join();
  // The reader has decided RUNNING -> DRAINING (or the socket was closed by
  // shutdown); tell the writer to stop even though producers elsewhere may
  // still hold cloned senders.
  conn.notify.send_close();
  let _ = writer_handle.join();

  ctx.take_socket(&conn.handle);
  teardown(&ctx, &conn);
}

fn teardown(ctx: &Arc<SessionContext>, conn: &Arc<Connection>) {
  if let Some(room_name) = conn.current_room() {
    if let Some(room) = ctx.rooms.find_existing(&room_name) {
      ctx.rooms.leave(&room, conn);
    }
  }
  ctx.connections.remove(&conn.handle);
  ctx.log.write(&format!("{} disconnected", conn.handle));
  info!("session {} exited", conn.handle);
}

fn writer_loop(mut stream: TcpStream, rx: NotifyReceiver) {
  loop {
    match rx.recv() {
      Ok(DrainedMsg::Bytes(bytes)) => {
        if let Err(e) = stream.write_all(&bytes) {
          warn!("session writer: write failed: {e}");
          break;
        }
        let _ = stream.flush();
      }
      Ok(DrainedMsg::Closed) | Err(_) => break,
    }
  }
}

fn reader_loop(ctx: &Arc<SessionContext>, conn: &Arc<Connection>, mut reader: BufReader<TcpStream>) {
  let mut line = String::new();
  loop {
    line.clear();
    let read = match reader.read_line(&mut line) {
      Ok(n) => n,
      Err(e) => {
        warn!("session {}: read error: {e}", conn.handle);
        break;
      }
    };
    if read == 0 {
      break; // EOF: client closed the connection.
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    if trimmed.is_empty() {
      continue;
    }
    if !dispatch(ctx, conn, trimmed, &mut reader) {
      break;
    }
  }
}

/// Parses and executes one command line. Returns `false` iff the session
/// should transition to DRAINING.
fn dispatch(ctx: &Arc<SessionContext>, conn: &Arc<Connection>, line: &str, reader: &mut BufReader<TcpStream>) -> bool {
  let mut parts = line.splitn(2, ' ');
  let verb = parts.next().unwrap_or("");
  let rest = parts.next().unwrap_or("");

  match verb {
    "/exit" => {
      conn.notify.send_line(&exit_reply());
      false
    }

    "/whisper" => {
      let mut it = rest.splitn(2, ' ');
      let user = it.next().filter(|s| !s.is_empty());
      let msg = it.next().filter(|s| !s.is_empty());
      match (user, msg) {
        (Some(user), Some(msg)) => {
          match ctx.connections.lookup(user) {
            Some(target) => {
              target.notify.send_line(&chat_line(&conn.handle, msg));
              ctx.log.write(&format!("{} whispered to {user}", conn.handle));
            }
            None => conn.notify.send_line(&whisper_user_offline(user)),
          }
        }
        _ => conn.notify.send_line(&whisper_usage()),
      }
      true
    }

    "/join" => {
      let room_name = rest.trim();
      if !valid_room(room_name) {
        conn.notify.send_line(&join_invalid_name());
        return true;
      }
      if let Some(old_name) = conn.current_room() {
        if let Some(old_room) = ctx.rooms.find_existing(&old_name) {
          ctx.rooms.leave(&old_room, conn);
        }
      }
      match ctx.rooms.join_or_create(room_name, &conn.handle, conn) {
        Ok(_room) => {
          conn.notify.send_line(&join_ok(&conn.handle, room_name));
          ctx.log.write(&format!("{} joined room '{room_name}'", conn.handle));
        }
        Err(ChatError::RoomRegistryFull) => conn.notify.send_line(&join_registry_full()),
        Err(ChatError::RoomFull(_)) => conn.notify.send_line(&join_room_full()),
        Err(e) => error!("session {}: join failed: {e}", conn.handle),
      }
      true
    }

    "/leave" => {
      if let Some(name) = conn.current_room() {
        if let Some(room) = ctx.rooms.find_existing(&name) {
          ctx.rooms.leave(&room, conn);
        } else {
          conn.clear_room_if(&name);
        }
        conn.notify.send_line(&leave_ok(&conn.handle, &name));
        ctx.log.write(&format!("{} left room '{name}'", conn.handle));
      } else {
        conn.notify.send_line(&leave_not_in_room(&conn.handle));
      }
      true
    }

    "/broadcast" => {
      if rest.trim().is_empty() {
        conn.notify.send_line(&broadcast_usage());
        return true;
      }
      match conn.current_room().and_then(|name| ctx.rooms.find_existing(&name).map(|r| (name, r))) {
        Some((name, room)) => {
          ctx.rooms.broadcast(&room, &conn.handle, rest);
          ctx.log.write(&format!("{} broadcast to '{name}'", conn.handle));
        }
        None => conn.notify.send_line(&broadcast_join_room_first()),
      }
      true
    }

    "/sendfile" => handle_sendfile(ctx, conn, rest, reader),

    _ => {
      conn.notify.send_line(&unknown_command());
      true
    }
  }
}

fn handle_sendfile(
  ctx: &Arc<SessionContext>,
  conn: &Arc<Connection>,
  rest: &str,
  reader: &mut BufReader<TcpStream>,
) -> bool {
  let mut toks = rest.split_whitespace();
  let (filename, user, size_str) = match (toks.next(), toks.next(), toks.next()) {
    (Some(f), Some(u), Some(s)) => (f, u, s),
    _ => {
      conn.notify.send_line(&sendfile_usage());
      return true;
    }
  };
  let size: u64 = match size_str.parse() {
    Ok(n) if n > 0 && n <= MAX_FILE_SIZE => n,
    _ => {
      conn.notify.send_line(&sendfile_invalid_size());
      return true;
    }
  };

  let mut payload = Vec::new();
  if payload.try_reserve_exact(size as usize).is_err() {
    conn.notify.send_line(&out_of_memory());
    return true;
  }
  payload.resize(size as usize, 0);

  if reader.read_exact(&mut payload).is_err() {
    // Transport error during payload read: terminates the session (§7).
    conn.notify.send_line(&sendfile_short_read());
    return false;
  }

  if ctx.queue.is_full() {
    conn.notify.send_line(&sendfile_queue_full(filename));
  }
  let item = FileItem::new(filename.to_string(), payload, conn.handle.clone(), user.to_string());
  ctx.queue.enqueue(item); // blocks while full (P3/I6)
  conn.notify.send_line(&sendfile_ok(filename, user, size));
  ctx.log.write(&format!(
    "{} queued file '{filename}' ({size} bytes) for {user}",
    conn.handle
  ));
  true
}
