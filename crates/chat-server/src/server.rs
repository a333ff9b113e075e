//! Acceptor and lifecycle (C9): listens, performs the handshake, spawns
//! session loops, and orchestrates startup/shutdown.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use chat_common::ChatError;
use chat_common::protocol::{
  handshake_ok, handshake_rejected_full, handshake_rejected_invalid, handshake_rejected_taken,
  server_shutdown_notice,
};
use chat_common::validate::valid_handle;
use log::{error, info, warn};

use crate::config::Config;
use crate::logsink::LogSink;
use crate::notify::make_notify_channel;
use crate::queue::FileQueue;
use crate::registry::{Connection, ConnectionRegistry};
use crate::room::RoomRegistry;
use crate::session::{self, SessionContext};
use crate::worker;

/// How long the accept loop sleeps between polls of a non-blocking listener.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Server {
  listener: TcpListener,
  log: Arc<LogSink>,
  queue: Arc<FileQueue>,
  ctx: Arc<SessionContext>,
  workers: Vec<JoinHandle<()>>,
  stop: Arc<AtomicBool>,
}

impl Server {
  /// Startup sequence: open the log sink, create the upload queue and its
  /// workers, install the interrupt handler, then bind and listen.
  pub fn bind(config: Config) -> anyhow::Result<Self> {
    let log = Arc::new(LogSink::open(&config.log_dir).context("opening business log")?);
    log.write(&format!("server starting on port {}", config.port));

    let connections = Arc::new(ConnectionRegistry::new(config.max_connections));
    let rooms = Arc::new(RoomRegistry::new(config.max_rooms, config.room_capacity));
    let queue = Arc::new(FileQueue::new(config.upload_queue_capacity));

    let workers = worker::spawn_upload_workers(config.upload_workers, queue.clone(), connections.clone(), log.clone());

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_handler = stop.clone();
    ctrlc::set_handler(move || {
      stop_for_handler.store(true, Ordering::SeqCst);
    })
    .context("installing interrupt handler")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).with_context(|| format!("binding {addr}"))?;
    listener.set_nonblocking(true).context("setting listener non-blocking")?;

    let ctx = Arc::new(SessionContext::new(connections, rooms, queue.clone(), log.clone()));

    Ok(Self {
      listener,
      log,
      queue,
      ctx,
      workers,
      stop,
    })
  }

  /// The address actually bound, useful when `config.port` was 0.
  pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
    self.listener.local_addr()
  }

  /// A clone of the shutdown flag; setting it causes a running `run()` to
  /// drain and return on its next accept-loop poll. Intended for tests and
  /// embedding code that wants programmatic shutdown instead of a signal.
  pub fn stop_handle(&self) -> Arc<AtomicBool> {
    self.stop.clone()
  }

  /// Runs the accept loop until `stop` is observed, then drains and joins
  /// everything before returning.
  pub fn run(mut self) -> anyhow::Result<()> {
    let mut sessions = Vec::new();
    while !self.stop.load(Ordering::Acquire) {
      match self.listener.accept() {
        Ok((stream, addr)) => {
          if let Some(handle) = self.accept_one(stream, addr) {
            sessions.push(handle);
          }
        }
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
          thread::sleep(ACCEPT_POLL_INTERVAL);
        }
        Err(e) => {
          error!("accept error: {e}");
        }
      }
    }
    self.shutdown(sessions);
    Ok(())
  }

  /// Performs the handshake and, on success, spawns the session loop. The
  /// acceptor blocks here until the session signals it has completed local
  /// initialization (see `session::spawn`), which serializes handshakes but
  /// guarantees every early log line carries the right identity.
  fn accept_one(&self, mut stream: TcpStream, addr: SocketAddr) -> Option<JoinHandle<()>> {
    if let Err(e) = stream.set_nonblocking(false) {
      warn!("accept {addr}: failed to set blocking mode: {e}");
      return None;
    }
    let (conn, notify_rx) = self.handshake(&mut stream, addr)?;
    Some(session::spawn(self.ctx.clone(), stream, conn, notify_rx))
  }

  fn handshake(
    &self,
    stream: &mut TcpStream,
    addr: SocketAddr,
  ) -> Option<(Arc<Connection>, crate::notify::NotifyReceiver)> {
    use std::io::BufRead;

    let clone = stream.try_clone().ok()?;
    let mut reader = std::io::BufReader::new(clone);
    loop {
      let mut line = String::new();
      match reader.read_line(&mut line) {
        Ok(0) => return None, // disconnected mid-handshake
        Ok(_) => {}
        Err(e) => {
          warn!("handshake {addr}: read error: {e}");
          return None;
        }
      }
      let handle = line.trim_end_matches(['\n', '\r']).to_string();
      if !valid_handle(&handle) {
        send_line(stream, &handshake_rejected_invalid());
        continue;
      }
      let (tx, rx) = make_notify_channel();
      match self.ctx.connections.reserve(&handle, addr, tx) {
        Ok(conn) => {
          send_line(stream, &handshake_ok());
          self.log.write(&format!("{handle} connected from {addr}"));
          return Some((conn, rx));
        }
        Err(ChatError::HandleTaken(_)) => send_line(stream, &handshake_rejected_taken(&handle)),
        Err(ChatError::RegistryFull) => {
          send_line(stream, &handshake_rejected_full());
          return None;
        }
        Err(e) => {
          error!("handshake {addr}: unexpected error: {e}");
          return None;
        }
      }
    }
  }

  /// Shutdown sequence: drain the upload queue, notify and close every live
  /// connection, join workers then sessions, close the log.
  fn shutdown(self, sessions: Vec<JoinHandle<()>>) {
    info!("shutdown: draining {} upload worker(s)", self.workers.len());
    self.queue.shutdown(self.workers.len());

    let live = self.ctx.connections.all();
    info!("shutdown: notifying {} live connection(s)", live.len());
    for conn in &live {
      conn.notify.send_line(&server_shutdown_notice());
      conn.notify.send_close();
    }
    self.ctx.shutdown_all_sockets();

    for w in self.workers {
      let _ = w.join();
    }
    for s in sessions {
      let _ = s.join();
    }

    self.log.write("server shutdown complete");
    self.log.close();
  }
}

fn send_line(stream: &mut TcpStream, line: &str) {
  if stream.write_all(line.as_bytes()).is_err() {
    return;
  }
  let _ = stream.write_all(b"\n");
  let _ = stream.flush();
}
