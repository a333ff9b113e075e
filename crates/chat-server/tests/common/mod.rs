use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use chat_server::{Config, Server};

pub struct TestServer {
  pub addr: std::net::SocketAddr,
  pub stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
  handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
  pub fn start(config_overrides: impl FnOnce(&mut Config)) -> Self {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config {
      port: 0,
      log_dir: dir.path().to_path_buf(),
      upload_queue_capacity: chat_common::protocol::DEFAULT_UPLOAD_QUEUE_CAPACITY,
      upload_workers: 2,
      max_connections: chat_common::protocol::DEFAULT_MAX_CONNECTIONS,
      max_rooms: chat_common::protocol::DEFAULT_MAX_ROOMS,
      room_capacity: chat_common::protocol::DEFAULT_ROOM_CAPACITY,
    };
    config_overrides(&mut config);

    let server = Server::bind(config).expect("bind");
    let addr = server.local_addr().expect("local_addr");
    let stop = server.stop_handle();
    let handle = thread::spawn(move || {
      server.run().expect("server run");
    });
    // Give the accept loop a moment to start polling.
    thread::sleep(Duration::from_millis(50));
    // Keep the tempdir alive for the server's lifetime by leaking it; tests
    // are short-lived processes so this is not a real leak concern.
    std::mem::forget(dir);
    Self { addr, stop, handle: Some(handle) }
  }

  pub fn stop(&mut self) {
    self.stop.store(true, std::sync::atomic::Ordering::SeqCst);
    if let Some(h) = self.handle.take() {
      let _ = h.join();
    }
  }
}

impl Drop for TestServer {
  fn drop(&mut self) {
    self.stop();
  }
}

pub struct TestClient {
  stream: TcpStream,
  reader: BufReader<TcpStream>,
}

impl TestClient {
  pub fn connect(addr: std::net::SocketAddr, handle: &str) -> Self {
    let stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let reader = BufReader::new(stream.try_clone().unwrap());
    let mut client = Self { stream, reader };
    client.send_line(handle);
    let reply = client.read_line();
    assert!(reply.starts_with("[OK]"), "handshake rejected: {reply}");
    client
  }

  /// Connects without asserting the handshake succeeds; returns the raw
  /// reply line for the caller to inspect.
  pub fn connect_raw(addr: std::net::SocketAddr, handle: &str) -> (Self, String) {
    let stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let reader = BufReader::new(stream.try_clone().unwrap());
    let mut client = Self { stream, reader };
    client.send_line(handle);
    let reply = client.read_line();
    (client, reply)
  }

  pub fn send_line(&mut self, line: &str) {
    self.stream.write_all(line.as_bytes()).unwrap();
    self.stream.write_all(b"\n").unwrap();
    self.stream.flush().unwrap();
  }

  pub fn send_file_command(&mut self, filename: &str, user: &str, payload: &[u8]) {
    self.send_line(&format!("/sendfile {filename} {user} {}", payload.len()));
    self.stream.write_all(payload).unwrap();
    self.stream.flush().unwrap();
  }

  pub fn read_line(&mut self) -> String {
    let mut line = String::new();
    self.reader.read_line(&mut line).expect("read_line");
    line.trim_end_matches(['\n', '\r']).to_string()
  }

  pub fn read_exact(&mut self, n: usize) -> Vec<u8> {
    use std::io::Read;
    let mut buf = vec![0u8; n];
    self.reader.read_exact(&mut buf).expect("read_exact");
    buf
  }

  pub fn raw_stream(&mut self) -> &mut TcpStream {
    &mut self.stream
  }
}
