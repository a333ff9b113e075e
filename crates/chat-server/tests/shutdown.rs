mod common;

use std::io::Read;
use std::sync::atomic::Ordering;

use common::{TestClient, TestServer};

#[test]
fn shutdown_notifies_clients_and_closes_sockets() {
  let mut server = TestServer::start(|_| {});
  let mut alice = TestClient::connect(server.addr, "Alice");
  let mut bob = TestClient::connect(server.addr, "Bob");

  // One file queued for an offline target, per scenario 6.
  alice.send_file_command("a.txt", "Ghost", b"xyz");
  assert!(alice.read_line().starts_with("[OK] File 'a.txt' queued"));

  server.stop.store(true, Ordering::SeqCst);

  assert_eq!(alice.read_line(), "[SERVER] shutting down. Goodbye.");
  assert_eq!(bob.read_line(), "[SERVER] shutting down. Goodbye.");

  // The socket should now be closed: a further read observes EOF.
  let mut buf = [0u8; 1];
  let n = alice.read_raw(&mut buf);
  assert_eq!(n, 0);

  server.stop();
}

trait ReadRaw {
  fn read_raw(&mut self, buf: &mut [u8]) -> usize;
}

impl ReadRaw for TestClient {
  fn read_raw(&mut self, buf: &mut [u8]) -> usize {
    self.raw_stream().read(buf).unwrap_or(0)
  }
}
