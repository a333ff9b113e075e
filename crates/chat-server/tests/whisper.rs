mod common;

use common::{TestClient, TestServer};

#[test]
fn whisper_round_trip_then_offline_after_exit() {
  let server = TestServer::start(|_| {});
  let mut alice = TestClient::connect(server.addr, "Alice");
  let mut bob = TestClient::connect(server.addr, "Bob");

  alice.send_line("/whisper Bob hi");
  assert_eq!(bob.read_line(), "[Alice] hi");

  bob.send_line("/exit");
  assert_eq!(bob.read_line(), "[INFO] Server is shutting down your connection.");

  // Give the server a moment to tear the connection down and free the handle.
  std::thread::sleep(std::time::Duration::from_millis(100));

  alice.send_line("/whisper Bob x");
  assert_eq!(alice.read_line(), "[ERROR] User 'Bob' not online.");
}

#[test]
fn whisper_missing_args_is_usage_error() {
  let server = TestServer::start(|_| {});
  let mut alice = TestClient::connect(server.addr, "Alice");
  alice.send_line("/whisper Bob");
  assert_eq!(alice.read_line(), "[ERROR] Usage: /whisper <user> <msg>");
}

#[test]
fn whisper_to_unknown_user_is_reported() {
  let server = TestServer::start(|_| {});
  let mut alice = TestClient::connect(server.addr, "Alice");
  alice.send_line("/whisper Ghost hi");
  assert_eq!(alice.read_line(), "[ERROR] User 'Ghost' not online.");
}
