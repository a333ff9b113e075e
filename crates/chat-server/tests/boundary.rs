mod common;

use common::{TestClient, TestServer};

#[test]
fn duplicate_handle_is_rejected_and_can_retry() {
  let server = TestServer::start(|_| {});
  let _alice = TestClient::connect(server.addr, "Alice");
  let (_client, reply) = TestClient::connect_raw(server.addr, "Alice");
  assert_eq!(reply, "[ERROR] Handle 'Alice' is already taken.");
}

#[test]
fn invalid_handle_is_rejected_with_retry_prompt() {
  let server = TestServer::start(|_| {});
  let (mut client, reply) = TestClient::connect_raw(server.addr, "not valid!");
  assert_eq!(reply, "[ERROR] Invalid handle. Use 1-16 alphanumeric characters.");
  // The same socket can retry the handshake.
  client.send_line("Retry1");
  assert_eq!(client.read_line(), "[OK] Username accepted.");
}

#[test]
fn server_full_rejects_the_connection_past_the_configured_ceiling() {
  let server = TestServer::start(|c| c.max_connections = 1);
  let _alice = TestClient::connect(server.addr, "Alice");
  let (_bob, reply) = TestClient::connect_raw(server.addr, "Bob");
  assert_eq!(reply, "[ERROR] Server is full. Try again later.");
}
