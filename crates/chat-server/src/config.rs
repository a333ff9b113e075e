//! CLI configuration surface (C11). Every flag defaults to the constant the
//! spec hardcodes, so `chat-server <port>` alone is spec-conformant.

use std::path::PathBuf;

use chat_common::protocol::{
  DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_ROOMS, DEFAULT_ROOM_CAPACITY, DEFAULT_UPLOAD_QUEUE_CAPACITY,
  DEFAULT_UPLOAD_WORKERS,
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "chat-server", about = "Multi-user TCP chat server", version)]
pub struct Config {
  /// TCP port to listen on.
  pub port: u16,

  /// Directory business-event log files are written to.
  #[arg(long, default_value = "logs")]
  pub log_dir: PathBuf,

  /// Capacity of the bounded file-upload queue.
  #[arg(long, default_value_t = DEFAULT_UPLOAD_QUEUE_CAPACITY)]
  pub upload_queue_capacity: usize,

  /// Number of upload relay worker threads.
  #[arg(long, default_value_t = DEFAULT_UPLOAD_WORKERS)]
  pub upload_workers: usize,

  /// Maximum simultaneous live connections.
  #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
  pub max_connections: usize,

  /// Maximum simultaneous live rooms.
  #[arg(long, default_value_t = DEFAULT_MAX_ROOMS)]
  pub max_rooms: usize,

  /// Maximum members per room.
  #[arg(long, default_value_t = DEFAULT_ROOM_CAPACITY)]
  pub room_capacity: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bare_port_fills_in_spec_defaults() {
    let cfg = Config::parse_from(["chat-server", "4000"]);
    assert_eq!(cfg.port, 4000);
    assert_eq!(cfg.log_dir, PathBuf::from("logs"));
    assert_eq!(cfg.upload_queue_capacity, DEFAULT_UPLOAD_QUEUE_CAPACITY);
    assert_eq!(cfg.upload_workers, DEFAULT_UPLOAD_WORKERS);
    assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
    assert_eq!(cfg.max_rooms, DEFAULT_MAX_ROOMS);
    assert_eq!(cfg.room_capacity, DEFAULT_ROOM_CAPACITY);
  }

  #[test]
  fn flags_override_defaults() {
    let cfg = Config::parse_from(["chat-server", "4000", "--upload-workers", "2", "--room-capacity", "3"]);
    assert_eq!(cfg.upload_workers, 2);
    assert_eq!(cfg.room_capacity, 3);
  }
}
