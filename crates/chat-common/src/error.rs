//! Crate-wide error taxonomy. Variants map one-to-one onto the kinds a
//! session loop turns into a client-visible `[ERROR]`/`[WARN]` line; see
//! the error handling design for the surfaced-as mapping.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
  #[error("invalid handle '{0}'")]
  InvalidHandle(String),

  #[error("invalid room name '{0}'")]
  InvalidRoomName(String),

  #[error("missing arguments for command")]
  MissingArgs,

  #[error("handle '{0}' already in use")]
  HandleTaken(String),

  #[error("connection registry is full")]
  RegistryFull,

  #[error("room registry is full")]
  RoomRegistryFull,

  #[error("room '{0}' is full")]
  RoomFull(String),

  #[error("upload queue is full")]
  QueueFull,

  #[error("user '{0}' not online")]
  UserNotFound(String),

  #[error("transport error: {0}")]
  Transport(#[from] std::io::Error),

  #[error("failed to receive full file data")]
  ShortFileRead,

  #[error("server out of memory. Try later")]
  Resource,

  #[error("file size {0} out of bounds")]
  InvalidFileSize(u64),
}

pub type Result<T> = std::result::Result<T, ChatError>;
