//! The ASCII, line-delimited wire protocol shared by the server and client.
//!
//! Lines are terminated with `\n` and are at most [`MAX_LINE_LEN`] bytes,
//! except the raw bytes that follow a `/sendfile` header or a `[FILE ...]`
//! notification, which carry no line terminator of their own.

/// Maximum length of a command or status line, not counting file payloads.
pub const MAX_LINE_LEN: usize = 4096;

/// Maximum size of a single uploaded file, in bytes (3 MiB).
pub const MAX_FILE_SIZE: u64 = 3 * 1024 * 1024;

/// Default member cap for a single room.
pub const DEFAULT_ROOM_CAPACITY: usize = 15;

/// Default ceiling on live connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Default ceiling on live rooms.
pub const DEFAULT_MAX_ROOMS: usize = 256;

/// Default bounded upload queue capacity. Kept independent from
/// [`DEFAULT_ROOM_CAPACITY`] even though the source reused one constant for
/// both: the two are unrelated quantities.
pub const DEFAULT_UPLOAD_QUEUE_CAPACITY: usize = 15;

/// Default number of upload relay workers.
pub const DEFAULT_UPLOAD_WORKERS: usize = 5;

/// Maximum basename length for an uploaded file (excluding terminator).
pub const MAX_FILENAME_LEN: usize = 255;

/// Accept backlog used when listening.
pub const LISTEN_BACKLOG: u32 = 10;

#[must_use]
pub fn handshake_ok() -> String {
  "[OK] Username accepted.".to_string()
}

#[must_use]
pub fn handshake_rejected_taken(handle: &str) -> String {
  format!("[ERROR] Handle '{handle}' is already taken.")
}

#[must_use]
pub fn handshake_rejected_invalid() -> String {
  "[ERROR] Invalid handle. Use 1-16 alphanumeric characters.".to_string()
}

#[must_use]
pub fn handshake_rejected_full() -> String {
  "[ERROR] Server is full. Try again later.".to_string()
}

#[must_use]
pub fn exit_reply() -> String {
  "[INFO] Server is shutting down your connection.".to_string()
}

#[must_use]
pub fn whisper_user_offline(user: &str) -> String {
  format!("[ERROR] User '{user}' not online.")
}

#[must_use]
pub fn whisper_usage() -> String {
  "[ERROR] Usage: /whisper <user> <msg>".to_string()
}

#[must_use]
pub fn join_invalid_name() -> String {
  "[ERROR] Invalid room name. Use 1-32 alphanumeric characters.".to_string()
}

#[must_use]
pub fn join_registry_full() -> String {
  "[WARN] Room slots are full. Try again later.".to_string()
}

#[must_use]
pub fn join_room_full() -> String {
  "[WARN] Room is full".to_string()
}

#[must_use]
pub fn join_ok(handle: &str, room: &str) -> String {
  format!("[OK] User \"{handle}\" joined the room: {room}")
}

#[must_use]
pub fn leave_ok(handle: &str, room: &str) -> String {
  format!("[INFO] User \"{handle}\" left the room: {room}")
}

#[must_use]
pub fn leave_not_in_room(handle: &str) -> String {
  format!("[INFO] User \"{handle}\" is not in any room")
}

#[must_use]
pub fn broadcast_join_room_first() -> String {
  "[ERROR] Join a room first".to_string()
}

#[must_use]
pub fn broadcast_usage() -> String {
  "[ERROR] Usage: /broadcast <msg>".to_string()
}

#[must_use]
pub fn sendfile_queue_full(filename: &str) -> String {
  format!("[INFO] Upload queue is full. Your file '{filename}' will be queued.")
}

#[must_use]
pub fn sendfile_ok(filename: &str, user: &str, size: u64) -> String {
  format!("[OK] File '{filename}' queued for sending to {user}. Size: {size} bytes.")
}

#[must_use]
pub fn sendfile_short_read() -> String {
  "[ERROR] Failed to receive full file data.".to_string()
}

#[must_use]
pub fn sendfile_usage() -> String {
  "[ERROR] Usage: /sendfile <filename> <user> <size>".to_string()
}

#[must_use]
pub fn sendfile_invalid_size() -> String {
  format!("[ERROR] File size must be in (0, {MAX_FILE_SIZE}] bytes.")
}

#[must_use]
pub fn out_of_memory() -> String {
  "[ERROR] Server out of memory. Try later.".to_string()
}

#[must_use]
pub fn unknown_command() -> String {
  "[ERROR] Unknown command.".to_string()
}

#[must_use]
pub fn server_shutdown_notice() -> String {
  "[SERVER] shutting down. Goodbye.".to_string()
}

/// Formats a room broadcast or whisper delivery line: `[<from>] <msg>`.
#[must_use]
pub fn chat_line(from: &str, msg: &str) -> String {
  format!("[{from}] {msg}")
}

/// Formats the header line that precedes a relayed file's raw payload bytes:
/// `[FILE <basename> <size> <sender>]`.
#[must_use]
pub fn file_header(basename: &str, size: u64, sender: &str) -> String {
  format!("[FILE {basename} {size} {sender}]")
}
