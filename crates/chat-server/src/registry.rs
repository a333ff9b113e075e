//! Process-wide connection registry (C4). Guarded by a single lock; lookup,
//! insert and remove never block on per-connection activity since they only
//! ever touch the map, never a connection's socket or notification channel.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use chat_common::ChatError;
use parking_lot::Mutex;

use crate::notify::NotifySender;

/// One live client. Mutated only by its owning session loop, except for the
/// room back-pointer, which the room registry updates under the room lock.
pub struct Connection {
  pub handle: String,
  pub addr: SocketAddr,
  pub notify: NotifySender,
  room: Mutex<Option<String>>,
}

impl Connection {
  #[must_use]
  pub fn current_room(&self) -> Option<String> {
    self.room.lock().clone()
  }

  pub fn set_room(&self, name: Option<String>) {
    *self.room.lock() = name;
  }

  /// Clears the back-pointer only if it still refers to `name`, matching the
  /// room registry's leave contract (I2).
  pub fn clear_room_if(&self, name: &str) {
    let mut guard = self.room.lock();
    if guard.as_deref() == Some(name) {
      *guard = None;
    }
  }
}

pub struct ConnectionRegistry {
  inner: Mutex<HashMap<String, Arc<Connection>>>,
  max_connections: usize,
}

impl ConnectionRegistry {
  #[must_use]
  pub fn new(max_connections: usize) -> Self {
    Self {
      inner: Mutex::new(HashMap::new()),
      max_connections,
    }
  }

  /// Allocates a fresh slot for `handle`, failing with `HandleTaken` or
  /// `RegistryFull` (I1, P3).
  pub fn reserve(
    &self,
    handle: &str,
    addr: SocketAddr,
    notify: NotifySender,
  ) -> Result<Arc<Connection>, ChatError> {
    let mut map = self.inner.lock();
    if map.contains_key(handle) {
      return Err(ChatError::HandleTaken(handle.to_string()));
    }
    if map.len() >= self.max_connections {
      return Err(ChatError::RegistryFull);
    }
    let conn = Arc::new(Connection {
      handle: handle.to_string(),
      addr,
      notify,
      room: Mutex::new(None),
    });
    map.insert(handle.to_string(), conn.clone());
    Ok(conn)
  }

  #[must_use]
  pub fn lookup(&self, handle: &str) -> Option<Arc<Connection>> {
    self.inner.lock().get(handle).cloned()
  }

  pub fn remove(&self, handle: &str) -> Option<Arc<Connection>> {
    self.inner.lock().remove(handle)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Shutdown-only enumeration used once at teardown to notify and close
  /// every live socket.
  #[must_use]
  pub fn all(&self) -> Vec<Arc<Connection>> {
    self.inner.lock().values().cloned().collect()
  }
}
