//! Room registry and rooms (C5). Lock order when both are needed:
//! registry first, then the room itself. `join_or_create` and the
//! destruction check in `leave` both hold the registry lock across their
//! full decision (lookup-or-create-and-insert / re-check-then-remove), so
//! they always serialize cleanly against one another.

use std::collections::HashMap;
use std::sync::Arc;

use chat_common::ChatError;
use chat_common::protocol::chat_line;
use log::info;
use parking_lot::Mutex;

use crate::registry::Connection;

pub struct Room {
  pub name: String,
  members: Mutex<Vec<Arc<Connection>>>,
  capacity: usize,
}

impl Room {
  #[must_use]
  pub fn member_count(&self) -> usize {
    self.members.lock().len()
  }
}

pub struct RoomRegistry {
  inner: Mutex<HashMap<String, Arc<Room>>>,
  max_rooms: usize,
  room_capacity: usize,
}

impl RoomRegistry {
  #[must_use]
  pub fn new(max_rooms: usize, room_capacity: usize) -> Self {
    Self {
      inner: Mutex::new(HashMap::new()),
      max_rooms,
      room_capacity,
    }
  }

  /// Returns the existing room by name without creating one.
  #[must_use]
  pub fn find_existing(&self, name: &str) -> Option<Arc<Room>> {
    self.inner.lock().get(name).cloned()
  }

  /// Finds or creates the room named `name` and joins `conn` to it (I3),
  /// setting the connection's back-pointer on success. The lookup-or-create
  /// step and the capacity-checked member insert happen under the same
  /// held registry lock, so a concurrent `leave` can never observe the room
  /// as empty and destroy it while this join is in flight (I2/I4): `leave`
  /// re-checks emptiness only after it too acquires the registry lock, so
  /// the two operations always serialize against each other cleanly.
  pub fn join_or_create(&self, name: &str, creator: &str, conn: &Arc<Connection>) -> Result<Arc<Room>, ChatError> {
    let map = &mut *self.inner.lock();
    let room = match map.get(name) {
      Some(room) => room.clone(),
      None => {
        if map.len() >= self.max_rooms {
          return Err(ChatError::RoomRegistryFull);
        }
        let room = Arc::new(Room {
          name: name.to_string(),
          members: Mutex::new(Vec::new()),
          capacity: self.room_capacity,
        });
        info!("room '{name}' created by {creator}");
        map.insert(name.to_string(), room.clone());
        room
      }
    };
    let mut members = room.members.lock();
    if members.len() >= room.capacity {
      return Err(ChatError::RoomFull(room.name.clone()));
    }
    members.push(conn.clone());
    drop(members);
    conn.set_room(Some(room.name.clone()));
    Ok(room)
  }

  /// Removes `conn` from the room; destroys the room if it becomes empty
  /// (I4). Clears the connection's back-pointer iff it still refers to this
  /// room.
  pub fn leave(&self, room: &Arc<Room>, conn: &Arc<Connection>) {
    let empty = {
      let mut members = room.members.lock();
      members.retain(|c| !Arc::ptr_eq(c, conn));
      members.is_empty()
    };
    conn.clear_room_if(&room.name);
    if empty {
      let mut map = self.inner.lock();
      if map
        .get(&room.name)
        .is_some_and(|r| Arc::ptr_eq(r, room) && r.member_count() == 0)
      {
        map.remove(&room.name);
        info!("room '{}' destroyed (empty)", room.name);
      }
    }
  }

  /// Fans a line out to every room member's notification channel.
  /// Best-effort per member; never fails the call (P6, §4.5).
  pub fn broadcast(&self, room: &Arc<Room>, from_handle: &str, text: &str) {
    let line = chat_line(from_handle, text);
    let members = room.members.lock();
    for member in members.iter() {
      member.notify.send_line(&line);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notify::make_notify_channel;
  use crate::registry::ConnectionRegistry;
  use std::net::{IpAddr, Ipv4Addr, SocketAddr};

  fn addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1)
  }

  fn conn(registry: &ConnectionRegistry, handle: &str) -> Arc<Connection> {
    let (tx, _rx) = make_notify_channel();
    registry.reserve(handle, addr(), tx).unwrap()
  }

  #[test]
  fn join_or_create_reuses_existing_room() {
    let registry = ConnectionRegistry::new(256);
    let rooms = RoomRegistry::new(256, 15);
    let alice = conn(&registry, "Alice");
    let bob = conn(&registry, "Bob");
    let a = rooms.join_or_create("main", "Alice", &alice).unwrap();
    let b = rooms.join_or_create("main", "Bob", &bob).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.member_count(), 2);
  }

  #[test]
  fn room_registry_full_is_reported() {
    let registry = ConnectionRegistry::new(256);
    let rooms = RoomRegistry::new(1, 15);
    let alice = conn(&registry, "Alice");
    let bob = conn(&registry, "Bob");
    rooms.join_or_create("main", "Alice", &alice).unwrap();
    let err = rooms.join_or_create("other", "Bob", &bob).unwrap_err();
    assert!(matches!(err, ChatError::RoomRegistryFull));
  }

  #[test]
  fn join_enforces_capacity() {
    let registry = ConnectionRegistry::new(256);
    let rooms = RoomRegistry::new(256, 1);
    let alice = conn(&registry, "Alice");
    rooms.join_or_create("main", "Alice", &alice).unwrap();
    let bob = conn(&registry, "Bob");
    let err = rooms.join_or_create("main", "Bob", &bob).unwrap_err();
    assert!(matches!(err, ChatError::RoomFull(_)));
  }

  #[test]
  fn leave_destroys_empty_room() {
    let registry = ConnectionRegistry::new(256);
    let rooms = RoomRegistry::new(256, 15);
    let alice = conn(&registry, "Alice");
    let room = rooms.join_or_create("tmp", "Alice", &alice).unwrap();
    rooms.leave(&room, &alice);
    assert!(rooms.find_existing("tmp").is_none());
    assert_eq!(alice.current_room(), None);
  }

  #[test]
  fn leave_keeps_nonempty_room() {
    let registry = ConnectionRegistry::new(256);
    let rooms = RoomRegistry::new(256, 15);
    let alice = conn(&registry, "Alice");
    let room = rooms.join_or_create("main", "Alice", &alice).unwrap();
    let bob = conn(&registry, "Bob");
    rooms.join_or_create("main", "Bob", &bob).unwrap();
    rooms.leave(&room, &alice);
    assert!(rooms.find_existing("main").is_some());
    assert_eq!(room.member_count(), 1);
  }

  #[test]
  fn join_or_create_cannot_orphan_a_membership_after_a_concurrent_leave() {
    // Regression test for the race where find-or-create and the member
    // insert used to run under two separate lock acquisitions: a last-member
    // leave could destroy the room in between, leaving the joiner's
    // `current_room` pointing at a room no longer reachable from the
    // registry. Simulated here sequentially since the fix's correctness
    // argument is about what the registry lock serializes, not timing.
    let registry = ConnectionRegistry::new(256);
    let rooms = RoomRegistry::new(256, 15);
    let alice = conn(&registry, "Alice");
    let room = rooms.join_or_create("main", "Alice", &alice).unwrap();
    rooms.leave(&room, &alice);
    assert!(rooms.find_existing("main").is_none());

    let bob = conn(&registry, "Bob");
    let rejoined = rooms.join_or_create("main", "Bob", &bob).unwrap();
    assert_eq!(bob.current_room().as_deref(), Some("main"));
    let found = rooms.find_existing("main").unwrap();
    assert!(Arc::ptr_eq(&found, &rejoined));
  }
}
