//! Pure predicates for well-formed handles and room names. Never mutate
//! state or allocate.

pub const HANDLE_MAX_LEN: usize = 16;
pub const ROOM_NAME_MAX_LEN: usize = 32;

#[must_use]
pub fn valid_handle(s: &str) -> bool {
  !s.is_empty() && s.len() <= HANDLE_MAX_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[must_use]
pub fn valid_room(s: &str) -> bool {
  !s.is_empty() && s.len() <= ROOM_NAME_MAX_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
