//! Relay payload for a single `/sendfile` upload. Ownership of `payload` is
//! transferred wholesale between producer, queue and consumer; Rust's
//! ownership rules give invariant I5 (freed exactly once) for free, so no
//! manual `free`/refcount bookkeeping is needed.

use crate::protocol::MAX_FILENAME_LEN;

/// A pending file relay, or a sentinel used to signal worker shutdown.
pub enum FileItem {
  Data(FileData),
  /// Distinguished marker: a worker that dequeues this exits immediately.
  Sentinel,
}

pub struct FileData {
  /// Basename only, up to [`MAX_FILENAME_LEN`] bytes.
  pub filename: String,
  pub payload: Vec<u8>,
  pub sender: String,
  pub target: String,
}

impl FileItem {
  #[must_use]
  pub fn new(filename: String, payload: Vec<u8>, sender: String, target: String) -> Self {
    let filename = if filename.len() > MAX_FILENAME_LEN {
      let cut = filename
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= MAX_FILENAME_LEN)
        .last()
        .unwrap_or(0);
      filename[..cut].to_string()
    } else {
      filename
    };
    FileItem::Data(FileData {
      filename,
      payload,
      sender,
      target,
    })
  }

  #[must_use]
  pub fn is_sentinel(&self) -> bool {
    matches!(self, FileItem::Sentinel)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncates_overlong_filename() {
    let name = "a".repeat(300);
    let item = FileItem::new(name, vec![1, 2, 3], "Alice".into(), "Bob".into());
    match item {
      FileItem::Data(d) => assert_eq!(d.filename.len(), MAX_FILENAME_LEN),
      FileItem::Sentinel => panic!("expected data item"),
    }
  }

  #[test]
  fn truncates_overlong_filename_without_splitting_a_char() {
    // 3-byte UTF-8 char repeated so MAX_FILENAME_LEN (255) falls mid-codepoint.
    let name: String = "€".repeat(200); // 600 bytes total; byte 255 lands inside a char
    let item = FileItem::new(name, vec![], "Alice".into(), "Bob".into());
    match item {
      FileItem::Data(d) => {
        assert!(d.filename.len() <= MAX_FILENAME_LEN);
        assert!(d.filename.is_char_boundary(d.filename.len()));
      }
      FileItem::Sentinel => panic!("expected data item"),
    }
  }

  #[test]
  fn sentinel_is_recognized() {
    assert!(FileItem::Sentinel.is_sentinel());
    let item = FileItem::new("a.txt".into(), vec![], "x".into(), "y".into());
    assert!(!item.is_sentinel());
  }
}
