//! Shared types for the chat server and client: validation predicates, the
//! line-based wire protocol, file-relay payloads and the crate-wide error
//! taxonomy.

pub mod error;
pub mod fileitem;
pub mod protocol;
pub mod validate;

pub use error::ChatError;
pub use fileitem::FileItem;
