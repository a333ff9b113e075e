pub mod cli;
pub mod client;

pub use cli::Cli;
pub use client::Client;
