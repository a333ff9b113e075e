pub mod config;
pub mod logsink;
pub mod notify;
pub mod queue;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod worker;

pub use config::Config;
pub use server::Server;
