use chat_server::{Config, Server};
use clap::Parser;

fn main() -> anyhow::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let config = Config::parse();
  let server = Server::bind(config)?;
  server.run()
}
