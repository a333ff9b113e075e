use chat_client::{Cli, Client};
use clap::Parser;

fn main() -> anyhow::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

  let cli = Cli::parse();
  let client = Client::connect(&cli)?;
  client.run()
}
