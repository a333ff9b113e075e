use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "chat-client", about = "Interactive chat client", version)]
pub struct Cli {
  /// Server host.
  #[arg(long, default_value = "127.0.0.1")]
  pub host: String,

  /// Server port.
  pub port: u16,

  /// Handle to request at handshake.
  pub handle: String,

  /// Directory incoming files are saved to.
  #[arg(long, default_value = "downloads")]
  pub download_dir: PathBuf,
}
