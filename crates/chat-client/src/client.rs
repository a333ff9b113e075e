//! Minimal interactive terminal client. Grounded on the same reader/writer
//! thread split the server's session loop uses: one thread drains the
//! socket to stdout (and saves incoming file payloads), the other drains
//! stdin to the socket. No raw terminal mode, no local line editing beyond
//! what the terminal already provides.

use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::thread;

use anstream::println as aprintln;
use log::{error, warn};
use owo_colors::OwoColorize;

use crate::cli::Cli;

/// Extensions the client offers uploads under; the server does not enforce
/// this (§6), it is a client-side nicety only.
const OFFERABLE_EXTENSIONS: &[&str] = &["txt", "pdf", "jpg", "png"];

pub struct Client {
  stream: TcpStream,
  download_dir: PathBuf,
}

impl Client {
  /// Connects and retries the handshake with a fresh handle typed on stdin
  /// whenever the server rejects one.
  pub fn connect(cli: &Cli) -> anyhow::Result<Self> {
    let mut stream = TcpStream::connect((cli.host.as_str(), cli.port))?;
    let mut handle = cli.handle.clone();
    loop {
      writeln!(stream, "{handle}")?;
      let mut reply = String::new();
      let mut reader = BufReader::new(stream.try_clone()?);
      reader.read_line(&mut reply)?;
      let reply = reply.trim_end();
      if reply.starts_with("[OK]") {
        aprintln!("{}", reply.green());
        break;
      }
      aprintln!("{}", reply.red());
      println!("enter a different handle:");
      let mut line = String::new();
      io::stdin().read_line(&mut line)?;
      handle = line.trim().to_string();
    }
    fs::create_dir_all(&cli.download_dir)?;
    Ok(Self {
      stream,
      download_dir: cli.download_dir.clone(),
    })
  }

  /// Runs until the socket closes or stdin reaches EOF.
  pub fn run(self) -> anyhow::Result<()> {
    let reader_stream = self.stream.try_clone()?;
    let download_dir = self.download_dir.clone();
    let reader = thread::Builder::new()
      .name("client-reader".into())
      .spawn(move || reader_loop(reader_stream, &download_dir))?;

    writer_loop(self.stream)?;
    let _ = reader.join();
    Ok(())
  }
}

fn reader_loop(stream: TcpStream, download_dir: &Path) {
  let mut reader = BufReader::new(stream);
  let mut line = String::new();
  loop {
    line.clear();
    match reader.read_line(&mut line) {
      Ok(0) => {
        println!("connection closed by server");
        break;
      }
      Ok(_) => {}
      Err(e) => {
        error!("read error: {e}");
        break;
      }
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    if let Some(header) = parse_file_header(trimmed) {
      if let Err(e) = receive_file(&mut reader, download_dir, &header) {
        error!("failed to save incoming file '{}': {e}", header.basename);
      }
      continue;
    }
    println!("{trimmed}");
  }
}

struct FileHeader {
  basename: String,
  size: u64,
  sender: String,
}

/// Parses `[FILE <basename> <size> <sender>]`.
fn parse_file_header(line: &str) -> Option<FileHeader> {
  let inner = line.strip_prefix("[FILE ")?.strip_suffix(']')?;
  let mut parts = inner.rsplitn(3, ' ');
  let sender = parts.next()?.to_string();
  let size: u64 = parts.next()?.parse().ok()?;
  let basename = parts.next()?.to_string();
  Some(FileHeader { basename, size, sender })
}

fn receive_file(reader: &mut BufReader<TcpStream>, download_dir: &Path, header: &FileHeader) -> anyhow::Result<()> {
  let mut payload = vec![0u8; header.size as usize];
  reader.read_exact(&mut payload)?;
  let path = download_dir.join(&header.basename);
  fs::write(&path, &payload)?;
  println!("received '{}' from {} ({} bytes) -> {}", header.basename, header.sender, header.size, path.display());
  Ok(())
}

fn writer_loop(mut stream: TcpStream) -> anyhow::Result<()> {
  let stdin = io::stdin();
  for line in stdin.lock().lines() {
    let line = line?;
    if line.trim() == "/exit" {
      writeln!(stream, "{line}")?;
      break;
    }
    if let Some(rest) = line.strip_prefix("/sendfile ") {
      if let Err(e) = send_file(&mut stream, rest) {
        error!("sendfile failed: {e}");
      }
      continue;
    }
    writeln!(stream, "{line}")?;
  }
  Ok(())
}

/// `rest` is `<file> <user>`; the client reads the file locally, computes
/// its size, and sends the server's wire order `<filename> <user> <size>`
/// followed immediately by the payload.
fn send_file(stream: &mut TcpStream, rest: &str) -> anyhow::Result<()> {
  let mut toks = rest.split_whitespace();
  let (path, user) = match (toks.next(), toks.next()) {
    (Some(p), Some(u)) => (p, u),
    _ => {
      println!("usage: /sendfile <file> <user>");
      return Ok(());
    }
  };
  let ext = Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or("");
  if !OFFERABLE_EXTENSIONS.contains(&ext) {
    warn!("'{path}' has an unusual extension for upload (.txt/.pdf/.jpg/.png expected)");
  }
  let payload = fs::read(path)?;
  let filename = Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or(path);
  writeln!(stream, "/sendfile {filename} {user} {}", payload.len())?;
  stream.write_all(&payload)?;
  stream.flush()?;
  Ok(())
}
