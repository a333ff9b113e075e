//! Per-connection notification channel (single consumer, any number of
//! producers). A whole formatted line (or a file header plus its payload
//! bytes) is sent as one channel item, which is what gives each send its
//! append-atomic guarantee at the consumer without any extra locking.

use crossbeam_channel::{Receiver, RecvError, Sender, bounded};
use log::warn;

/// Default channel depth; generous enough that an active room broadcast or
/// file relay does not stall its producer under normal load.
pub const NOTIFY_CHANNEL_CAPACITY: usize = 256;

enum NotifyMsg {
  Bytes(Vec<u8>),
  /// Sent by the owning session when it enters DRAINING; tells the writer
  /// thread to stop even though producers may still hold cloned senders.
  Close,
}

#[derive(Clone)]
pub struct NotifySender {
  tx: Sender<NotifyMsg>,
}

pub struct NotifyReceiver {
  rx: Receiver<NotifyMsg>,
}

#[must_use]
pub fn make_notify_channel() -> (NotifySender, NotifyReceiver) {
  let (tx, rx) = bounded(NOTIFY_CHANNEL_CAPACITY);
  (NotifySender { tx }, NotifyReceiver { rx })
}

impl NotifySender {
  /// Appends already-framed bytes to the channel. Never fatal to the caller:
  /// if the consumer has gone away this is logged and otherwise ignored, per
  /// the notification channel's producer contract.
  pub fn send_bytes(&self, bytes: Vec<u8>) {
    if self.tx.send(NotifyMsg::Bytes(bytes)).is_err() {
      warn!("notify channel: consumer gone, dropping message");
    }
  }

  /// Appends a UTF-8 line, adding the trailing `\n` the wire protocol expects.
  pub fn send_line(&self, line: &str) {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    self.send_bytes(buf);
  }

  pub fn send_close(&self) {
    let _ = self.tx.send(NotifyMsg::Close);
  }
}

pub enum DrainedMsg {
  Bytes(Vec<u8>),
  Closed,
}

impl NotifyReceiver {
  /// Blocks until a message is available; this *is* the session loop's half
  /// of the multiplexed wait described by the notification channel.
  pub fn recv(&self) -> Result<DrainedMsg, RecvError> {
    match self.rx.recv()? {
      NotifyMsg::Bytes(b) => Ok(DrainedMsg::Bytes(b)),
      NotifyMsg::Close => Ok(DrainedMsg::Closed),
    }
  }
}
