mod socket;

pub use socket::*;

use cometa_live::RunStore;
use cometa_live_protocol::{translate, ServerMessage};
use tokio::sync::mpsc;

/// Single-writer dispatch loop: drains parsed messages from the socket,
/// translates each into an intent and applies it to the store in arrival
/// order. Messages that translate to nothing are dropped here.
pub async fn dispatch(mut messages: mpsc::Receiver<ServerMessage>, store: RunStore) {
  while let Some(message) = messages.recv().await {
    if let Some(intent) = translate(message) {
      store.apply(intent);
    }
  }

  log::trace!("Message channel closed, dispatch loop finished");
}
