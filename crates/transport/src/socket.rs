use cometa_live::{CommandSink, Error, OutboundCommand, Result};
use cometa_live_protocol::{ClientCommand, Identity, ServerMessage};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::time::Duration;
use tokio::{
  net::TcpStream,
  sync::{mpsc, watch},
  task::JoinHandle,
};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

const MESSAGE_BUFFER: usize = 128;
const OUTBOUND_BUFFER: usize = 32;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Clone)]
pub struct SocketOptions {
  pub url: String,
  /// Credentials watched across reconnects. Every new physical connection
  /// authenticates with the value current at that moment, and an in-place
  /// update re-authenticates the live connection.
  pub identity: watch::Receiver<Identity>,
}

impl SocketOptions {
  pub fn new(url: impl Into<String>, identity: watch::Receiver<Identity>) -> Self {
    SocketOptions {
      url: url.into(),
      identity,
    }
  }
}

/// Realtime connection to the backend. Reconnects forever with doubling
/// backoff, re-authenticates on every new connection, and surfaces inbound
/// frames as parsed messages on a channel.
pub struct EventSocket {
  status_rx: watch::Receiver<bool>,
  message_rx: Option<mpsc::Receiver<ServerMessage>>,
  outbound_tx: mpsc::Sender<ClientCommand>,
  driver: JoinHandle<()>,
}

impl EventSocket {
  pub fn connect(options: SocketOptions) -> Self {
    let (status_tx, status_rx) = watch::channel(false);
    let (message_tx, message_rx) = mpsc::channel(MESSAGE_BUFFER);
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    let driver = tokio::spawn(drive(options, status_tx, message_tx, outbound_rx));

    EventSocket {
      status_rx,
      message_rx: Some(message_rx),
      outbound_tx,
      driver,
    }
  }

  pub fn connection_status(&self) -> watch::Receiver<bool> {
    self.status_rx.clone()
  }

  pub fn is_connected(&self) -> bool {
    *self.status_rx.borrow()
  }

  /// Takes the inbound message stream. There is exactly one consumer; a
  /// second call returns `None`.
  pub fn messages(&mut self) -> Option<mpsc::Receiver<ServerMessage>> {
    self.message_rx.take()
  }

  pub fn send_command(&self, command: ClientCommand) -> Result<()> {
    self
      .outbound_tx
      .try_send(command)
      .map_err(Error::connection_error)
  }
}

impl CommandSink for EventSocket {
  fn send(&self, command: OutboundCommand) -> Result<()> {
    self.send_command(ClientCommand::from(command))
  }
}

impl Drop for EventSocket {
  fn drop(&mut self) {
    self.driver.abort();
  }
}

async fn drive(
  options: SocketOptions,
  status_tx: watch::Sender<bool>,
  message_tx: mpsc::Sender<ServerMessage>,
  mut outbound_rx: mpsc::Receiver<ClientCommand>,
) {
  let mut identity = options.identity.clone();
  let mut backoff = INITIAL_BACKOFF;

  loop {
    match tokio_tungstenite::connect_async(&options.url).await {
      Ok((socket, _)) => {
        log::info!("Connected to {}", options.url);
        status_tx.send_replace(true);
        backoff = INITIAL_BACKOFF;

        if let Err(err) =
          run_connection(socket, &mut identity, &message_tx, &mut outbound_rx).await
        {
          log::warn!("Connection to {} lost: {}", options.url, err);
        }

        status_tx.send_replace(false);
      }
      Err(err) => {
        log::warn!("Failed to connect to {}: {}", options.url, err);
      }
    }

    // The consumer hung up; there is no one left to reconnect for.
    if message_tx.is_closed() {
      break;
    }

    log::debug!("Reconnecting in {:?}", backoff);
    tokio::time::sleep(backoff).await;
    backoff = (backoff * 2).min(MAX_BACKOFF);
  }
}

async fn run_connection(
  socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
  identity: &mut watch::Receiver<Identity>,
  message_tx: &mpsc::Sender<ServerMessage>,
  outbound_rx: &mut mpsc::Receiver<ClientCommand>,
) -> Result<()> {
  let (mut write, mut read) = socket.split();

  let credentials = identity.borrow_and_update().clone();
  send_frame(&mut write, &ClientCommand::authenticate(&credentials)).await?;

  let mut identity_open = true;

  loop {
    tokio::select! {
      changed = identity.changed(), if identity_open => {
        match changed {
          Ok(()) => {
            let credentials = identity.borrow_and_update().clone();
            send_frame(&mut write, &ClientCommand::authenticate(&credentials)).await?;
          }
          Err(_) => identity_open = false,
        }
      }

      command = outbound_rx.recv() => {
        match command {
          Some(command) => send_frame(&mut write, &command).await?,
          None => return Ok(()),
        }
      }

      frame = read.next() => {
        match frame {
          Some(Ok(Message::Text(text))) => {
            match ServerMessage::parse(text.as_str()) {
              Ok(message) => {
                if message_tx.send(message).await.is_err() {
                  return Ok(());
                }
              }
              // A frame this client cannot read must not take the
              // connection down.
              Err(err) => log::warn!("Dropping inbound frame: {}", err),
            }
          }
          Some(Ok(Message::Close(_))) => {
            return Err(Error::connection_error("Server closed the connection"));
          }
          Some(Ok(_)) => {}
          Some(Err(err)) => return Err(Error::connection_error(err)),
          None => return Err(Error::connection_error("Stream ended")),
        }
      }
    }
  }
}

async fn send_frame(write: &mut WsSink, command: &ClientCommand) -> Result<()> {
  let text = command.to_text()?;

  write
    .send(Message::Text(text.into()))
    .await
    .map_err(Error::connection_error)
}
