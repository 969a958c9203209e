#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("Connection error: {0}")]
  ConnectionError(String),

  #[error("Command rejected: {0}")]
  CommandRejected(String),

  #[error("Malformed message: {0}")]
  MalformedMessage(String),

  #[error("Error: {0}")]
  Error(String),
}

impl Error {
  pub fn connection_error<T: ToString>(message: T) -> Self {
    Self::ConnectionError(message.to_string())
  }

  pub fn command_rejected<T: ToString>(message: T) -> Self {
    Self::CommandRejected(message.to_string())
  }

  pub fn malformed_message<T: ToString>(message: T) -> Self {
    Self::MalformedMessage(message.to_string())
  }

  pub fn error<T: ToString>(message: T) -> Self {
    Self::Error(message.to_string())
  }
}

// implement PartialEq for Error so that we can compare errors in tests
impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::ConnectionError(a), Self::ConnectionError(b)) => a == b,
      (Self::CommandRejected(a), Self::CommandRejected(b)) => a == b,
      (Self::MalformedMessage(a), Self::MalformedMessage(b)) => a == b,
      (Self::Error(a), Self::Error(b)) => a == b,
      _ => false,
    }
  }
}
