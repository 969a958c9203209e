mod translate;

pub use translate::*;

use cometa_live::{BrowserKey, Error, OutboundCommand, Result, Screenshots, Time};
use serde::{Deserialize, Serialize};

/// Credentials presented over the realtime channel. Sent once per physical
/// connection, so a reconnect always re-authenticates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Identity {
  pub user_id: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub session: Option<String>,
}

impl Identity {
  pub fn new(user_id: u64) -> Self {
    Identity {
      user_id,
      session: None,
    }
  }

  pub fn with_session(mut self, session: impl Into<String>) -> Self {
    self.session = Some(session.into());
    self
  }
}

/// Browser target as it appears on the wire. The backend omits fields it
/// considers obvious, so everything past the browser name defaults to empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BrowserPayload {
  pub browser: String,
  #[serde(default)]
  pub browser_version: String,
  #[serde(default)]
  pub os: String,
  #[serde(default)]
  pub os_version: String,
  #[serde(default)]
  pub device: Option<String>,
}

impl From<BrowserPayload> for BrowserKey {
  fn from(payload: BrowserPayload) -> Self {
    BrowserKey {
      browser: payload.browser,
      browser_version: payload.browser_version,
      os: payload.os,
      os_version: payload.os_version,
      device: payload.device,
    }
  }
}

impl From<BrowserKey> for BrowserPayload {
  fn from(key: BrowserKey) -> Self {
    BrowserPayload {
      browser: key.browser,
      browser_version: key.browser_version,
      os: key.os,
      os_version: key.os_version,
      device: key.device,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ScreenshotsPayload {
  #[serde(default)]
  pub current: Option<String>,
  #[serde(default)]
  pub template: Option<String>,
  #[serde(default)]
  pub difference: Option<String>,
  #[serde(default)]
  pub removed: bool,
}

impl From<ScreenshotsPayload> for Screenshots {
  fn from(payload: ScreenshotsPayload) -> Self {
    Screenshots {
      current: payload.current,
      template: payload.template,
      difference: payload.difference,
      removed: payload.removed,
    }
  }
}

/// Inbound realtime message. The discriminant travels in a `type` field;
/// discriminants this client does not know collapse into `Unknown` instead of
/// failing the whole frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
  FeatureRunStarted {
    run_id: u64,
    feature_id: u64,
    #[serde(default)]
    started_at: Option<Time>,
  },
  RunStatusChanged {
    run_id: u64,
    status: String,
  },
  StepStarted {
    run_id: u64,
    browser: BrowserPayload,
    step_index: usize,
    step_name: String,
    #[serde(default)]
    started_at: Option<Time>,
  },
  StepFinished {
    run_id: u64,
    browser: BrowserPayload,
    step_index: usize,
    #[serde(default)]
    step_name: String,
    success: bool,
    #[serde(default)]
    skipped: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    screenshots: ScreenshotsPayload,
    #[serde(default)]
    started_at: Option<Time>,
    #[serde(default)]
    finished_at: Option<Time>,
    #[serde(default)]
    execution_time_ms: Option<u64>,
  },
  RunCompleted {
    run_id: u64,
    status: String,
  },
  RunStopped {
    run_id: u64,
  },
  #[serde(other)]
  Unknown,
}

impl ServerMessage {
  pub fn parse(text: &str) -> Result<ServerMessage> {
    serde_json::from_str(text).map_err(Error::malformed_message)
  }
}

/// Outbound realtime frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
  Authenticate {
    user_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<String>,
  },
  JumpToStep {
    run_id: u64,
    browser: BrowserPayload,
    step_index: usize,
  },
}

impl ClientCommand {
  pub fn authenticate(identity: &Identity) -> Self {
    ClientCommand::Authenticate {
      user_id: identity.user_id,
      session: identity.session.clone(),
    }
  }

  pub fn to_text(&self) -> Result<String> {
    serde_json::to_string(self).map_err(Error::malformed_message)
  }
}

impl From<OutboundCommand> for ClientCommand {
  fn from(command: OutboundCommand) -> Self {
    match command {
      OutboundCommand::JumpToStep {
        run_id,
        browser,
        step_index,
      } => ClientCommand::JumpToStep {
        run_id: run_id.inner(),
        browser: browser.into(),
        step_index,
      },
    }
  }
}
