use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Queued,
  Initializing,
  Running,
  Success,
  Failed,
  Stopped,
  Timeout,
}

impl RunStatus {
  /// No transition leaves a terminal status.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      RunStatus::Success | RunStatus::Failed | RunStatus::Stopped | RunStatus::Timeout
    )
  }

  pub fn is_live(&self) -> bool {
    !self.is_terminal()
  }

  pub fn is_running(&self) -> bool {
    matches!(self, RunStatus::Running)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_terminal() {
    assert!(!RunStatus::Queued.is_terminal());
    assert!(!RunStatus::Initializing.is_terminal());
    assert!(!RunStatus::Running.is_terminal());
    assert!(RunStatus::Success.is_terminal());
    assert!(RunStatus::Failed.is_terminal());
    assert!(RunStatus::Stopped.is_terminal());
    assert!(RunStatus::Timeout.is_terminal());
  }

  #[test]
  fn test_is_live() {
    assert!(RunStatus::Queued.is_live());
    assert!(RunStatus::Initializing.is_live());
    assert!(RunStatus::Running.is_live());
    assert!(!RunStatus::Success.is_live());
    assert!(!RunStatus::Stopped.is_live());
  }

  #[test]
  fn test_is_running() {
    assert!(!RunStatus::Queued.is_running());
    assert!(RunStatus::Running.is_running());
    assert!(!RunStatus::Failed.is_running());
  }
}
