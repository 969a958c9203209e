use crate::{BrowserKey, FeatureId, RunId, RunStatus, StepOutcome, Time};

/// A typed, store-internal instruction derived from an inbound message or a
/// user action. Intents are the only input the store accepts; raw messages
/// never reach it.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
  RunStarted {
    run_id: RunId,
    feature_id: FeatureId,
    started_at: Option<Time>,
  },
  RunStatusChanged {
    run_id: RunId,
    status: RunStatus,
  },
  StepStarted {
    run_id: RunId,
    browser: BrowserKey,
    index: usize,
    name: String,
    started_at: Option<Time>,
  },
  StepFinished {
    run_id: RunId,
    browser: BrowserKey,
    outcome: StepOutcome,
  },
  RunCompleted {
    run_id: RunId,
    status: RunStatus,
  },
  CleanupRun {
    run_id: RunId,
  },
}

impl Intent {
  pub fn run_started(run_id: RunId, feature_id: FeatureId, started_at: Option<Time>) -> Self {
    Intent::RunStarted {
      run_id,
      feature_id,
      started_at,
    }
  }

  pub fn run_status_changed(run_id: RunId, status: RunStatus) -> Self {
    Intent::RunStatusChanged { run_id, status }
  }

  pub fn step_started(
    run_id: RunId,
    browser: BrowserKey,
    index: usize,
    name: impl Into<String>,
    started_at: Option<Time>,
  ) -> Self {
    Intent::StepStarted {
      run_id,
      browser,
      index,
      name: name.into(),
      started_at,
    }
  }

  pub fn step_finished(run_id: RunId, browser: BrowserKey, outcome: StepOutcome) -> Self {
    Intent::StepFinished {
      run_id,
      browser,
      outcome,
    }
  }

  pub fn run_completed(run_id: RunId, status: RunStatus) -> Self {
    Intent::RunCompleted { run_id, status }
  }

  pub fn cleanup_run(run_id: RunId) -> Self {
    Intent::CleanupRun { run_id }
  }

  pub fn run_id(&self) -> RunId {
    match self {
      Intent::RunStarted { run_id, .. }
      | Intent::RunStatusChanged { run_id, .. }
      | Intent::StepStarted { run_id, .. }
      | Intent::StepFinished { run_id, .. }
      | Intent::RunCompleted { run_id, .. }
      | Intent::CleanupRun { run_id } => *run_id,
    }
  }
}
