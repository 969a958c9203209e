use crate::ServerMessage;
use cometa_live::{FeatureId, Intent, RunId, RunStatus, StepOutcome};

/// Maps a wire status string to a terminal run status. The backend spells a
/// few of these more than one way.
pub fn terminal_status(status: &str) -> Option<RunStatus> {
  match status {
    "success" | "passed" => Some(RunStatus::Success),
    "failed" => Some(RunStatus::Failed),
    "stopped" | "cancelled" | "canceled" => Some(RunStatus::Stopped),
    "timeout" => Some(RunStatus::Timeout),
    _ => None,
  }
}

pub fn live_status(status: &str) -> Option<RunStatus> {
  match status {
    "queued" => Some(RunStatus::Queued),
    "initializing" => Some(RunStatus::Initializing),
    "running" => Some(RunStatus::Running),
    _ => None,
  }
}

/// Turns an inbound message into a store intent. Total over its input:
/// unknown discriminants and unrecognized status strings translate to `None`,
/// never to an error. Side-effect free by construction.
pub fn translate(message: ServerMessage) -> Option<Intent> {
  match message {
    ServerMessage::FeatureRunStarted {
      run_id,
      feature_id,
      started_at,
    } => Some(Intent::run_started(
      RunId::new(run_id),
      FeatureId::new(feature_id),
      started_at,
    )),

    ServerMessage::RunStatusChanged { run_id, status } => {
      let status = live_status(&status)?;
      Some(Intent::run_status_changed(RunId::new(run_id), status))
    }

    ServerMessage::StepStarted {
      run_id,
      browser,
      step_index,
      step_name,
      started_at,
    } => Some(Intent::step_started(
      RunId::new(run_id),
      browser.into(),
      step_index,
      step_name,
      started_at,
    )),

    ServerMessage::StepFinished {
      run_id,
      browser,
      step_index,
      step_name,
      success,
      skipped,
      error,
      screenshots,
      started_at,
      finished_at,
      execution_time_ms,
    } => {
      let outcome = StepOutcome {
        index: step_index,
        name: step_name,
        success,
        skipped,
        error,
        screenshots: screenshots.into(),
        started_at,
        finished_at,
        execution_time_ms,
      };

      Some(Intent::step_finished(
        RunId::new(run_id),
        browser.into(),
        outcome,
      ))
    }

    ServerMessage::RunCompleted { run_id, status } => {
      let status = terminal_status(&status)?;
      Some(Intent::run_completed(RunId::new(run_id), status))
    }

    ServerMessage::RunStopped { run_id } => {
      Some(Intent::run_completed(RunId::new(run_id), RunStatus::Stopped))
    }

    ServerMessage::Unknown => None,
  }
}
