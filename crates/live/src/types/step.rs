use serde::{Deserialize, Serialize};

pub type Time = chrono::DateTime<chrono::Utc>;

/// Screenshot references recorded for one step: the capture taken during the
/// run, the stored template it is compared against, and the rendered
/// difference image.
///
/// References are append-only: merging an update never clears a previously
/// set reference unless the update is explicitly marked `removed`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Screenshots {
  pub current: Option<String>,
  pub template: Option<String>,
  pub difference: Option<String>,
  pub removed: bool,
}

impl Screenshots {
  pub fn merge(&mut self, update: Screenshots) {
    if update.removed {
      *self = update;
      return;
    }

    if update.current.is_some() {
      self.current = update.current;
    }
    if update.template.is_some() {
      self.template = update.template;
    }
    if update.difference.is_some() {
      self.difference = update.difference;
    }
  }

  pub fn is_empty(&self) -> bool {
    self.current.is_none() && self.template.is_none() && self.difference.is_none()
  }
}

/// The recorded result of one test step within a browser result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepOutcome {
  pub index: usize,
  pub name: String,
  pub success: bool,
  pub skipped: bool,
  pub error: Option<String>,
  pub screenshots: Screenshots,
  pub started_at: Option<Time>,
  pub finished_at: Option<Time>,
  pub execution_time_ms: Option<u64>,
}

impl StepOutcome {
  pub fn passed(index: usize, name: impl Into<String>) -> Self {
    StepOutcome {
      index,
      name: name.into(),
      success: true,
      skipped: false,
      error: None,
      screenshots: Screenshots::default(),
      started_at: None,
      finished_at: None,
      execution_time_ms: None,
    }
  }

  pub fn failed(index: usize, name: impl Into<String>, error: impl Into<String>) -> Self {
    StepOutcome {
      success: false,
      error: Some(error.into()),
      ..StepOutcome::passed(index, name)
    }
  }

  /// Placeholder for a step whose explicit finish event never arrived. It is
  /// marked skipped so the derived counts never invent a result the backend
  /// did not send.
  pub fn placeholder(index: usize, name: impl Into<String>) -> Self {
    StepOutcome {
      success: false,
      skipped: true,
      ..StepOutcome::passed(index, name)
    }
  }
}

/// Derived ok/fail/skipped counts for a browser result. Always recomputed by
/// scanning the full outcome list, never patched incrementally.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepCounts {
  pub ok: usize,
  pub failed: usize,
  pub skipped: usize,
}

impl StepCounts {
  pub fn scan<'a>(outcomes: impl Iterator<Item = &'a StepOutcome>) -> Self {
    let mut counts = StepCounts::default();

    for outcome in outcomes {
      if outcome.skipped {
        counts.skipped += 1;
      } else if outcome.success {
        counts.ok += 1;
      } else {
        counts.failed += 1;
      }
    }

    counts
  }

  pub fn total(&self) -> usize {
    self.ok + self.failed + self.skipped
  }
}
