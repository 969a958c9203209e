use super::{BrowserKey, FeatureId, RunId, RunStatus, StepCounts, StepOutcome, Time};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A step that has started but not yet reported an explicit finish.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PendingStep {
  pub index: usize,
  pub name: String,
  pub started_at: Option<Time>,
}

/// The sub-result of a run for one browser/device configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrowserResult {
  pub key: BrowserKey,
  pub current_step_index: Option<usize>,
  pub pending: Option<PendingStep>,
  pub steps: BTreeMap<usize, StepOutcome>,
  pub counts: StepCounts,
}

impl BrowserResult {
  pub fn new(key: BrowserKey) -> Self {
    BrowserResult {
      key,
      current_step_index: None,
      pending: None,
      steps: BTreeMap::new(),
      counts: StepCounts::default(),
    }
  }

  pub fn outcome(&self, index: usize) -> Option<&StepOutcome> {
    self.steps.get(&index)
  }

  pub fn recompute_counts(&mut self) {
    self.counts = StepCounts::scan(self.steps.values());
  }
}

/// One execution of a feature, fanned out across browser targets.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Run {
  pub id: RunId,
  /// Unknown until the run is announced; step and terminal events may arrive
  /// for runs the client never saw announced.
  pub feature_id: Option<FeatureId>,
  pub status: RunStatus,
  pub started_at: Option<Time>,
  pub browsers: HashMap<BrowserKey, BrowserResult>,
  /// Store revision of this run's last mutation, the dependency token for
  /// memoized projections.
  pub revision: u64,
}

impl Run {
  pub fn new(id: RunId) -> Self {
    Run {
      id,
      feature_id: None,
      status: RunStatus::Queued,
      started_at: None,
      browsers: HashMap::new(),
      revision: 0,
    }
  }

  pub fn browser(&self, key: &BrowserKey) -> Option<&BrowserResult> {
    self.browsers.get(key)
  }

  pub(crate) fn browser_entry(&mut self, key: &BrowserKey) -> &mut BrowserResult {
    self
      .browsers
      .entry(key.clone())
      .or_insert_with(|| BrowserResult::new(key.clone()))
  }
}
