use crate::{
  events, BrowserKey, BrowserResult, FeatureId, Intent, PendingStep, Run, RunId, RunStatus,
  StepCounts, StepOutcome, StoreEvent, StoreEvents,
};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

struct StoreInner {
  runs: HashMap<RunId, Run>,
  revision: u64,
  subscribers: Vec<events::Subscriber>,
}

impl StoreInner {
  fn new() -> Self {
    StoreInner {
      runs: HashMap::new(),
      revision: 0,
      subscribers: Vec::new(),
    }
  }
}

/// In-memory map of live runs, keyed by run id. `apply` is the single writer
/// path; every other code path is a reader. Runs are purged only through an
/// explicit `CleanupRun` intent when the monitoring view closes.
#[derive(Clone)]
pub struct RunStore(Arc<Mutex<StoreInner>>);

impl Default for RunStore {
  fn default() -> Self {
    Self::new()
  }
}

impl RunStore {
  pub fn new() -> Self {
    RunStore(Arc::new(Mutex::new(StoreInner::new())))
  }

  /// Applies an intent to the store. Intents that are dropped by the reducer
  /// rules (late steps for terminal runs, stale indices, cleanup of absent
  /// runs) leave the revision counter and every cached slice untouched.
  pub fn apply(&self, intent: Intent) {
    let mut inner = self.0.lock();
    let run_id = intent.run_id();

    if !inner.reduce(intent) {
      return;
    }

    inner.revision += 1;
    let revision = inner.revision;

    if let Some(run) = inner.runs.get_mut(&run_id) {
      run.revision = revision;
    }

    events::publish(&mut inner.subscribers, StoreEvent { revision, run_id });
  }

  pub fn subscribe(&self) -> StoreEvents {
    let (state, stream) = StoreEvents::new();
    self.0.lock().subscribers.push(state);
    stream
  }

  pub fn revision(&self) -> u64 {
    self.0.lock().revision
  }

  pub fn run(&self, run_id: &RunId) -> Option<Run> {
    self.0.lock().runs.get(run_id).cloned()
  }

  pub fn run_status(&self, run_id: &RunId) -> Option<RunStatus> {
    self.0.lock().runs.get(run_id).map(|run| run.status)
  }

  pub fn run_revision(&self, run_id: &RunId) -> Option<u64> {
    self.0.lock().runs.get(run_id).map(|run| run.revision)
  }

  pub fn browser(&self, run_id: &RunId, key: &BrowserKey) -> Option<BrowserResult> {
    self
      .0
      .lock()
      .runs
      .get(run_id)
      .and_then(|run| run.browser(key))
      .cloned()
  }

  pub fn current_step_index(&self, run_id: &RunId, key: &BrowserKey) -> Option<usize> {
    self
      .0
      .lock()
      .runs
      .get(run_id)
      .and_then(|run| run.browser(key))
      .and_then(|result| result.current_step_index)
  }

  pub fn step_counts(&self, run_id: &RunId, key: &BrowserKey) -> Option<StepCounts> {
    self
      .0
      .lock()
      .runs
      .get(run_id)
      .and_then(|run| run.browser(key))
      .map(|result| result.counts)
  }

  pub fn step_outcome(
    &self,
    run_id: &RunId,
    key: &BrowserKey,
    index: usize,
  ) -> Option<StepOutcome> {
    self
      .0
      .lock()
      .runs
      .get(run_id)
      .and_then(|run| run.browser(key))
      .and_then(|result| result.outcome(index))
      .cloned()
  }

  /// The latest run (highest run id) announced for a feature.
  pub fn latest_run_for_feature(&self, feature_id: &FeatureId) -> Option<Run> {
    self
      .0
      .lock()
      .runs
      .values()
      .filter(|run| run.feature_id == Some(*feature_id))
      .max_by_key(|run| run.id)
      .cloned()
  }

  pub fn feature_status(&self, feature_id: &FeatureId) -> Option<RunStatus> {
    self
      .latest_run_for_feature(feature_id)
      .map(|run| run.status)
  }

  pub(crate) fn feature_revision(&self, feature_id: &FeatureId) -> Option<u64> {
    self
      .0
      .lock()
      .runs
      .values()
      .filter(|run| run.feature_id == Some(*feature_id))
      .map(|run| run.revision)
      .max()
  }

  /// Snapshot of all runs, ordered by run id. Mainly for tests and debugging.
  pub fn runs(&self) -> Vec<Run> {
    let mut runs: Vec<Run> = self.0.lock().runs.values().cloned().collect();
    runs.sort_by_key(|run| run.id);
    runs
  }

  pub fn len(&self) -> usize {
    self.0.lock().runs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.lock().runs.is_empty()
  }
}

impl StoreInner {
  /// The reducer. Returns whether the intent actually mutated state.
  fn reduce(&mut self, intent: Intent) -> bool {
    match intent {
      Intent::RunStarted {
        run_id,
        feature_id,
        started_at,
      } => self.run_started(run_id, feature_id, started_at),
      Intent::RunStatusChanged { run_id, status } => self.run_status_changed(run_id, status),
      Intent::StepStarted {
        run_id,
        browser,
        index,
        name,
        started_at,
      } => self.step_started(run_id, browser, index, name, started_at),
      Intent::StepFinished {
        run_id,
        browser,
        outcome,
      } => self.step_finished(run_id, browser, outcome),
      Intent::RunCompleted { run_id, status } => self.run_completed(run_id, status),
      Intent::CleanupRun { run_id } => self.cleanup_run(run_id),
    }
  }

  fn run_started(
    &mut self,
    run_id: RunId,
    feature_id: FeatureId,
    started_at: Option<crate::Time>,
  ) -> bool {
    if let Some(existing) = self.runs.get_mut(&run_id) {
      // The run was lazily created by an earlier step event; fill in what the
      // announcement adds.
      if existing.feature_id.is_none() {
        existing.feature_id = Some(feature_id);
        if existing.started_at.is_none() {
          existing.started_at = started_at;
        }
        return true;
      }

      log::warn!(
        "Run {} announced twice, keeping existing state",
        run_id.to_string()
      );
      return false;
    }

    if let Some(live) = self
      .runs
      .values()
      .find(|run| run.feature_id == Some(feature_id) && run.status.is_live())
    {
      log::warn!(
        "Feature {} already has live run {}; new run {} starts anyway",
        feature_id.to_string(),
        live.id.to_string(),
        run_id.to_string()
      );
    }

    let mut run = Run::new(run_id);
    run.feature_id = Some(feature_id);
    run.started_at = started_at;
    self.runs.insert(run_id, run);

    true
  }

  fn run_status_changed(&mut self, run_id: RunId, status: RunStatus) -> bool {
    if status.is_terminal() {
      // Terminal transitions must arrive as RunCompleted so the terminal
      // rules apply in one place.
      log::warn!(
        "Dropping terminal status change for run {}; expected a completion event",
        run_id.to_string()
      );
      return false;
    }

    let run = self.runs.entry(run_id).or_insert_with(|| Run::new(run_id));

    if run.status.is_terminal() {
      log::warn!(
        "Dropping status change for terminal run {}",
        run_id.to_string()
      );
      return false;
    }

    if run.status == status {
      return false;
    }

    run.status = status;

    true
  }

  fn step_started(
    &mut self,
    run_id: RunId,
    browser: BrowserKey,
    index: usize,
    name: String,
    started_at: Option<crate::Time>,
  ) -> bool {
    let run = self.runs.entry(run_id).or_insert_with(|| {
      let mut run = Run::new(run_id);
      run.status = RunStatus::Running;
      run
    });

    if run.status.is_terminal() {
      log::warn!(
        "Dropping late step {} for terminal run {}",
        index,
        run_id.to_string()
      );
      return false;
    }

    // A step event means execution is underway even if the status update
    // never arrived.
    run.status = RunStatus::Running;

    let result = run.browser_entry(&browser);

    if let Some(current) = result.current_step_index {
      if index <= current {
        log::warn!(
          "Step index {} for {} in run {} did not advance past {}, dropping",
          index,
          result.key.slug(),
          run_id.to_string(),
          current
        );
        return false;
      }

      if !result.steps.contains_key(&current) {
        // The explicit finish for the previous step never arrived; backfill a
        // skipped placeholder so the outcome list stays dense up to here.
        let name = result
          .pending
          .as_ref()
          .map(|pending| pending.name.clone())
          .unwrap_or_default();

        log::warn!(
          "Backfilling missing outcome for step {} of {} in run {}",
          current,
          result.key.slug(),
          run_id.to_string()
        );

        result
          .steps
          .insert(current, StepOutcome::placeholder(current, name));
        result.recompute_counts();
      }
    }

    result.current_step_index = Some(index);
    result.pending = Some(PendingStep {
      index,
      name,
      started_at,
    });

    true
  }

  fn step_finished(&mut self, run_id: RunId, browser: BrowserKey, outcome: StepOutcome) -> bool {
    let run = self.runs.entry(run_id).or_insert_with(|| {
      let mut run = Run::new(run_id);
      run.status = RunStatus::Running;
      run
    });

    if run.status.is_terminal() {
      log::warn!(
        "Dropping late step outcome {} for terminal run {}",
        outcome.index,
        run_id.to_string()
      );
      return false;
    }

    run.status = RunStatus::Running;

    let result = run.browser_entry(&browser);
    let mut outcome = outcome;

    // Screenshot references are append-only: a replacement outcome keeps the
    // references it does not explicitly override.
    if let Some(existing) = result.steps.get(&outcome.index) {
      let mut screenshots = existing.screenshots.clone();
      screenshots.merge(outcome.screenshots);
      outcome.screenshots = screenshots;
    }

    if let Some(pending) = &result.pending {
      if pending.index == outcome.index {
        if outcome.started_at.is_none() {
          outcome.started_at = pending.started_at;
        }
        result.pending = None;
      }
    }

    // The current step index follows StepStarted only; an outcome arriving
    // ahead of its start event is recorded without moving the cursor.
    result.steps.insert(outcome.index, outcome);
    result.recompute_counts();

    true
  }

  fn run_completed(&mut self, run_id: RunId, status: RunStatus) -> bool {
    if !status.is_terminal() {
      log::warn!(
        "Dropping completion with non-terminal status for run {}",
        run_id.to_string()
      );
      return false;
    }

    let run = self.runs.entry(run_id).or_insert_with(|| Run::new(run_id));

    if run.status.is_terminal() {
      if run.status != status {
        log::warn!(
          "Run {} is already terminal, dropping conflicting terminal status",
          run_id.to_string()
        );
      }
      return false;
    }

    run.status = status;

    true
  }

  fn cleanup_run(&mut self, run_id: RunId) -> bool {
    if self.runs.remove(&run_id).is_some() {
      log::trace!("Purged run {}", run_id.to_string());
      true
    } else {
      // Idempotent: cleanup of an absent run is a no-op, not an error.
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn browser() -> BrowserKey {
    BrowserKey::new("chrome", "120", "linux", "6.1")
  }

  #[test]
  fn test_lazy_initialization_on_step_events() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));

    let run = store.run(&run_id).unwrap();
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(
      store.current_step_index(&run_id, &browser()),
      Some(0)
    );
  }

  #[test]
  fn test_step_index_is_monotonic() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 3, "fourth", None));
    let revision = store.revision();

    // Duplicate and stale indices are dropped without touching the revision.
    store.apply(Intent::step_started(run_id, browser(), 3, "fourth", None));
    store.apply(Intent::step_started(run_id, browser(), 1, "second", None));

    assert_eq!(store.current_step_index(&run_id, &browser()), Some(3));
    assert_eq!(store.revision(), revision);
  }

  #[test]
  fn test_backfills_missing_step_outcome() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    store.apply(Intent::step_started(run_id, browser(), 1, "second", None));

    let result = store.browser(&run_id, &browser()).unwrap();
    let placeholder = result.outcome(0).unwrap();

    assert!(placeholder.skipped);
    assert!(!placeholder.success);
    assert_eq!(placeholder.name, "first".to_string());
    assert_eq!(result.counts.skipped, 1);
  }

  #[test]
  fn test_no_backfill_when_outcome_arrived() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    store.apply(Intent::step_finished(
      run_id,
      browser(),
      StepOutcome::passed(0, "first"),
    ));
    store.apply(Intent::step_started(run_id, browser(), 1, "second", None));

    let result = store.browser(&run_id, &browser()).unwrap();
    assert!(result.outcome(0).unwrap().success);
    assert_eq!(result.counts.ok, 1);
    assert_eq!(result.counts.skipped, 0);
  }

  #[test]
  fn test_current_step_follows_step_started_only() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    store.apply(Intent::step_finished(
      run_id,
      browser(),
      StepOutcome::passed(3, "fourth"),
    ));

    // The outcome is recorded, but the cursor stays at the last started step.
    assert_eq!(store.current_step_index(&run_id, &browser()), Some(0));

    let result = store.browser(&run_id, &browser()).unwrap();
    assert!(result.outcome(3).unwrap().success);
    assert_eq!(result.counts.ok, 1);
  }

  #[test]
  fn test_finish_without_start_leaves_cursor_unset() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_finished(
      run_id,
      browser(),
      StepOutcome::passed(0, "first"),
    ));

    assert_eq!(store.current_step_index(&run_id, &browser()), None);
    assert_eq!(store.step_counts(&run_id, &browser()).unwrap().ok, 1);
  }

  #[test]
  fn test_terminal_status_is_immutable() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::run_completed(run_id, RunStatus::Failed));
    store.apply(Intent::run_completed(run_id, RunStatus::Success));
    store.apply(Intent::run_status_changed(run_id, RunStatus::Running));

    assert_eq!(store.run_status(&run_id), Some(RunStatus::Failed));
  }

  #[test]
  fn test_screenshots_merge_append_only() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    let mut first = StepOutcome::passed(0, "first");
    first.screenshots.current = Some("current.png".to_string());
    store.apply(Intent::step_finished(run_id, browser(), first));

    let mut replacement = StepOutcome::passed(0, "first");
    replacement.screenshots.difference = Some("difference.png".to_string());
    store.apply(Intent::step_finished(run_id, browser(), replacement));

    let outcome = store.step_outcome(&run_id, &browser(), 0).unwrap();
    assert_eq!(outcome.screenshots.current, Some("current.png".to_string()));
    assert_eq!(
      outcome.screenshots.difference,
      Some("difference.png".to_string())
    );
  }

  #[test]
  fn test_counts_match_independent_scan() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    store.apply(Intent::step_finished(
      run_id,
      browser(),
      StepOutcome::passed(0, "first"),
    ));
    store.apply(Intent::step_started(run_id, browser(), 1, "second", None));
    store.apply(Intent::step_finished(
      run_id,
      browser(),
      StepOutcome::failed(1, "second", "element not found"),
    ));
    store.apply(Intent::step_started(run_id, browser(), 2, "third", None));
    store.apply(Intent::step_started(run_id, browser(), 3, "fourth", None));

    let result = store.browser(&run_id, &browser()).unwrap();
    assert_eq!(result.current_step_index, Some(3));
    assert_eq!(result.counts, StepCounts::scan(result.steps.values()));
    assert_eq!(
      result.counts,
      StepCounts {
        ok: 1,
        failed: 1,
        skipped: 1
      }
    );
  }

  #[test]
  fn test_run_announcement_fills_lazily_created_run() {
    let store = RunStore::new();
    let run_id = RunId::new(1);
    let feature_id = FeatureId::new(9);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    store.apply(Intent::run_started(run_id, feature_id, None));

    let run = store.run(&run_id).unwrap();
    assert_eq!(run.feature_id, Some(feature_id));
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(store.feature_status(&feature_id), Some(RunStatus::Running));
  }

  #[test]
  fn test_duplicate_announcement_is_dropped() {
    let store = RunStore::new();
    let run_id = RunId::new(1);
    let feature_id = FeatureId::new(9);

    store.apply(Intent::run_started(run_id, feature_id, None));
    let revision = store.revision();

    store.apply(Intent::run_started(run_id, feature_id, None));

    assert_eq!(store.revision(), revision);
  }

  #[test]
  fn test_cleanup_is_idempotent() {
    let store = RunStore::new();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    store.apply(Intent::cleanup_run(run_id));

    let snapshot = store.runs();
    let revision = store.revision();

    store.apply(Intent::cleanup_run(run_id));

    assert_eq!(store.runs(), snapshot);
    assert_eq!(store.revision(), revision);
    assert!(store.is_empty());
  }

  #[test]
  fn test_revision_stamped_per_run() {
    let store = RunStore::new();
    let first = RunId::new(1);
    let second = RunId::new(2);

    store.apply(Intent::step_started(first, browser(), 0, "first", None));
    let first_revision = store.run_revision(&first).unwrap();

    store.apply(Intent::step_started(second, browser(), 0, "first", None));

    // Mutating another run never touches this run's revision.
    assert_eq!(store.run_revision(&first), Some(first_revision));
    assert!(store.run_revision(&second).unwrap() > first_revision);
  }

  #[tokio::test]
  async fn test_subscribers_see_applied_mutations_only() {
    use tokio_stream::StreamExt;

    let store = RunStore::new();
    let mut events = store.subscribe();
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    // Dropped by the monotonicity rule, no event.
    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));
    store.apply(Intent::run_completed(run_id, RunStatus::Success));

    let first = events.next().await.unwrap();
    let second = events.next().await.unwrap();

    assert_eq!(first.run_id, run_id);
    assert_eq!(second.revision, first.revision + 1);
  }
}
