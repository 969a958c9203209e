use crate::{BrowserKey, FeatureId, RunId, RunStatus, RunStore, StepCounts, StepOutcome};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

/// Identifies one derived slice of the store. Every widget subscribing to the
/// same key shares one cache entry and one computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SliceKey {
  RunStatus(RunId),
  FeatureStatus(FeatureId),
  CurrentStep(RunId, BrowserKey),
  StepCounts(RunId, BrowserKey),
  StepOutcome(RunId, BrowserKey, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SliceValue {
  RunStatus(Option<RunStatus>),
  FeatureStatus(Option<RunStatus>),
  CurrentStep(Option<usize>),
  StepCounts(Option<StepCounts>),
  StepOutcome(Option<StepOutcome>),
}

struct CachedSlice {
  dependency: Option<u64>,
  value: Arc<SliceValue>,
}

/// Memoized read-only views over a store. A slice recomputes only when the
/// revision of the run it depends on changed, and an equal recomputation
/// hands back the previously returned allocation so subscribers can
/// short-circuit on pointer identity.
#[derive(Clone)]
pub struct Projections {
  store: RunStore,
  cache: Arc<Mutex<HashMap<SliceKey, CachedSlice>>>,
}

impl Projections {
  pub fn new(store: RunStore) -> Self {
    Projections {
      store,
      cache: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn slice(&self, key: &SliceKey) -> Arc<SliceValue> {
    let dependency = self.dependency_revision(key);
    let mut cache = self.cache.lock();

    if let Some(cached) = cache.get_mut(key) {
      if cached.dependency == dependency {
        return cached.value.clone();
      }

      let value = self.compute(key);
      cached.dependency = dependency;

      // Shallow-equality short-circuit: keep the old allocation when the
      // recomputed value is unchanged.
      if value != *cached.value {
        cached.value = Arc::new(value);
      }

      return cached.value.clone();
    }

    let value = Arc::new(self.compute(key));
    cache.insert(
      key.clone(),
      CachedSlice {
        dependency,
        value: value.clone(),
      },
    );

    value
  }

  pub fn run_status(&self, run_id: RunId) -> Option<RunStatus> {
    match &*self.slice(&SliceKey::RunStatus(run_id)) {
      SliceValue::RunStatus(status) => *status,
      _ => None,
    }
  }

  pub fn feature_status(&self, feature_id: FeatureId) -> Option<RunStatus> {
    match &*self.slice(&SliceKey::FeatureStatus(feature_id)) {
      SliceValue::FeatureStatus(status) => *status,
      _ => None,
    }
  }

  pub fn current_step(&self, run_id: RunId, browser: BrowserKey) -> Option<usize> {
    match &*self.slice(&SliceKey::CurrentStep(run_id, browser)) {
      SliceValue::CurrentStep(index) => *index,
      _ => None,
    }
  }

  pub fn step_counts(&self, run_id: RunId, browser: BrowserKey) -> Option<StepCounts> {
    match &*self.slice(&SliceKey::StepCounts(run_id, browser)) {
      SliceValue::StepCounts(counts) => *counts,
      _ => None,
    }
  }

  pub fn step_outcome(
    &self,
    run_id: RunId,
    browser: BrowserKey,
    index: usize,
  ) -> Option<StepOutcome> {
    match &*self.slice(&SliceKey::StepOutcome(run_id, browser, index)) {
      SliceValue::StepOutcome(outcome) => outcome.clone(),
      _ => None,
    }
  }

  fn dependency_revision(&self, key: &SliceKey) -> Option<u64> {
    match key {
      SliceKey::RunStatus(run_id)
      | SliceKey::CurrentStep(run_id, _)
      | SliceKey::StepCounts(run_id, _)
      | SliceKey::StepOutcome(run_id, _, _) => self.store.run_revision(run_id),
      SliceKey::FeatureStatus(feature_id) => self.store.feature_revision(feature_id),
    }
  }

  fn compute(&self, key: &SliceKey) -> SliceValue {
    match key {
      SliceKey::RunStatus(run_id) => SliceValue::RunStatus(self.store.run_status(run_id)),
      SliceKey::FeatureStatus(feature_id) => {
        SliceValue::FeatureStatus(self.store.feature_status(feature_id))
      }
      SliceKey::CurrentStep(run_id, browser) => {
        SliceValue::CurrentStep(self.store.current_step_index(run_id, browser))
      }
      SliceKey::StepCounts(run_id, browser) => {
        SliceValue::StepCounts(self.store.step_counts(run_id, browser))
      }
      SliceKey::StepOutcome(run_id, browser, index) => {
        SliceValue::StepOutcome(self.store.step_outcome(run_id, browser, *index))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Intent, StepOutcome};

  fn browser() -> BrowserKey {
    BrowserKey::new("chrome", "120", "linux", "6.1")
  }

  #[test]
  fn test_slice_is_cached_until_run_changes() {
    let store = RunStore::new();
    let projections = Projections::new(store.clone());
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));

    let key = SliceKey::RunStatus(run_id);
    let first = projections.slice(&key);
    let second = projections.slice(&key);

    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn test_unrelated_mutation_keeps_pointer_identity() {
    let store = RunStore::new();
    let projections = Projections::new(store.clone());
    let watched = RunId::new(1);
    let other = RunId::new(2);

    store.apply(Intent::step_started(watched, browser(), 0, "first", None));

    let key = SliceKey::CurrentStep(watched, browser());
    let before = projections.slice(&key);

    store.apply(Intent::step_started(other, browser(), 0, "first", None));

    let after = projections.slice(&key);
    assert!(Arc::ptr_eq(&before, &after));
  }

  #[test]
  fn test_equal_recompute_reuses_allocation() {
    let store = RunStore::new();
    let projections = Projections::new(store.clone());
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));

    let key = SliceKey::CurrentStep(run_id, browser());
    let before = projections.slice(&key);

    // Mutates the run (counts change) but not the current step index.
    store.apply(Intent::step_finished(
      run_id,
      browser(),
      StepOutcome::passed(0, "first"),
    ));

    let after = projections.slice(&key);
    assert!(Arc::ptr_eq(&before, &after));
  }

  #[test]
  fn test_changed_slice_yields_new_value() {
    let store = RunStore::new();
    let projections = Projections::new(store.clone());
    let run_id = RunId::new(1);

    store.apply(Intent::step_started(run_id, browser(), 0, "first", None));

    let key = SliceKey::CurrentStep(run_id, browser());
    let before = projections.slice(&key);

    store.apply(Intent::step_started(run_id, browser(), 1, "second", None));

    let after = projections.slice(&key);
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(*after, SliceValue::CurrentStep(Some(1)));
    assert_eq!(projections.current_step(run_id, browser()), Some(1));
  }

  #[test]
  fn test_cleanup_invalidates_slices() {
    let store = RunStore::new();
    let projections = Projections::new(store.clone());
    let run_id = RunId::new(1);

    store.apply(Intent::run_completed(run_id, RunStatus::Success));
    assert_eq!(projections.run_status(run_id), Some(RunStatus::Success));

    store.apply(Intent::cleanup_run(run_id));
    assert_eq!(projections.run_status(run_id), None);
  }
}
