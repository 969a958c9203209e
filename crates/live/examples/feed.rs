use cometa_live::{BrowserKey, FeatureId, Intent, Projections, RunId, RunStatus, RunStore, StepOutcome};

fn main() {
  cometa_live_logger::init_logger();

  let store = RunStore::new();
  let projections = Projections::new(store.clone());

  let run_id = RunId::new(101);
  let feature_id = FeatureId::new(7);
  let browser = BrowserKey::new("chrome", "120", "linux", "6.1");

  store.apply(Intent::run_started(run_id, feature_id, None));
  store.apply(Intent::run_status_changed(run_id, RunStatus::Running));

  for (index, name) in ["Open login page", "Type credentials", "Assert dashboard"]
    .iter()
    .enumerate()
  {
    store.apply(Intent::step_started(run_id, browser.clone(), index, *name, None));
    store.apply(Intent::step_finished(
      run_id,
      browser.clone(),
      StepOutcome::passed(index, *name),
    ));

    let counts = projections.step_counts(run_id, browser.clone());
    log::info!("after step {}: counts {:?}", index, counts);
  }

  store.apply(Intent::run_completed(run_id, RunStatus::Success));

  log::info!(
    "run {} finished with status {:?}",
    run_id.to_string(),
    projections.run_status(run_id)
  );
}
