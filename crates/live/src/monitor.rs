use crate::{
  BrowserKey, Error, FeatureId, Intent, Projections, Result, RunId, RunStatus, RunStore,
};
use parking_lot::Mutex;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::oneshot;

/// Request/response seam for commands whose acknowledgment feeds back into
/// the run state machine. The stop request goes over the plain API channel,
/// not the realtime stream.
#[async_trait::async_trait]
pub trait RunCommandApi: Send + Sync {
  /// Asks the backend to stop a run. The acknowledgment carries the terminal
  /// status the backend settled on.
  async fn stop_run(&self, run_id: RunId, feature_id: FeatureId) -> Result<RunStatus>;
}

/// A user command sent to the backend over the realtime transport. Commands
/// never mutate the store directly; any resulting state change comes back as
/// an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCommand {
  JumpToStep {
    run_id: RunId,
    browser: BrowserKey,
    step_index: usize,
  },
}

pub trait CommandSink: Send + Sync {
  fn send(&self, command: OutboundCommand) -> Result<()>;
}

/// Handle on an in-flight stop request. Dropping it cancels only this
/// subscriber's wait; the request itself keeps running and its acknowledgment
/// is applied to the store regardless.
pub struct StopRequest {
  receiver: oneshot::Receiver<Result<RunStatus>>,
}

impl StopRequest {
  pub async fn ack(self) -> Result<RunStatus> {
    match self.receiver.await {
      Ok(result) => result,
      Err(_) => Err(Error::connection_error(
        "Stop acknowledgment task was dropped",
      )),
    }
  }
}

/// View-side session over the run store. Created when the monitoring view
/// mounts, disposed when it unmounts; disposal purges every watched run from
/// the store exactly once.
pub struct MonitorSession {
  store: RunStore,
  projections: Projections,
  api: Arc<dyn RunCommandApi>,
  sink: Arc<dyn CommandSink>,
  watched: Mutex<HashSet<RunId>>,
}

impl MonitorSession {
  pub fn mount(store: RunStore, api: Arc<dyn RunCommandApi>, sink: Arc<dyn CommandSink>) -> Self {
    let projections = Projections::new(store.clone());

    MonitorSession {
      store,
      projections,
      api,
      sink,
      watched: Mutex::new(HashSet::new()),
    }
  }

  /// Registers a run for cleanup when this session closes.
  pub fn watch(&self, run_id: RunId) {
    self.watched.lock().insert(run_id);
  }

  pub fn store(&self) -> &RunStore {
    &self.store
  }

  pub fn projections(&self) -> &Projections {
    &self.projections
  }

  pub fn jump_to_step(
    &self,
    run_id: RunId,
    browser: BrowserKey,
    step_index: usize,
  ) -> Result<()> {
    self.sink.send(OutboundCommand::JumpToStep {
      run_id,
      browser,
      step_index,
    })
  }

  /// Issues a stop request. On acknowledgment the resulting terminal status
  /// is applied to the store like any inbound intent; on rejection the store
  /// is left unchanged and the error is surfaced through the returned handle.
  pub fn stop_run(&self, run_id: RunId, feature_id: FeatureId) -> StopRequest {
    let (sender, receiver) = oneshot::channel();
    let api = self.api.clone();
    let store = self.store.clone();

    tokio::spawn(async move {
      let result = api.stop_run(run_id, feature_id).await;

      match &result {
        Ok(status) => store.apply(Intent::run_completed(run_id, *status)),
        Err(err) => log::warn!(
          "Stop request for run {} rejected: {}",
          run_id.to_string(),
          err
        ),
      }

      // The view may already be gone; the store update above stands either way.
      let _ = sender.send(result);
    });

    StopRequest { receiver }
  }

  pub fn close(self) {}
}

impl Drop for MonitorSession {
  fn drop(&mut self) {
    for run_id in self.watched.lock().drain() {
      self.store.apply(Intent::cleanup_run(run_id));
    }
  }
}
