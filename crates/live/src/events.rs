use crate::RunId;
use parking_lot::Mutex;
use std::{
  collections::VecDeque,
  sync::Arc,
  task::{Poll, Waker},
};
use tokio_stream::Stream;

/// An applied store mutation: the new store revision and the run it touched.
/// Dropped or no-op intents never produce an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
  pub revision: u64,
  pub run_id: RunId,
}

pub(crate) struct SubscriberState {
  queue: VecDeque<StoreEvent>,
  waker: Option<Waker>,
  closed: bool,
}

pub(crate) type Subscriber = Arc<Mutex<SubscriberState>>;

/// Stream of applied store mutations, for async consumers reacting to
/// progress updates.
pub struct StoreEvents {
  state: Subscriber,
}

impl StoreEvents {
  pub(crate) fn new() -> (Subscriber, Self) {
    let state = Arc::new(Mutex::new(SubscriberState {
      queue: VecDeque::new(),
      waker: None,
      closed: false,
    }));

    (state.clone(), StoreEvents { state })
  }
}

impl Stream for StoreEvents {
  type Item = StoreEvent;

  fn poll_next(
    self: std::pin::Pin<&mut Self>,
    cx: &mut std::task::Context<'_>,
  ) -> Poll<Option<Self::Item>> {
    let mut state = self.state.lock();

    if let Some(event) = state.queue.pop_front() {
      return Poll::Ready(Some(event));
    }

    state.waker = Some(cx.waker().clone());

    Poll::Pending
  }
}

impl Drop for StoreEvents {
  fn drop(&mut self) {
    self.state.lock().closed = true;
  }
}

/// Pushes an event to every live subscriber and prunes the dead ones.
pub(crate) fn publish(subscribers: &mut Vec<Subscriber>, event: StoreEvent) {
  subscribers.retain(|subscriber| {
    let mut state = subscriber.lock();

    if state.closed {
      return false;
    }

    state.queue.push_back(event);

    if let Some(waker) = state.waker.take() {
      waker.wake();
    }

    true
  });
}
