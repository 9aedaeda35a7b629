//! Multicast subjects with optional latest-value replay
//!
//! A [`PublishSubject`] forwards values only to subscribers attached at the
//! time of publication. A [`BehaviorSubject`] additionally keeps the most
//! recent value and hands it to every new subscriber before any later update.
//! Both can be terminated once, by completion or by an error; a failed subject
//! replays its error to late subscribers.

use crate::prelude::{Arc, Context, Mutex, Pin, Poll, Stream};
use crate::{MapError, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::{FutureExt, StreamExt};

/// Receiving side of a subject-like value
pub trait Observer<T>: Send + Sync {
    fn on_next(&self, value: T);

    fn on_error(&self, error: MapError);

    fn on_complete(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Active,
    Completed,
    Failed(MapError),
}

struct SubjectState<T> {
    subscribers: Vec<UnboundedSender<Result<T>>>,
    latest: Option<T>,
    status: Status,
}

/// Shared implementation behind both subject flavours
struct SubjectCore<T> {
    state: Arc<Mutex<SubjectState<T>>>,
    replay: bool,
}

impl<T> Clone for SubjectCore<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            replay: self.replay,
        }
    }
}

impl<T: Clone> SubjectCore<T> {
    fn new(initial: Option<T>, replay: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                subscribers: Vec::new(),
                latest: initial,
                status: Status::Active,
            })),
            replay,
        }
    }

    fn publish(state: &mut SubjectState<T>, replay: bool, value: T) {
        if replay {
            state.latest = Some(value.clone());
        }
        // Closed receivers are pruned here rather than on unsubscribe
        state
            .subscribers
            .retain(|tx| tx.unbounded_send(Ok(value.clone())).is_ok());
    }

    fn next(&self, value: T) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.status != Status::Active {
            return false;
        }
        Self::publish(&mut state, self.replay, value);
        true
    }

    fn error(&self, error: MapError) {
        if let Ok(mut state) = self.state.lock() {
            if state.status != Status::Active {
                return;
            }
            for tx in state.subscribers.drain(..) {
                let _ = tx.unbounded_send(Err(error.clone()));
            }
            state.status = Status::Failed(error);
        }
    }

    fn complete(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.status == Status::Active {
                state.status = Status::Completed;
                state.subscribers.clear();
            }
        }
    }

    fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        if let Ok(mut state) = self.state.lock() {
            match &state.status {
                Status::Active => {
                    if self.replay {
                        if let Some(latest) = state.latest.clone() {
                            let _ = tx.unbounded_send(Ok(latest));
                        }
                    }
                    state.subscribers.push(tx);
                }
                Status::Failed(error) => {
                    let _ = tx.unbounded_send(Err(error.clone()));
                }
                Status::Completed => {}
            }
        }
        Subscription { rx }
    }

    fn latest(&self) -> Option<T> {
        self.state.lock().ok()?.latest.clone()
    }

    fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .map(|mut state| {
                state.subscribers.retain(|tx| !tx.is_closed());
                state.subscribers.len()
            })
            .unwrap_or(0)
    }

    fn is_terminated(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.status != Status::Active)
            .unwrap_or(true)
    }
}

/// Broadcast subject without replay
///
/// Values published while nobody is subscribed are dropped.
pub struct PublishSubject<T> {
    core: SubjectCore<T>,
}

impl<T: Clone> PublishSubject<T> {
    pub fn new() -> Self {
        Self {
            core: SubjectCore::new(None, false),
        }
    }

    /// Publish to every current subscriber. Returns `false` once terminated.
    pub fn next(&self, value: T) -> bool {
        self.core.next(value)
    }

    pub fn error(&self, error: MapError) {
        self.core.error(error);
    }

    pub fn complete(&self) {
        self.core.complete();
    }

    pub fn subscribe(&self) -> Subscription<T> {
        self.core.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.core.subscriber_count()
    }

    pub fn is_terminated(&self) -> bool {
        self.core.is_terminated()
    }
}

impl<T: Clone> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

/// Subject that replays its latest value to new subscribers
pub struct BehaviorSubject<T> {
    core: SubjectCore<T>,
}

impl<T: Clone> BehaviorSubject<T> {
    /// Create a subject that already holds `initial`
    pub fn with_value(initial: T) -> Self {
        Self {
            core: SubjectCore::new(Some(initial), true),
        }
    }

    /// Create a subject with nothing to replay until the first `next`
    pub fn empty() -> Self {
        Self {
            core: SubjectCore::new(None, true),
        }
    }

    pub fn next(&self, value: T) -> bool {
        self.core.next(value)
    }

    pub fn error(&self, error: MapError) {
        self.core.error(error);
    }

    pub fn complete(&self) {
        self.core.complete();
    }

    pub fn subscribe(&self) -> Subscription<T> {
        self.core.subscribe()
    }

    /// The value a new subscriber would receive first
    pub fn value(&self) -> Option<T> {
        self.core.latest()
    }

    pub fn subscriber_count(&self) -> usize {
        self.core.subscriber_count()
    }

    pub fn is_terminated(&self) -> bool {
        self.core.is_terminated()
    }
}

impl<T: Clone + PartialEq> BehaviorSubject<T> {
    /// Publish `value` only if it differs from the held one.
    ///
    /// The comparison and the publication happen under one lock, so two
    /// writers can never both observe the old value.
    pub fn next_if_changed(&self, value: T) -> bool {
        let Ok(mut state) = self.core.state.lock() else {
            return false;
        };
        if state.status != Status::Active || state.latest.as_ref() == Some(&value) {
            return false;
        }
        SubjectCore::publish(&mut state, true, value);
        true
    }

    /// Replace the held value with `f(current)` under the subject's lock,
    /// publishing only if it changed. Returns the previous and the new value
    /// when something was published; an empty subject is left alone.
    pub fn update<F>(&self, f: F) -> Option<(T, T)>
    where
        F: FnOnce(&T) -> T,
    {
        let Ok(mut state) = self.core.state.lock() else {
            return None;
        };
        if state.status != Status::Active {
            return None;
        }
        let current = state.latest.clone()?;
        let next = f(&current);
        if next == current {
            return None;
        }
        SubjectCore::publish(&mut state, true, next.clone());
        Some((current, next))
    }
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Observer<T> for PublishSubject<T> {
    fn on_next(&self, value: T) {
        self.next(value);
    }

    fn on_error(&self, error: MapError) {
        self.error(error);
    }

    fn on_complete(&self) {
        self.complete();
    }
}

impl<T: Clone + Send + 'static> Observer<T> for BehaviorSubject<T> {
    fn on_next(&self, value: T) {
        self.next(value);
    }

    fn on_error(&self, error: MapError) {
        self.error(error);
    }

    fn on_complete(&self) {
        self.complete();
    }
}

/// A single subscriber's view of a subject
///
/// Ends after an `Err` item, on completion, or when every handle to the
/// subject has been dropped.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: UnboundedReceiver<Result<T>>,
}

impl<T> Subscription<T> {
    /// Wait for the next item
    pub async fn recv(&mut self) -> Option<Result<T>> {
        self.rx.next().await
    }

    /// Take the next item if one is already queued (non-blocking)
    pub fn try_recv(&mut self) -> Option<Result<T>> {
        self.rx.next().now_or_never().flatten()
    }

    /// Take every queued item (non-blocking)
    pub fn drain(&mut self) -> Vec<Result<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.try_recv() {
            items.push(item);
        }
        items
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}
