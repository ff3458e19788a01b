//! Stage lifecycle notification.
//!
//! Observers are called synchronously, in stage order, from inside the
//! pipeline's own control flow. [`EventBus`] turns the same notifications
//! into a broadcast stream of [`PipelineEvent`]s for consumers that prefer
//! channels; events are fire-and-forget projections.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::result::StageResult;
use crate::stage::StageName;

/// Receives stage lifecycle notifications.
///
/// Every method defaults to a no-op, so implementors pick what they need.
pub trait PipelineObserver: Send + Sync {
    /// A stage was dispatched.
    fn on_stage_start(&self, _stage: StageName) {}

    /// A stage reached a result.
    fn on_stage_complete(&self, _result: &StageResult) {}

    /// `completed` of `total` selected stages have reported.
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

type StageStartFn = Box<dyn Fn(StageName) + Send + Sync>;
type StageCompleteFn = Box<dyn Fn(&StageResult) + Send + Sync>;
type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// An observer assembled from up to three optional closures.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use nasnet_validation::{Callbacks, PipelineObserver, StageName};
///
/// let started = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&started);
/// let callbacks = Callbacks::new().on_stage_start(move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// PipelineObserver::on_stage_start(&callbacks, StageName::Schema);
/// assert_eq!(started.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct Callbacks {
    stage_start: Option<StageStartFn>,
    stage_complete: Option<StageCompleteFn>,
    progress: Option<ProgressFn>,
}

impl Callbacks {
    /// Create an empty set of callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stage-start callback.
    #[must_use]
    pub fn on_stage_start(mut self, f: impl Fn(StageName) + Send + Sync + 'static) -> Self {
        self.stage_start = Some(Box::new(f));
        self
    }

    /// Set the stage-complete callback.
    #[must_use]
    pub fn on_stage_complete(mut self, f: impl Fn(&StageResult) + Send + Sync + 'static) -> Self {
        self.stage_complete = Some(Box::new(f));
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }
}

impl PipelineObserver for Callbacks {
    fn on_stage_start(&self, stage: StageName) {
        if let Some(f) = &self.stage_start {
            f(stage);
        }
    }

    fn on_stage_complete(&self, result: &StageResult) {
        if let Some(f) = &self.stage_complete {
            f(result);
        }
    }

    fn on_progress(&self, completed: usize, total: usize) {
        if let Some(f) = &self.progress {
            f(completed, total);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("stage_start", &self.stage_start.is_some())
            .field("stage_complete", &self.stage_complete.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Stage lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A stage was dispatched.
    StageStarted {
        /// The stage.
        stage: StageName,
    },
    /// A stage reached a result.
    StageCompleted {
        /// The stage's result.
        result: StageResult,
    },
    /// Progress over the selected stages.
    Progress {
        /// Stages reported so far.
        completed: usize,
        /// Stages selected for the run.
        total: usize,
    },
}

/// Observer that republishes lifecycle notifications on a broadcast channel.
///
/// Publishing never waits: with nobody subscribed an event is counted and
/// discarded, and a subscriber that falls more than `capacity` events
/// behind loses the oldest ones.
///
/// # Examples
///
/// ```
/// use nasnet_validation::{EventBus, PipelineEvent, PipelineObserver, StageName};
///
/// let bus = EventBus::new(64);
/// let mut sub = bus.subscribe();
///
/// bus.on_stage_start(StageName::Schema);
///
/// assert_eq!(
///     sub.try_recv(),
///     Some(PipelineEvent::StageStarted { stage: StageName::Schema })
/// );
/// assert_eq!(bus.total_emitted(), 1);
/// ```
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    published: AtomicU64,
}

impl EventBus {
    /// Bus that buffers up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            published: AtomicU64::new(0),
        }
    }

    /// Publish `event` to current subscribers.
    pub fn emit(&self, event: PipelineEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(event).is_err() {
            tracing::trace!("pipeline event dropped, no subscribers");
        }
    }

    /// New subscriber that sees events published from now on.
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Events published over the bus's lifetime, delivered or not.
    #[must_use]
    pub fn total_emitted(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl PipelineObserver for EventBus {
    fn on_stage_start(&self, stage: StageName) {
        self.emit(PipelineEvent::StageStarted { stage });
    }

    fn on_stage_complete(&self, result: &StageResult) {
        self.emit(PipelineEvent::StageCompleted {
            result: result.clone(),
        });
    }

    fn on_progress(&self, completed: usize, total: usize) {
        self.emit(PipelineEvent::Progress { completed, total });
    }
}

/// Receiving end of an [`EventBus`].
///
/// Lagging skips ahead to the oldest event still buffered.
#[derive(Debug)]
pub struct EventSubscriber {
    rx: broadcast::Receiver<PipelineEvent>,
}

impl EventSubscriber {
    /// Wait for the next event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        use broadcast::error::RecvError;

        loop {
            match self.rx.recv().await {
                Ok(event) => break Some(event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "pipeline event subscriber lagged");
                }
                Err(RecvError::Closed) => break None,
            }
        }
    }

    /// Next buffered event, if any.
    pub fn try_recv(&mut self) -> Option<PipelineEvent> {
        use broadcast::error::TryRecvError;

        loop {
            match self.rx.try_recv() {
                Ok(event) => break Some(event),
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "pipeline event subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break None,
            }
        }
    }
}

/// Fans notifications out to every registered observer, in registration order.
#[derive(Clone, Default)]
pub(crate) struct Notifier {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl Notifier {
    pub(crate) fn push(&mut self, observer: Arc<dyn PipelineObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn stage_started(&self, stage: StageName) {
        for observer in &self.observers {
            observer.on_stage_start(stage);
        }
    }

    pub(crate) fn stage_completed(&self, result: &StageResult) {
        for observer in &self.observers {
            observer.on_stage_complete(result);
        }
    }

    pub(crate) fn progress(&self, completed: usize, total: usize) {
        for observer in &self.observers {
            observer.on_progress(completed, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageStatus;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[test]
    fn publishing_with_nobody_listening_still_counts() {
        let bus = EventBus::new(16);
        bus.on_progress(1, 2);
        assert_eq!(bus.total_emitted(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn observer_methods_map_to_events() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        let result = StageResult::new(StageName::Network, StageStatus::Passed);

        bus.on_stage_start(StageName::Network);
        bus.on_stage_complete(&result);
        bus.on_progress(3, 4);

        assert_eq!(
            sub.try_recv(),
            Some(PipelineEvent::StageStarted {
                stage: StageName::Network
            })
        );
        assert_eq!(sub.try_recv(), Some(PipelineEvent::StageCompleted { result }));
        assert_eq!(
            sub.try_recv(),
            Some(PipelineEvent::Progress {
                completed: 3,
                total: 4
            })
        );
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn subscriber_receives_via_recv() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        bus.on_stage_start(StageName::DryRun);

        let event = sub.recv().await.unwrap();
        assert_eq!(
            event,
            PipelineEvent::StageStarted {
                stage: StageName::DryRun
            }
        );
    }

    #[test]
    fn event_serialization_is_tagged() {
        let json = serde_json::to_value(PipelineEvent::Progress {
            completed: 1,
            total: 3,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "progress", "completed": 1, "total": 3 })
        );
    }

    #[test]
    fn callbacks_only_fire_when_set() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callbacks = Callbacks::new().on_progress(move |done, total| {
            sink.lock().push((done, total));
        });

        PipelineObserver::on_stage_start(&callbacks, StageName::Schema);
        PipelineObserver::on_stage_complete(&callbacks, &StageResult::skipped(StageName::Schema));
        PipelineObserver::on_progress(&callbacks, 1, 2);

        assert_eq!(*seen.lock(), vec![(1, 2)]);
    }

    #[test]
    fn notifier_fans_out_in_order() {
        struct Recorder(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl PipelineObserver for Recorder {
            fn on_stage_start(&self, _stage: StageName) {
                self.1.lock().push(self.0);
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = Notifier::default();
        notifier.push(Arc::new(Recorder("first", Arc::clone(&log))));
        notifier.push(Arc::new(Recorder("second", Arc::clone(&log))));

        notifier.stage_started(StageName::Schema);
        assert_eq!(notifier.len(), 2);
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }
}
