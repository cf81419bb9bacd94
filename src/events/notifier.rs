//! # Event Notifier
//!
//! In-process pub/sub for pipeline events.
//!
//! Subscribers register a set of callbacks, one per event type they care
//! about. Publishing runs every callback registered for the event's type,
//! synchronously and in registration order. Callbacks cannot report failure
//! back to the publisher.
//!
//! The registry lock is only held to snapshot the callbacks, never while
//! they run, so a callback may itself register new subscribers.

use super::{Event, EventType};
use crate::observability::metrics;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Callbacks of one subscriber; unset ones are skipped
#[derive(Default, Clone)]
pub struct EventHandlers {
    pub on_pipeline_started: Option<Callback>,
    pub on_pipeline_completed: Option<Callback>,
    pub on_pipeline_finalized: Option<Callback>,
    pub on_pipeline_input_started: Option<Callback>,
    pub on_pipeline_input_proceeded: Option<Callback>,
    pub on_pipeline_input_aborted: Option<Callback>,
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribed: Vec<&str> = EventType::ALL
            .into_iter()
            .filter(|t| self.slot(*t).is_some())
            .map(|t| t.as_str())
            .collect();
        f.debug_struct("EventHandlers")
            .field("subscribed", &subscribed)
            .finish()
    }
}

impl EventHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback for `event_type`, replacing any earlier one
    #[must_use]
    pub fn on(mut self, event_type: EventType, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        *self.slot_mut(event_type) = Some(Arc::new(f));
        self
    }

    /// Same callback for every event type
    #[must_use]
    pub fn on_all(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        let f: Callback = Arc::new(f);
        for event_type in EventType::ALL {
            *self.slot_mut(event_type) = Some(f.clone());
        }
        self
    }

    #[must_use]
    pub fn on_pipeline_started(self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on(EventType::PipelineStarted, f)
    }

    #[must_use]
    pub fn on_pipeline_completed(self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on(EventType::PipelineCompleted, f)
    }

    #[must_use]
    pub fn on_pipeline_finalized(self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on(EventType::PipelineFinalized, f)
    }

    #[must_use]
    pub fn on_pipeline_input_started(self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on(EventType::PipelineInputStarted, f)
    }

    #[must_use]
    pub fn on_pipeline_input_proceeded(self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on(EventType::PipelineInputProceeded, f)
    }

    #[must_use]
    pub fn on_pipeline_input_aborted(self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on(EventType::PipelineInputAborted, f)
    }

    fn slot(&self, event_type: EventType) -> Option<&Callback> {
        match event_type {
            EventType::PipelineStarted => self.on_pipeline_started.as_ref(),
            EventType::PipelineCompleted => self.on_pipeline_completed.as_ref(),
            EventType::PipelineFinalized => self.on_pipeline_finalized.as_ref(),
            EventType::PipelineInputStarted => self.on_pipeline_input_started.as_ref(),
            EventType::PipelineInputProceeded => self.on_pipeline_input_proceeded.as_ref(),
            EventType::PipelineInputAborted => self.on_pipeline_input_aborted.as_ref(),
        }
    }

    fn slot_mut(&mut self, event_type: EventType) -> &mut Option<Callback> {
        match event_type {
            EventType::PipelineStarted => &mut self.on_pipeline_started,
            EventType::PipelineCompleted => &mut self.on_pipeline_completed,
            EventType::PipelineFinalized => &mut self.on_pipeline_finalized,
            EventType::PipelineInputStarted => &mut self.on_pipeline_input_started,
            EventType::PipelineInputProceeded => &mut self.on_pipeline_input_proceeded,
            EventType::PipelineInputAborted => &mut self.on_pipeline_input_aborted,
        }
    }
}

/// Pipeline event bus, shared as `Arc<EventNotifier>`
#[derive(Default)]
pub struct EventNotifier {
    listeners: RwLock<HashMap<EventType, Vec<Callback>>>,
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(t, callbacks)| (t.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("EventNotifier")
            .field("listeners", &counts)
            .finish()
    }
}

impl EventNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber's callbacks after those already registered
    pub fn register_event_handler(&self, handlers: EventHandlers) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for event_type in EventType::ALL {
            if let Some(callback) = handlers.slot(event_type) {
                listeners
                    .entry(event_type)
                    .or_default()
                    .push(callback.clone());
            }
        }
    }

    /// Deliver `event` to every callback registered for its type
    pub fn notify(&self, event: &Event) {
        let callbacks: Vec<Callback> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            let event = event.clone();
            callback(&event);
        }
    }

    /// Callbacks currently registered for `event_type`
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

/// Structured log line and metric for every pipeline event
pub fn register_default_subscribers(notifier: &EventNotifier) {
    notifier.register_event_handler(EventHandlers::new().on_all(|event| {
        let state = &event.args.pipeline_state;
        let build = state.build.as_ref();
        info!(
            event_type = %event.event_type,
            time = %event.time().map(|t| t.to_rfc3339()).unwrap_or_default(),
            project = %state.project_id,
            pipeline = %state.pipeline,
            build.number = build.map_or(0, |b| b.number),
            build.status = build.map_or("", |b| b.status.as_str()),
            "pipeline event"
        );
    }));
    notifier.register_event_handler(
        EventHandlers::new()
            .on_all(|event| metrics::increment_pipeline_events(event.event_type.as_str())),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventArgs;
    use std::sync::Mutex;

    fn event(event_type: EventType) -> Event {
        Event {
            timestamp: 1_700_000_000_000,
            event_type,
            args: EventArgs::default(),
        }
    }

    #[test]
    fn test_only_subscribed_types_are_delivered() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        notifier.register_event_handler(
            EventHandlers::new()
                .on_pipeline_completed(move |e| sink.lock().unwrap().push(e.event_type)),
        );

        notifier.notify(&event(EventType::PipelineStarted));
        notifier.notify(&event(EventType::PipelineCompleted));

        assert_eq!(*seen.lock().unwrap(), vec![EventType::PipelineCompleted]);
        assert_eq!(notifier.listener_count(EventType::PipelineStarted), 0);
        assert_eq!(notifier.listener_count(EventType::PipelineCompleted), 1);
    }

    #[test]
    fn test_callback_may_register_without_deadlock() {
        let notifier = Arc::new(EventNotifier::new());
        let inner = notifier.clone();
        notifier.register_event_handler(EventHandlers::new().on_pipeline_started(move |_| {
            inner.register_event_handler(EventHandlers::new().on_pipeline_finalized(|_| {}));
        }));

        notifier.notify(&event(EventType::PipelineStarted));

        assert_eq!(notifier.listener_count(EventType::PipelineFinalized), 1);
    }

    #[test]
    fn test_default_subscribers_cover_all_types() {
        let notifier = EventNotifier::new();
        register_default_subscribers(&notifier);
        for event_type in EventType::ALL {
            assert_eq!(notifier.listener_count(event_type), 2);
        }
        notifier.notify(&event(EventType::PipelineInputAborted));
    }
}
