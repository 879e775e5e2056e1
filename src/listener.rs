use crate::{measure::Measurement, tags::TagMap, view::View};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::debug;
use std::sync::Arc;

/// Push-style observer of the stats registrar.
///
/// Callbacks run synchronously on the thread that registered the view or recorded the
/// measurement, so implementations should return quickly.
pub trait StatsEventListener: Send + Sync {
    /// Called once when a view is registered for the first time.
    fn on_register_view(&self, view: &Arc<View>);

    /// Called once per recorded measurement, with every registered view of its measure.
    fn on_record(&self, views: &[Arc<View>], measurement: &Measurement, tags: &TagMap);
}

/// An event forwarded by a `ChannelListener`.
#[derive(Clone, Debug)]
pub enum StatsEvent {
    ViewRegistered(Arc<View>),
    Recorded {
        views: Vec<Arc<View>>,
        measurement: Measurement,
        tags: TagMap,
    },
}

/// A listener that forwards every event into a bounded channel.
///
/// Sending never blocks: when the channel is full or the receiving side is gone, the event is
/// dropped.
#[derive(Clone, Debug)]
pub struct ChannelListener {
    tx: Sender<StatsEvent>,
}

impl ChannelListener {
    pub fn bounded(capacity: usize) -> (ChannelListener, Receiver<StatsEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (ChannelListener { tx }, rx)
    }

    fn send(&self, event: StatsEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => debug!("listener channel full, dropping event"),
            Err(TrySendError::Disconnected(_)) => debug!("listener channel disconnected, dropping event"),
        }
    }
}

impl StatsEventListener for ChannelListener {
    fn on_register_view(&self, view: &Arc<View>) {
        self.send(StatsEvent::ViewRegistered(Arc::clone(view)));
    }

    fn on_record(&self, views: &[Arc<View>], measurement: &Measurement, tags: &TagMap) {
        self.send(StatsEvent::Recorded {
            views: views.to_vec(),
            measurement: measurement.clone(),
            tags: tags.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelListener, StatsEvent, StatsEventListener};
    use crate::{
        clock::Clock,
        data::AggregationType,
        hashing::HashStrategy,
        measure::{Measure, MeasureType},
        tags::TagMap,
        view::View,
    };
    use std::sync::Arc;

    fn view() -> Arc<View> {
        let measure = Measure::new("latency", "ms", "", MeasureType::Double).unwrap();
        Arc::new(
            View::new(
                "latency_sum",
                measure,
                AggregationType::Sum,
                Vec::new(),
                "",
                None,
                Clock::new(),
                HashStrategy::default(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_forwards_events() {
        let (listener, rx) = ChannelListener::bounded(4);
        let view = view();
        listener.on_register_view(&view);
        let measurement = view.measure().measurement(2.0);
        listener.on_record(&[view.clone()], &measurement, &TagMap::new());

        match rx.try_recv().unwrap() {
            StatsEvent::ViewRegistered(v) => assert!(Arc::ptr_eq(&v, &view)),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            StatsEvent::Recorded { views, measurement, .. } => {
                assert_eq!(views.len(), 1);
                assert_eq!(measurement.value, 2.0);
            },
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_full_channel_drops() {
        let (listener, rx) = ChannelListener::bounded(1);
        let view = view();
        listener.on_register_view(&view);
        listener.on_register_view(&view);
        assert_eq!(rx.len(), 1);

        drop(rx);
        listener.on_register_view(&view);
    }
}
