use crate::data::Metric;
use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// A source of metrics that an exporter can poll.
pub trait MetricProducer: Send + Sync {
    /// Returns the current state of every metric this producer owns.
    fn get_metrics(&self) -> Vec<Metric>;
}

fn identity(producer: &Arc<dyn MetricProducer>) -> usize {
    Arc::as_ptr(producer) as *const () as usize
}

/// A set of metric producers, keyed by identity.
///
/// Cloning the manager is cheap and clones share the same set.
#[derive(Clone, Default)]
pub struct MetricProducerManager {
    producers: Arc<RwLock<HashMap<usize, Arc<dyn MetricProducer>, FnvBuildHasher>>>,
}

impl MetricProducerManager {
    pub fn new() -> MetricProducerManager {
        Default::default()
    }

    /// Adds a producer.  Adding the same producer twice is a no-op.
    pub fn add(&self, producer: Arc<dyn MetricProducer>) {
        self.producers.write().entry(identity(&producer)).or_insert(producer);
    }

    /// Removes a producer, returning whether it was present.
    pub fn remove(&self, producer: &Arc<dyn MetricProducer>) -> bool {
        self.producers.write().remove(&identity(producer)).is_some()
    }

    pub fn remove_all(&self) {
        self.producers.write().clear();
    }

    /// A snapshot of the current producers.  Later changes to the manager do not affect it.
    pub fn get_all_metric_producers(&self) -> Vec<Arc<dyn MetricProducer>> {
        self.producers.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.producers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.read().is_empty()
    }
}

impl std::fmt::Debug for MetricProducerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MetricProducerManager")
            .field("producers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{MetricProducer, MetricProducerManager};
    use crate::data::Metric;
    use std::sync::Arc;

    struct Empty;

    impl MetricProducer for Empty {
        fn get_metrics(&self) -> Vec<Metric> {
            Vec::new()
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let manager = MetricProducerManager::new();
        let producer: Arc<dyn MetricProducer> = Arc::new(Empty);

        manager.add(producer.clone());
        manager.add(producer.clone());
        assert_eq!(manager.len(), 1);

        manager.add(Arc::new(Empty));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_remove() {
        let manager = MetricProducerManager::new();
        let a: Arc<dyn MetricProducer> = Arc::new(Empty);
        let b: Arc<dyn MetricProducer> = Arc::new(Empty);
        manager.add(a.clone());
        manager.add(b.clone());

        assert!(manager.remove(&a));
        assert!(!manager.remove(&a));
        let remaining = manager.get_all_metric_producers();
        assert_eq!(remaining.len(), 1);
        assert!(Arc::ptr_eq(&remaining[0], &b));

        manager.remove_all();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let manager = MetricProducerManager::new();
        manager.add(Arc::new(Empty));
        let snapshot = manager.get_all_metric_producers();

        manager.remove_all();
        assert_eq!(snapshot.len(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let manager = MetricProducerManager::new();
        let clone = manager.clone();
        clone.add(Arc::new(Empty));
        assert_eq!(manager.len(), 1);
    }
}
