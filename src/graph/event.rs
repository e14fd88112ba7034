//! Graph change events
//!
//! Listeners are invoked synchronously, in registration order, after the
//! mutation they describe has completed.

use super::feature::FeatureValue;
use super::types::Identifier;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded(Identifier),
    NodeRemoved(Identifier),
    EdgeAdded(Identifier),
    EdgeRemoved(Identifier),
    FeatureSet {
        item: Identifier,
        feature: String,
        previous: FeatureValue,
        current: FeatureValue,
    },
    /// Informational: a model consuming the graph finished
    ModelCompleted { model: String },
    /// Informational free-form message
    Custom(String),
}

/// Observer of graph changes
pub trait GraphListener: Send + Sync {
    fn on_event(&self, event: &GraphEvent);
}

impl<F> GraphListener for F
where
    F: Fn(&GraphEvent) + Send + Sync,
{
    fn on_event(&self, event: &GraphEvent) {
        self(event)
    }
}

/// Handle returned by `add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

/// Ordered listener registry
#[derive(Default)]
pub struct ListenerList {
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn GraphListener>)>,
}

impl ListenerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn GraphListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn dispatch(&self, event: &GraphEvent) {
        for (_, listener) in &self.listeners {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::StoreId;
    use std::sync::Mutex;

    fn id(obj: &str) -> Identifier {
        Identifier::new(StoreId::new("G", "g"), "Person", obj)
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut list = ListenerList::new();

        let first = Arc::clone(&log);
        list.add(Arc::new(move |e: &GraphEvent| first.lock().unwrap().push(("first", e.clone()))));
        let second = Arc::clone(&log);
        list.add(Arc::new(move |e: &GraphEvent| second.lock().unwrap().push(("second", e.clone()))));

        list.dispatch(&GraphEvent::NodeAdded(id("p1")));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "first");
        assert_eq!(log[1].0, "second");
    }

    #[test]
    fn test_remove_listener() {
        let count = Arc::new(Mutex::new(0));
        let mut list = ListenerList::new();
        let c = Arc::clone(&count);
        let lid = list.add(Arc::new(move |_: &GraphEvent| *c.lock().unwrap() += 1));

        list.dispatch(&GraphEvent::Custom("a".into()));
        assert!(list.remove(lid));
        assert!(!list.remove(lid));
        list.dispatch(&GraphEvent::Custom("b".into()));

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(list.is_empty());
    }
}
