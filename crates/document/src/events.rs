//! Change notification for document observers.
//!
//! Delivery is synchronous and single-threaded: every store mutation emits
//! its event(s) immediately, handlers run to completion in subscription
//! order before the mutating call returns. There is no queueing and no
//! coalescing.

use crate::layer::LayerId;
use smallvec::SmallVec;
use std::fmt;

/// Which part of a layer changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerAspect {
    Name,
    Visibility,
    Selection,
    Offset,
    /// Paint-order position changed.
    Order,
    Content,
}

/// Events emitted by the layer store.
///
/// Membership changes are two-phase: views that mirror the store into rows
/// get a chance to pre-allocate before the item exists (`AboutToInsert`)
/// and to tear down while the index is still valid (`AboutToRemove`).
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    AboutToInsert { index: usize },
    Inserted { id: LayerId },
    AboutToRemove { index: usize },
    Removed { id: LayerId },
    Changed { id: LayerId, aspect: LayerAspect },
    SelectionChanged { selected: SmallVec<[LayerId; 4]> },
}

/// Token returned by [`ChangeNotifier::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Handler = Box<dyn FnMut(&ChangeEvent)>;

/// Publish/subscribe hub for store events.
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: Vec<(SubscriberId, Handler)>,
    next_id: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers are invoked in subscription order.
    pub fn subscribe(&mut self, handler: impl FnMut(&ChangeEvent) + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every subscriber, in subscription order.
    pub fn emit(&mut self, event: &ChangeEvent) {
        for (_, handler) in &mut self.subscribers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_delivery_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = ChangeNotifier::new();

        let first = Rc::clone(&log);
        notifier.subscribe(move |_| first.borrow_mut().push("first"));
        let second = Rc::clone(&log);
        notifier.subscribe(move |_| second.borrow_mut().push("second"));

        notifier.emit(&ChangeEvent::AboutToInsert { index: 0 });
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut notifier = ChangeNotifier::new();

        let counter = Rc::clone(&count);
        let id = notifier.subscribe(move |_| *counter.borrow_mut() += 1);

        notifier.emit(&ChangeEvent::AboutToInsert { index: 0 });
        assert!(notifier.unsubscribe(id));
        notifier.emit(&ChangeEvent::AboutToInsert { index: 1 });

        assert_eq!(*count.borrow(), 1);
        assert!(!notifier.unsubscribe(id));
    }

    #[test]
    fn test_every_event_delivered_individually() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = ChangeNotifier::new();

        let sink = Rc::clone(&log);
        notifier.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        notifier.emit(&ChangeEvent::AboutToInsert { index: 3 });
        notifier.emit(&ChangeEvent::AboutToInsert { index: 4 });

        assert_eq!(
            *log.borrow(),
            vec![
                ChangeEvent::AboutToInsert { index: 3 },
                ChangeEvent::AboutToInsert { index: 4 },
            ]
        );
    }
}
