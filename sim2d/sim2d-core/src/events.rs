//! Synchronous event dispatch.

use hashbrown::HashMap;
use sim2d_types::{EventKind, WorldEvent};
use std::fmt;

/// Handle returned by [`crate::World::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Raw value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Event callback.
pub type Handler = Box<dyn FnMut(&WorldEvent)>;

/// Per-kind handler lists, called in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<EventKind, Vec<(HandlerId, Handler)>>,
    next_id: u64,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EventDispatcher {
    /// Empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to events of `kind`.
    pub fn on(&mut self, kind: EventKind, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    /// Unsubscribe. Returns whether the handler existed.
    pub fn off(&mut self, id: HandlerId) -> bool {
        for list in self.handlers.values_mut() {
            if let Some(i) = list.iter().position(|(h, _)| *h == id) {
                drop(list.remove(i));
                return true;
            }
        }
        false
    }

    /// Whether anyone listens to `kind`.
    #[must_use]
    pub fn wants(&self, kind: EventKind) -> bool {
        self.handlers.get(&kind).is_some_and(|list| !list.is_empty())
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every handler of the event's kind.
    pub fn emit(&mut self, event: &WorldEvent) {
        if let Some(list) = self.handlers.get_mut(&event.kind()) {
            for (_, handler) in list.iter_mut() {
                handler(event);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use sim2d_types::BodyId;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_and_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        let sink = Rc::clone(&seen);
        let id = dispatcher.on(
            EventKind::BodyCreated,
            Box::new(move |event| sink.borrow_mut().push(event.clone())),
        );
        assert!(dispatcher.wants(EventKind::BodyCreated));
        assert!(!dispatcher.wants(EventKind::BodyDestroyed));

        dispatcher.emit(&WorldEvent::BodyCreated(BodyId::new(1)));
        dispatcher.emit(&WorldEvent::BodyDestroyed(BodyId::new(1)));
        assert_eq!(*seen.borrow(), vec![WorldEvent::BodyCreated(BodyId::new(1))]);

        assert!(dispatcher.off(id));
        // The removed handler and everything it captured are released.
        assert_eq!(Rc::strong_count(&seen), 1);
        assert!(!dispatcher.off(id));
        assert!(dispatcher.is_empty());
        dispatcher.emit(&WorldEvent::BodyCreated(BodyId::new(2)));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for tag in 0..3 {
            let order = Rc::clone(&order);
            dispatcher.on(
                EventKind::PreStep,
                Box::new(move |_| order.borrow_mut().push(tag)),
            );
        }
        dispatcher.emit(&WorldEvent::PreStep { dt: 0.1 });
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
