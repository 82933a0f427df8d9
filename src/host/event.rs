//! Pooled synthetic events.
//!
//! The host recycles event objects: once a dispatch returns, an event that
//! was not persisted is cleared and handed out again by the next dispatch.
//! Anything that reads an event later (a queued state transition, for
//! example) must call [`Event::persist`] first, or it will see whatever the
//! pool has put there since.
//!
//! # Example
//!
//! ```ignore
//! let pool = EventPool::new();
//! pool.dispatch("click", props! { "x" => 3 }, |event| {
//!     on_click.call(&[event.clone().into()])
//! })?;
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::types::Value;

struct EventInner {
    kind: RefCell<Rc<str>>,
    payload: RefCell<Value>,
    persisted: Cell<bool>,
}

/// An event handed to callbacks during a dispatch.
#[derive(Clone)]
pub struct Event(Rc<EventInner>);

impl Event {
    /// Standalone event, not owned by any pool.
    pub fn new(kind: &str, payload: impl Into<Value>) -> Self {
        Event(Rc::new(EventInner {
            kind: RefCell::new(kind.into()),
            payload: RefCell::new(payload.into()),
            persisted: Cell::new(false),
        }))
    }

    pub fn kind(&self) -> Rc<str> {
        self.0.kind.borrow().clone()
    }

    /// Current payload. Null once a pooled event has been released.
    pub fn payload(&self) -> Value {
        self.0.payload.borrow().clone()
    }

    /// Detach from the pool so the payload survives the dispatch.
    pub fn persist(&self) {
        self.0.persisted.set(true);
    }

    pub fn is_persisted(&self) -> bool {
        self.0.persisted.get()
    }

    pub fn ptr_eq(&self, other: &Event) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn reset(&self, kind: &str, payload: Value) {
        *self.0.kind.borrow_mut() = kind.into();
        *self.0.payload.borrow_mut() = payload;
    }

    fn clear(&self) {
        *self.0.payload.borrow_mut() = Value::Null;
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind())
            .field("persisted", &self.is_persisted())
            .finish()
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Single-slot event pool.
#[derive(Default)]
pub struct EventPool {
    free: RefCell<Option<Event>>,
}

impl EventPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `f` an event, then recycle it unless `f` persisted it.
    pub fn dispatch<R>(&self, kind: &str, payload: impl Into<Value>, f: impl FnOnce(&Event) -> R) -> R {
        let payload = payload.into();
        let event = match self.free.borrow_mut().take() {
            Some(event) => {
                event.reset(kind, payload);
                event
            }
            None => Event::new(kind, payload),
        };

        let out = f(&event);

        if !event.is_persisted() {
            event.clear();
            *self.free.borrow_mut() = Some(event);
        }
        out
    }
}
