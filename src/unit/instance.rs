//! Stateful instances - Owned state, ordered transition queue, lifecycle context.
//!
//! Each mounted stateful unit gets one [`InstanceCell`]. The cell owns:
//! - the props the instance last rendered with
//! - the instance state (replaced, never mutated in place)
//! - a FIFO queue of pending state transitions
//! - the host subtree the instance rendered
//!
//! Transitions are applied strictly in submission order. Each one reads the
//! state produced by the previous one, never a snapshot taken when it was
//! queued.
//!
//! Code outside the host only ever sees a [`Cx`] (borrowed, during a hook or
//! render) or a [`Handle`] (weak, safe to keep in closures). Once an instance
//! is torn down, every queued and future transition is dropped.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::error::{EnhanceError, Result};
use crate::host::{Mounted, Scheduler};
use crate::types::{Props, Value};

use super::{Component, StatefulUnit, Unit};

/// Queued state transition: `(current_state, current_props) -> partial_state`.
pub(crate) type Transition = Box<dyn FnOnce(&Props, &Props) -> Result<Props>>;

/// Custom instance method declared through a lifecycle hook set.
pub type Method = Rc<dyn Fn(&Cx<'_>, &[Value]) -> Result<Value>>;

thread_local! {
    static NEXT_INSTANCE_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.with(|id| {
        let current = id.get();
        id.set(current + 1);
        current
    })
}

// =============================================================================
// Instance cell
// =============================================================================

pub(crate) struct InstanceCell {
    pub(crate) id: u64,
    pub(crate) unit: Unit,
    component: Box<dyn Component>,
    props: RefCell<Props>,
    state: RefCell<Props>,
    queue: RefCell<VecDeque<Transition>>,
    forced: Cell<bool>,
    alive: Cell<bool>,
    pub(crate) child: RefCell<Mounted>,
    scheduler: Weak<Scheduler>,
}

impl InstanceCell {
    /// Instantiate `def` and compute its initial state from `props`.
    pub(crate) fn create(
        def: &Rc<StatefulUnit>,
        props: Props,
        scheduler: Weak<Scheduler>,
    ) -> Result<Rc<Self>> {
        let unit = Unit::Stateful(def.clone());
        let cell = Rc::new_cyclic(|weak: &Weak<InstanceCell>| InstanceCell {
            id: next_instance_id(),
            unit,
            component: def.instantiate(&Handle(weak.clone())),
            props: RefCell::new(props),
            state: RefCell::new(Props::new()),
            queue: RefCell::new(VecDeque::new()),
            forced: Cell::new(false),
            alive: Cell::new(true),
            child: RefCell::new(Mounted::Empty),
            scheduler,
        });

        let initial = cell.component.initial_state(&cell.props())?;
        *cell.state.borrow_mut() = initial;
        trace!(id = cell.id, unit = %cell.unit.name(), "instance created");
        Ok(cell)
    }

    pub(crate) fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    pub(crate) fn cx<'a>(self: &'a Rc<Self>) -> Cx<'a> {
        Cx {
            cell: self,
            methods: None,
        }
    }

    pub(crate) fn props(&self) -> Props {
        self.props.borrow().clone()
    }

    pub(crate) fn state(&self) -> Props {
        self.state.borrow().clone()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Pending work that a flush should pick up.
    pub(crate) fn needs_update(&self) -> bool {
        self.alive.get() && (self.forced.get() || !self.queue.borrow().is_empty())
    }

    pub(crate) fn take_forced(&self) -> bool {
        self.forced.replace(false)
    }

    pub(crate) fn commit(&self, props: Props, state: Props) {
        *self.props.borrow_mut() = props;
        *self.state.borrow_mut() = state;
    }

    /// Fold every queued transition over the current state, in order.
    ///
    /// On failure the transitions already applied are kept as a staged state
    /// at the head of the queue, the failing one is dropped, and the rest stay
    /// queued for the next flush.
    pub(crate) fn drain_queue(&self, props: &Props) -> Result<Props> {
        let mut next = self.state();
        loop {
            let Some(transition) = self.queue.borrow_mut().pop_front() else {
                return Ok(next);
            };
            match transition(&next, props) {
                Ok(partial) => next = next.merge(&partial),
                Err(err) => {
                    let staged = next;
                    self.queue
                        .borrow_mut()
                        .push_front(Box::new(move |_, _| Ok(staged)));
                    return Err(err);
                }
            }
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    /// Stop accepting updates. Returns false if the instance was already dead.
    pub(crate) fn retire(&self) -> bool {
        let was_alive = self.alive.replace(false);
        self.queue.borrow_mut().clear();
        self.forced.set(false);
        was_alive
    }

    fn enqueue(self: &Rc<Self>, transition: Transition) -> Result<()> {
        if !self.alive.get() {
            debug!(id = self.id, unit = %self.unit.name(), "state update dropped: instance unmounted");
            return Ok(());
        }
        self.queue.borrow_mut().push_back(transition);
        self.schedule()
    }

    fn force(self: &Rc<Self>) -> Result<()> {
        if !self.alive.get() {
            return Ok(());
        }
        self.forced.set(true);
        self.schedule()
    }

    fn schedule(self: &Rc<Self>) -> Result<()> {
        match self.scheduler.upgrade() {
            Some(scheduler) => scheduler.schedule(self.clone()),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Handle - Weak reference for closures
// =============================================================================

/// Weak reference to an instance, safe to capture in long-lived closures.
///
/// Every method is a no-op once the instance is gone.
#[derive(Clone)]
pub struct Handle(Weak<InstanceCell>);

impl Handle {
    pub fn is_alive(&self) -> bool {
        self.0.upgrade().is_some_and(|cell| cell.is_alive())
    }

    pub fn props(&self) -> Option<Props> {
        self.0.upgrade().map(|cell| cell.props())
    }

    pub fn state(&self) -> Option<Props> {
        self.0.upgrade().map(|cell| cell.state())
    }

    /// Queue a shallow merge of `partial` into the state.
    pub fn set_state(&self, partial: Props) -> Result<()> {
        self.update_state(move |_, _| Ok(partial))
    }

    /// Queue a transition computed from the state as of the previous
    /// transition and the instance's props at the time it is applied.
    pub fn update_state(
        &self,
        transition: impl FnOnce(&Props, &Props) -> Result<Props> + 'static,
    ) -> Result<()> {
        match self.0.upgrade() {
            Some(cell) => cell.enqueue(Box::new(transition)),
            None => {
                debug!("state update dropped: instance released");
                Ok(())
            }
        }
    }

    /// Re-render regardless of `should_update`.
    pub fn force_update(&self) -> Result<()> {
        match self.0.upgrade() {
            Some(cell) => cell.force(),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Cx - Instance-bound context for hooks and render
// =============================================================================

/// Context bound to one instance, handed to lifecycle methods and render.
pub struct Cx<'a> {
    cell: &'a Rc<InstanceCell>,
    methods: Option<&'a BTreeMap<String, Method>>,
}

impl<'a> Cx<'a> {
    /// Same instance, with custom methods available to [`Cx::call`].
    pub(crate) fn with_methods(&self, methods: &'a BTreeMap<String, Method>) -> Cx<'a> {
        Cx {
            cell: self.cell,
            methods: Some(methods),
        }
    }

    /// Props as of the last commit.
    pub fn props(&self) -> Props {
        self.cell.props()
    }

    /// State as of the last commit.
    pub fn state(&self) -> Props {
        self.cell.state()
    }

    pub fn unit_name(&self) -> &str {
        self.cell.unit.name()
    }

    /// Weak handle for use after this call returns.
    pub fn handle(&self) -> Handle {
        Handle(Rc::downgrade(self.cell))
    }

    pub fn set_state(&self, partial: Props) -> Result<()> {
        self.handle().set_state(partial)
    }

    pub fn update_state(
        &self,
        transition: impl FnOnce(&Props, &Props) -> Result<Props> + 'static,
    ) -> Result<()> {
        self.handle().update_state(transition)
    }

    pub fn force_update(&self) -> Result<()> {
        self.handle().force_update()
    }

    /// Call a custom method declared on this instance.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .methods
            .and_then(|methods| methods.get(method))
            .cloned()
            .ok_or_else(|| EnhanceError::UnknownMethod(method.to_string()))?;
        f(self, args)
    }
}
