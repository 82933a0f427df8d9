//! State handlers - Owned instance state plus generated updater callbacks.
//!
//! `with_state_handlers(initial, handlers)` wraps a unit in a stateful unit.
//! Each instance:
//! 1. Computes its initial state (a literal record, or derived from the first props)
//! 2. Builds one updater [`Callback`] per declared handler
//! 3. Renders the base with `props + state + updaters` (later wins)
//!
//! Calling an updater queues a transition. The handler runs when the
//! transition is applied, against the state left by the previous transition,
//! so rapid successive calls compose instead of overwriting each other.
//!
//! If an updater's first argument is an [`Event`], it is persisted before
//! queueing: the transition may run after the event has been recycled.
//!
//! ```ignore
//! let counter = with_state_handlers(
//!     props! { "count" => 0 },
//!     StateHandlers::new().on("inc", |state, _props, _args| {
//!         Ok(props! { "count" => state.int("count").unwrap_or(0) + 1 })
//!     }),
//! );
//! ```
//!
//! [`Event`]: crate::host::event::Event

use std::rc::Rc;

use tracing::warn;

use crate::config::{Config, UpdatePolicy};
use crate::error::Result;
use crate::types::{Callback, Node, Props, Value};
use crate::unit::{Component, Cx, Handle, Unit};

use super::Enhancer;

/// Handler: `(state, outer_props, call_args) -> partial_state`.
type Handler = Rc<dyn Fn(&Props, &Props, &[Value]) -> Result<Props>>;

// =============================================================================
// Declarations
// =============================================================================

/// Initial state: a literal record or a function of the first props.
#[derive(Clone)]
pub enum InitialState {
    Value(Props),
    Derive(Rc<dyn Fn(&Props) -> Props>),
}

impl InitialState {
    pub fn derive(f: impl Fn(&Props) -> Props + 'static) -> Self {
        InitialState::Derive(Rc::new(f))
    }

    fn resolve(&self, props: &Props) -> Props {
        match self {
            InitialState::Value(state) => state.clone(),
            InitialState::Derive(f) => f(props),
        }
    }
}

impl From<Props> for InitialState {
    fn from(value: Props) -> Self {
        InitialState::Value(value)
    }
}

/// Named handler declarations. Names are unique; redeclaring replaces.
#[derive(Clone, Default)]
pub struct StateHandlers {
    entries: Vec<(String, Handler)>,
}

impl StateHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare handler `name`.
    pub fn on(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&Props, &Props, &[Value]) -> Result<Props> + 'static,
    ) -> Self {
        let name = name.into();
        let handler: Handler = Rc::new(handler);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                warn!(handler = %name, "state handler declared twice; keeping the last one");
                entry.1 = handler;
            }
            None => self.entries.push((name, handler)),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// One updater per handler, bound to the instance behind `handle`.
    fn updaters(&self, handle: &Handle) -> Props {
        self.entries
            .iter()
            .map(|(name, handler)| {
                let updater = updater(name.clone(), handler.clone(), handle.clone());
                (name.clone(), Value::Callback(updater))
            })
            .collect()
    }
}

fn updater(name: String, handler: Handler, handle: Handle) -> Callback {
    Callback::new(name, move |args: &[Value]| {
        if let Some(Value::Event(event)) = args.first() {
            event.persist();
        }
        let handler = handler.clone();
        let args = args.to_vec();
        handle.update_state(move |state, props| handler(state, props, &args))?;
        Ok(Value::Null)
    })
}

// =============================================================================
// Enhancer
// =============================================================================

/// Give the wrapped unit owned state and one updater per handler.
pub fn with_state_handlers(initial: impl Into<InitialState>, handlers: StateHandlers) -> Enhancer {
    let initial = initial.into();
    Enhancer::new("with_state_handlers", move |base, config| {
        let name = format!("with_state_handlers({})", base.name());
        let initial = initial.clone();
        let handlers = handlers.clone();
        let config = config.clone();
        Unit::stateful(name, move |handle| StateHolder {
            initial: initial.clone(),
            updaters: handlers.updaters(handle),
            policy: config.policy.clone(),
            base: base.clone(),
            config: config.clone(),
        })
    })
}

struct StateHolder {
    initial: InitialState,
    updaters: Props,
    policy: Rc<dyn UpdatePolicy>,
    base: Unit,
    config: Config,
}

impl Component for StateHolder {
    fn initial_state(&self, props: &Props) -> Result<Props> {
        Ok(self.initial.resolve(props))
    }

    fn should_update(&self, cx: &Cx<'_>, next_props: &Props, next_state: &Props) -> bool {
        !cx.props().ptr_eq(next_props) || self.policy.state_changed(&cx.state(), next_state)
    }

    fn render(&self, cx: &Cx<'_>) -> Result<Node> {
        let props = cx.props().merge(&cx.state()).merge(&self.updaters);
        self.base.forward(props, &self.config)
    }
}

// =============================================================================
// Tests
// =============================================================================
