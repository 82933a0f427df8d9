//! Rendering units - the single abstraction every enhancer consumes and produces.
//!
//! A [`Unit`] is a tagged union decided when it is constructed:
//! - [`Unit::Pure`] - a function `Props -> Node` with no persistent state
//! - [`Unit::Stateful`] - a factory for [`Component`] instances that own
//!   state and receive lifecycle calls from the host
//!
//! Units are immutable definitions. Cloning a unit keeps its identity; the
//! host uses that identity to decide whether a re-render updates an existing
//! instance or replaces it.

mod instance;

pub use instance::{Cx, Handle, Method};
pub(crate) use instance::InstanceCell;

use std::fmt;
use std::rc::Rc;

use crate::config::Config;
use crate::error::Result;
use crate::types::{Node, Props};

// =============================================================================
// Component - Stateful instance behaviour
// =============================================================================

/// Behaviour of one stateful unit instance.
///
/// State lives in the host-owned instance, not in the component, so every
/// method takes `&self` and reads through the [`Cx`]. All lifecycle methods
/// default to no-ops; only `render` is required.
pub trait Component {
    /// State for a fresh instance, computed from the first props it sees.
    fn initial_state(&self, _props: &Props) -> Result<Props> {
        Ok(Props::new())
    }

    fn will_mount(&self, _cx: &Cx<'_>) {}

    fn did_mount(&self, _cx: &Cx<'_>) {}

    /// The parent re-rendered this instance with `next` props.
    fn will_receive_props(&self, _cx: &Cx<'_>, _next: &Props) {}

    fn should_update(&self, _cx: &Cx<'_>, _next_props: &Props, _next_state: &Props) -> bool {
        true
    }

    fn will_update(&self, _cx: &Cx<'_>, _next_props: &Props, _next_state: &Props) {}

    fn render(&self, cx: &Cx<'_>) -> Result<Node>;

    fn did_update(&self, _cx: &Cx<'_>, _prev_props: &Props, _prev_state: &Props) {}

    fn will_unmount(&self, _cx: &Cx<'_>) {}
}

// =============================================================================
// Unit
// =============================================================================

/// Referentially transparent unit.
pub struct PureUnit {
    name: String,
    render: Box<dyn Fn(&Props) -> Result<Node>>,
}

/// Factory for stateful instances.
pub struct StatefulUnit {
    name: String,
    create: Box<dyn Fn(&Handle) -> Box<dyn Component>>,
}

impl StatefulUnit {
    pub(crate) fn instantiate(&self, handle: &Handle) -> Box<dyn Component> {
        (self.create)(handle)
    }
}

/// A rendering unit: pure function or stateful component factory.
#[derive(Clone)]
pub enum Unit {
    Pure(Rc<PureUnit>),
    Stateful(Rc<StatefulUnit>),
}

impl Unit {
    /// Pure unit from an infallible render function.
    pub fn pure(name: impl Into<String>, render: impl Fn(&Props) -> Node + 'static) -> Self {
        Self::try_pure(name, move |props| Ok(render(props)))
    }

    /// Pure unit whose render may fail.
    pub fn try_pure(
        name: impl Into<String>,
        render: impl Fn(&Props) -> Result<Node> + 'static,
    ) -> Self {
        Unit::Pure(Rc::new(PureUnit {
            name: name.into(),
            render: Box::new(render),
        }))
    }

    /// Stateful unit. `create` runs once per instance; the [`Handle`] it
    /// receives stays valid for the instance's lifetime.
    pub fn stateful<C>(name: impl Into<String>, create: impl Fn(&Handle) -> C + 'static) -> Self
    where
        C: Component + 'static,
    {
        Unit::Stateful(Rc::new(StatefulUnit {
            name: name.into(),
            create: Box::new(move |handle| Box::new(create(handle))),
        }))
    }

    /// Display name, e.g. `with_state_handlers(Person)`.
    pub fn name(&self) -> &str {
        match self {
            Unit::Pure(unit) => &unit.name,
            Unit::Stateful(unit) => &unit.name,
        }
    }

    pub fn is_pure(&self) -> bool {
        matches!(self, Unit::Pure(_))
    }

    /// True if both values are the same unit definition.
    pub fn ptr_eq(&self, other: &Unit) -> bool {
        match (self, other) {
            (Unit::Pure(a), Unit::Pure(b)) => Rc::ptr_eq(a, b),
            (Unit::Stateful(a), Unit::Stateful(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Deferred invocation node.
    pub fn element(&self, props: Props) -> Node {
        Node::Unit(self.clone(), props)
    }

    /// Run a pure unit's render function. Stateful units return a deferred
    /// node, since they need a host instance to render.
    pub fn call(&self, props: &Props) -> Result<Node> {
        match self {
            Unit::Pure(unit) => (unit.render)(props),
            Unit::Stateful(_) => Ok(self.element(props.clone())),
        }
    }

    /// Hand `props` to this unit from inside another unit's render.
    ///
    /// With `eager_pure` set, pure units are called in place; everything else
    /// becomes a deferred node for the host.
    pub(crate) fn forward(&self, props: Props, config: &Config) -> Result<Node> {
        match self {
            Unit::Pure(unit) if config.eager_pure => (unit.render)(&props),
            _ => Ok(self.element(props)),
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Pure(_) => write!(f, "Unit::Pure({})", self.name()),
            Unit::Stateful(_) => write!(f, "Unit::Stateful({})", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    struct Static;

    impl Component for Static {
        fn render(&self, _cx: &Cx<'_>) -> Result<Node> {
            Ok(Node::text("static"))
        }
    }

    #[test]
    fn test_unit_tags() {
        let pure = Unit::pure("Echo", |p| Node::text(p.str("name").unwrap_or("")));
        let stateful = Unit::stateful("Static", |_| Static);

        assert!(pure.is_pure());
        assert!(!stateful.is_pure());
        assert_eq!(pure.name(), "Echo");
        assert_eq!(format!("{stateful:?}"), "Unit::Stateful(Static)");
    }

    #[test]
    fn test_identity_survives_clone() {
        let a = Unit::pure("A", |_| Node::Empty);
        let b = Unit::pure("A", |_| Node::Empty);

        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b), "same name is not same unit");
    }

    #[test]
    fn test_forward_respects_eager_flag() {
        let echo = Unit::pure("Echo", |p| Node::text(p.str("name").unwrap_or("")));
        let props = props! { "name" => "Jack" };

        let deferred = echo.forward(props.clone(), &Config::default()).unwrap();
        assert!(matches!(deferred, Node::Unit(ref u, _) if u.ptr_eq(&echo)));

        let eager = echo
            .forward(props, &Config::default().with_eager_pure(true))
            .unwrap();
        assert_eq!(eager, Node::text("Jack"));
    }

    #[test]
    fn test_stateful_never_called_eagerly() {
        let stateful = Unit::stateful("Static", |_| Static);
        let node = stateful
            .forward(Props::new(), &Config::default().with_eager_pure(true))
            .unwrap();
        assert!(matches!(node, Node::Unit(..)));
    }
}
