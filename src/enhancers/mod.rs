//! Enhancers - Unit-to-unit transforms and their composition.
//!
//! An [`Enhancer`] takes a [`Unit`] and returns a new one with added or
//! altered behaviour. Because every enhancer consumes and produces the same
//! abstraction, enhancers stack:
//!
//! ```ignore
//! let enhance = compose![
//!     with_state_handlers(props! { "data" => Value::Null }, handlers),
//!     lifecycle(HookSet::new().did_mount(fetch)),
//!     branch(|p| !p.truthy("data"), render_component(loader), None),
//! ];
//! let view = enhance.apply(display_data);
//! ```
//!
//! # Available enhancers
//!
//! - [`override_props`], [`with_props`], [`with_props_fn`], [`map_props`] - input shaping
//! - [`render_component`], [`render_nothing`], [`never_update`] - output replacement
//! - [`with_state_handlers`] - owned state plus generated updaters
//! - [`lifecycle`] - hook table attached to an instance
//! - [`branch`], [`try_branch`] - predicate-selected enhancer, cached per application

mod branch;
mod lifecycle;
mod props;
mod render;
mod state;

pub use branch::{branch, try_branch};
pub use lifecycle::{lifecycle, Hook, HookFn, HookSet, Hooks};
pub use props::{map_props, override_props, with_props, with_props_fn};
pub use render::{never_update, render_component, render_nothing};
pub use state::{with_state_handlers, InitialState, StateHandlers};

use std::fmt;
use std::rc::Rc;

use crate::config::Config;
use crate::unit::Unit;

// =============================================================================
// Enhancer
// =============================================================================

/// A transform from one rendering unit to another.
///
/// Cloning shares the underlying transform. Applying an enhancer never
/// mutates it: each application builds fresh units, so two units enhanced by
/// the same enhancer share no mutable state.
#[derive(Clone)]
pub struct Enhancer {
    name: Rc<str>,
    apply: Rc<dyn Fn(Unit, &Config) -> Unit>,
}

impl Enhancer {
    /// Enhancer that receives the pipeline configuration.
    pub fn new(name: impl Into<Rc<str>>, apply: impl Fn(Unit, &Config) -> Unit + 'static) -> Self {
        Self {
            name: name.into(),
            apply: Rc::new(apply),
        }
    }

    /// Enhancer from a plain `Unit -> Unit` function.
    pub fn from_fn(name: impl Into<Rc<str>>, apply: impl Fn(Unit) -> Unit + 'static) -> Self {
        Self::new(name, move |unit, _| apply(unit))
    }

    /// Returns its input unchanged.
    pub fn identity() -> Self {
        Self::new("identity", |unit, _| unit)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply with the default configuration.
    pub fn apply(&self, unit: Unit) -> Unit {
        self.apply_with(unit, &Config::default())
    }

    pub fn apply_with(&self, unit: Unit, config: &Config) -> Unit {
        (self.apply)(unit, config)
    }

    /// True if both handles share the same transform.
    pub fn ptr_eq(&self, other: &Enhancer) -> bool {
        Rc::ptr_eq(&self.apply, &other.apply)
    }
}

impl fmt::Debug for Enhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Enhancer({})", self.name)
    }
}

// =============================================================================
// compose
// =============================================================================

/// Combine enhancers right to left: `compose([e1, e2, e3])` applied to `u`
/// is `e1(e2(e3(u)))`.
///
/// No enhancers gives [`Enhancer::identity`]; a single enhancer is returned
/// as is.
pub fn compose(enhancers: impl IntoIterator<Item = Enhancer>) -> Enhancer {
    let mut list: Vec<Enhancer> = enhancers.into_iter().collect();
    match list.len() {
        0 => Enhancer::identity(),
        1 => list.remove(0),
        _ => {
            let name = list
                .iter()
                .map(Enhancer::name)
                .collect::<Vec<_>>()
                .join(", ");
            Enhancer::new(format!("compose({name})"), move |unit, config| {
                list.iter()
                    .rev()
                    .fold(unit, |unit, enhancer| enhancer.apply_with(unit, config))
            })
        }
    }
}

/// Variadic form of [`compose`]: `compose![a, b, c]`.
#[macro_export]
macro_rules! compose {
    () => {
        $crate::enhancers::compose(::std::iter::empty::<$crate::enhancers::Enhancer>())
    };
    ($($enhancer:expr),+ $(,)?) => {
        $crate::enhancers::compose([$($enhancer),+])
    };
}
