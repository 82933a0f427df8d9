//! # spark-enhance
//!
//! Composable component enhancers for Rust UIs.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for reactive mounting.
//!
//! ## Architecture
//!
//! Everything is a rendering [`Unit`]: either a pure `Props -> Node`
//! function, or a factory for stateful instances. An [`Enhancer`] maps a unit
//! to a new unit, so enhancers stack with [`compose`]:
//!
//! ```text
//! compose![e1, e2, e3].apply(base) == e1(e2(e3(base)))
//! ```
//!
//! Props flow from the outermost enhancer inward. Stateful enhancers keep
//! their state in host-owned instances and change it only through an ordered
//! transition queue.
//!
//! ## Modules
//!
//! - [`types`] - Props records, values, callbacks, output nodes
//! - [`unit`] - Rendering units, the `Component` trait, instance context
//! - [`enhancers`] - The enhancer catalogue and composition
//! - [`host`] - Reference host: mounting, scheduling, reconciliation, events
//! - [`config`] - Pipeline configuration and update policies
//! - [`error`] - Error type
//!
//! ## Example
//!
//! ```ignore
//! use spark_enhance::*;
//!
//! let person = Unit::pure("Person", |p| Node::tag("h1", vec![p.str("name").unwrap_or("").into()]));
//! let jack = override_props(props! { "name" => "Jack" }).apply(person);
//!
//! let root = Root::new(Config::default());
//! root.render_unit(&jack, props! { "name" => "Tom" })?;
//! assert_eq!(root.output().to_string(), "<h1>Jack</h1>");
//! ```

pub mod config;
pub mod enhancers;
pub mod error;
pub mod host;
pub mod types;
pub mod unit;

// Re-export commonly used items
pub use types::*;

pub use config::{AlwaysUpdate, Config, ShallowEqual, UpdatePolicy, DEFAULT_MAX_UPDATES};

pub use error::{EnhanceError, Result};

pub use unit::{Component, Cx, Handle, Method, Unit};

pub use enhancers::{
    // Composition
    compose, Enhancer,
    // Input shaping
    map_props, override_props, with_props, with_props_fn,
    // Output replacement
    never_update, render_component, render_nothing,
    // State
    with_state_handlers, InitialState, StateHandlers,
    // Lifecycle
    lifecycle, Hook, HookFn, HookSet, Hooks,
    // Branching
    branch, try_branch,
};

pub use host::event::{Event, EventPool};
pub use host::reactive::{mount_reactive, ReactiveMount};
pub use host::Root;
