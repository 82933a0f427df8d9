//! Branch - Pick one of two enhancers per render, by predicate.
//!
//! `branch(pred, on_true, on_false)` applied to a base unit produces a pure
//! unit that evaluates `pred` against its props on every render and forwards
//! to `on_true(base)` or `on_false(base)`.
//!
//! Both derived units are built lazily, the first time their side is
//! chosen, and then kept for as long as the branch unit lives. Toggling back
//! and forth never rebuilds them, so a stateful side keeps the same unit
//! identity and the host keeps its instance while that side stays selected.

use std::cell::OnceCell;
use std::rc::Rc;

use tracing::trace;

use crate::config::Config;
use crate::error::Result;
use crate::types::Props;
use crate::unit::Unit;

use super::Enhancer;

type Predicate = Rc<dyn Fn(&Props) -> Result<bool>>;

/// Forward to `on_true(base)` while `pred` holds, else to `on_false(base)`.
///
/// A missing `on_false` forwards to the base unit unchanged.
///
/// ```ignore
/// let with_loader = branch(|p| !p.truthy("data"), render_component(loader), None);
/// ```
pub fn branch(
    pred: impl Fn(&Props) -> bool + 'static,
    on_true: Enhancer,
    on_false: Option<Enhancer>,
) -> Enhancer {
    build(
        Rc::new(move |props: &Props| -> Result<bool> { Ok(pred(props)) }),
        on_true,
        on_false,
    )
}

/// [`branch`] with a fallible predicate. A predicate error fails the render.
pub fn try_branch(
    pred: impl Fn(&Props) -> Result<bool> + 'static,
    on_true: Enhancer,
    on_false: Option<Enhancer>,
) -> Enhancer {
    build(Rc::new(pred), on_true, on_false)
}

fn build(pred: Predicate, on_true: Enhancer, on_false: Option<Enhancer>) -> Enhancer {
    let on_false = on_false.unwrap_or_else(Enhancer::identity);
    Enhancer::new("branch", move |base, config| {
        let name = format!("branch({})", base.name());
        let sides = Rc::new(Sides {
            base,
            on_true: on_true.clone(),
            on_false: on_false.clone(),
            config: config.clone(),
            true_unit: OnceCell::new(),
            false_unit: OnceCell::new(),
        });
        let pred = pred.clone();
        Unit::try_pure(name, move |props| {
            let unit = sides.side(pred(props)?);
            unit.forward(props.clone(), &sides.config)
        })
    })
}

/// Branch cache: one lazily built unit per side.
struct Sides {
    base: Unit,
    on_true: Enhancer,
    on_false: Enhancer,
    config: Config,
    true_unit: OnceCell<Unit>,
    false_unit: OnceCell<Unit>,
}

impl Sides {
    fn side(&self, chosen: bool) -> &Unit {
        let (cell, enhancer) = if chosen {
            (&self.true_unit, &self.on_true)
        } else {
            (&self.false_unit, &self.on_false)
        };
        cell.get_or_init(|| {
            trace!(side = chosen, enhancer = %enhancer.name(), base = %self.base.name(), "branch side built");
            enhancer.apply_with(self.base.clone(), &self.config)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancers::{never_update, render_component, with_props};
    use crate::error::EnhanceError;
    use crate::host::Root;
    use crate::props;
    use crate::types::{Node, Value};
    use std::cell::Cell;

    fn echo() -> Unit {
        Unit::pure("Echo", |p| Node::text(p.str("name").unwrap_or("")))
    }

    /// Enhancer that counts how often it is applied.
    fn counting(applied: &Rc<Cell<usize>>, tag: &'static str) -> Enhancer {
        let applied = applied.clone();
        let inner = with_props(props! { "name" => tag });
        Enhancer::from_fn(tag, move |unit| {
            applied.set(applied.get() + 1);
            inner.apply(unit)
        })
    }

    #[test]
    fn test_sides_built_at_most_once() {
        let (t, f) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let unit = branch(|p| p.truthy("on"), counting(&t, "yes"), Some(counting(&f, "no")))
            .apply(echo());
        let root = Root::new(Config::default());

        for i in 0..10 {
            root.render_unit(&unit, props! { "on" => i % 2 == 0 }).unwrap();
            let expected = if i % 2 == 0 { "yes" } else { "no" };
            assert_eq!(root.output().to_string(), expected);
        }
        assert_eq!((t.get(), f.get()), (1, 1));
    }

    #[test]
    fn test_sides_built_lazily() {
        let (t, f) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let unit = branch(|_| true, counting(&t, "yes"), Some(counting(&f, "no"))).apply(echo());
        assert_eq!(t.get(), 0, "nothing built before the first render");

        let root = Root::new(Config::default());
        root.render_unit(&unit, Props::new()).unwrap();
        root.render_unit(&unit, Props::new()).unwrap();
        assert_eq!((t.get(), f.get()), (1, 0));
    }

    #[test]
    fn test_each_application_has_its_own_cache() {
        let t = Rc::new(Cell::new(0));
        let enhance = branch(|_| true, counting(&t, "yes"), None);
        let root = Root::new(Config::default());

        root.render_unit(&enhance.apply(echo()), Props::new()).unwrap();
        root.render_unit(&enhance.apply(echo()), Props::new()).unwrap();
        assert_eq!(t.get(), 2);
    }

    #[test]
    fn test_missing_false_side_renders_base() {
        let loader = Unit::pure("Loader", |_| Node::text("Loading..."));
        let unit = branch(|p| !p.truthy("data"), render_component(loader), None).apply(echo());
        let root = Root::new(Config::default());

        root.render_unit(&unit, props! { "data" => Value::Null, "name" => "Tom" }).unwrap();
        assert_eq!(root.output().to_string(), "Loading...");

        root.render_unit(&unit, props! { "data" => 1, "name" => "Tom" }).unwrap();
        assert_eq!(root.output().to_string(), "Tom");
        assert_eq!(unit.name(), "branch(Echo)");
    }

    #[test]
    fn test_stateful_side_keeps_its_instance() {
        // never_update keeps its first output for as long as its instance lives.
        let unit = branch(|p| p.truthy("frozen"), never_update(), None).apply(echo());
        let root = Root::new(Config::default());

        root.render_unit(&unit, props! { "frozen" => true, "name" => "Tom" }).unwrap();
        root.render_unit(&unit, props! { "frozen" => true, "name" => "Ann" }).unwrap();
        assert_eq!(root.output().to_string(), "Tom");

        root.render_unit(&unit, props! { "frozen" => false, "name" => "Ann" }).unwrap();
        root.render_unit(&unit, props! { "frozen" => true, "name" => "Kim" }).unwrap();
        assert_eq!(root.output().to_string(), "Kim", "switching sides remounts");
    }

    #[test]
    fn test_predicate_error_propagates() {
        let unit = try_branch(
            |p| match p.get("flag") {
                Some(v) => v.as_bool().ok_or_else(|| EnhanceError::Predicate(format!("flag is {v}"))),
                None => Err(EnhanceError::Predicate("flag missing".into())),
            },
            Enhancer::identity(),
            None,
        )
        .apply(echo());
        let root = Root::new(Config::default());

        assert_eq!(
            root.render_unit(&unit, Props::new()).unwrap_err(),
            EnhanceError::Predicate("flag missing".into())
        );
        assert!(root.render_unit(&unit, props! { "flag" => true }).is_ok());
    }
}
