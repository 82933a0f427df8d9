//! Input shaping - Override, merge, or replace the props a unit receives.
//!
//! - [`override_props`] - fixed fields laid over caller props
//! - [`map_props`] - caller props replaced by a mapper's result
//! - [`with_props`] / [`with_props_fn`] - `map_props` that merges instead of replacing
//!
//! All of these produce pure units: no state, no lifecycle.

use std::rc::Rc;

use crate::types::Props;
use crate::unit::Unit;

use super::Enhancer;

/// Lock `fixed` fields: they always win over whatever the caller passes.
///
/// Fields the base unit never reads are passed through untouched.
///
/// ```ignore
/// let person_jack = override_props(props! { "name" => "Jack" }).apply(person);
/// ```
pub fn override_props(fixed: Props) -> Enhancer {
    Enhancer::new("override_props", move |base, config| {
        let fixed = fixed.clone();
        let config = config.clone();
        Unit::try_pure(format!("override_props({})", base.name()), move |props| {
            base.forward(props.merge(&fixed), &config)
        })
    })
}

/// Replace the props entirely with `mapper(props)`.
pub fn map_props(mapper: impl Fn(&Props) -> Props + 'static) -> Enhancer {
    let mapper = Rc::new(mapper);
    Enhancer::new("map_props", move |base, config| {
        let mapper = mapper.clone();
        let config = config.clone();
        Unit::try_pure(format!("map_props({})", base.name()), move |props| {
            base.forward(mapper(props), &config)
        })
    })
}

/// Merge `fixed` over the incoming props.
pub fn with_props(fixed: Props) -> Enhancer {
    with_props_fn(move |_| fixed.clone())
}

/// Merge `derive(props)` over the incoming props.
pub fn with_props_fn(derive: impl Fn(&Props) -> Props + 'static) -> Enhancer {
    let mapped = map_props(move |props| props.merge(&derive(props)));
    Enhancer::new("with_props", move |base, config| mapped.apply_with(base, config))
}
