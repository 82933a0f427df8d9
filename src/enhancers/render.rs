//! Output replacement - Bypass or freeze the wrapped unit.

use crate::config::Config;
use crate::error::Result;
use crate::types::{Node, Props};
use crate::unit::{Component, Cx, Unit};

use super::Enhancer;

/// Ignore the base unit and render `constant` with the incoming props.
pub fn render_component(constant: Unit) -> Enhancer {
    Enhancer::new("render_component", move |_base, config| {
        let constant = constant.clone();
        let config = config.clone();
        Unit::try_pure(format!("render_component({})", constant.name()), move |props| {
            constant.forward(props.clone(), &config)
        })
    })
}

/// Ignore the base unit and the props; render nothing.
pub fn render_nothing() -> Enhancer {
    Enhancer::from_fn("render_nothing", |_base| Unit::pure("Nothing", |_| Node::Empty))
}

/// Render once, then never again, whatever props arrive.
pub fn never_update() -> Enhancer {
    Enhancer::new("never_update", |base, config| {
        let name = format!("never_update({})", base.name());
        let config = config.clone();
        Unit::stateful(name, move |_| Frozen {
            base: base.clone(),
            config: config.clone(),
        })
    })
}

struct Frozen {
    base: Unit,
    config: Config,
}

impl Component for Frozen {
    fn should_update(&self, _cx: &Cx<'_>, _next_props: &Props, _next_state: &Props) -> bool {
        false
    }

    fn render(&self, cx: &Cx<'_>) -> Result<Node> {
        self.base.forward(cx.props(), &self.config)
    }
}
