//! Reactive mounting - Drive a root from a props signal.
//!
//! `mount_reactive` installs one spark-signals effect that reads the props
//! signal and renders the unit into a fresh [`Root`]. Setting the signal
//! re-renders; stateful instances below stay alive across those renders.
//!
//! ```ignore
//! let props = signal(props! { "name" => "Tom" });
//! let mounted = mount_reactive(enhanced, props.clone(), Config::default());
//! props.set(props! { "name" => "Ann" });
//! flush_sync(); // re-renders
//! mounted.unmount();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::{effect, flush_sync, Signal};
use tracing::error;

use crate::config::Config;
use crate::error::EnhanceError;
use crate::types::{Node, Props};
use crate::unit::Unit;

use super::Root;

/// Handle returned by [`mount_reactive`]. Dropping it stops the effect and
/// unmounts the tree.
pub struct ReactiveMount {
    root: Rc<Root>,
    stop_effect: Option<Box<dyn FnOnce()>>,
    last_error: Rc<RefCell<Option<EnhanceError>>>,
}

impl ReactiveMount {
    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn output(&self) -> Node {
        self.root.output()
    }

    /// Error from the most recent signal-driven render, if it failed.
    pub fn last_error(&self) -> Option<EnhanceError> {
        self.last_error.borrow().clone()
    }

    /// Stop reacting and tear the tree down.
    pub fn unmount(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        if let Err(err) = self.root.unmount() {
            error!(%err, "reactive unmount failed");
            *self.last_error.borrow_mut() = Some(err);
        }
    }
}

impl Drop for ReactiveMount {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Mount `unit` and re-render it whenever `props` changes.
pub fn mount_reactive(unit: Unit, props: Signal<Props>, config: Config) -> ReactiveMount {
    let root = Rc::new(Root::new(config));
    let last_error = Rc::new(RefCell::new(None));

    let root_for_effect = root.clone();
    let error_for_effect = last_error.clone();
    let stop_fn = effect(move || {
        let next = props.get();
        match root_for_effect.render_unit(&unit, next) {
            Ok(()) => *error_for_effect.borrow_mut() = None,
            Err(err) => {
                error!(unit = %unit.name(), %err, "reactive render failed");
                *error_for_effect.borrow_mut() = Some(err);
            }
        }
    });
    flush_sync();

    ReactiveMount {
        root,
        stop_effect: Some(Box::new(stop_fn)),
        last_error,
    }
}
