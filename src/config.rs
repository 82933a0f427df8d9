//! Pipeline configuration.
//!
//! A [`Config`] is passed explicitly to [`Enhancer::apply_with`] and to the
//! host [`Root`]. Nothing reads configuration from ambient state.
//!
//! [`Enhancer::apply_with`]: crate::enhancers::Enhancer::apply_with
//! [`Root`]: crate::host::Root

use std::fmt;
use std::rc::Rc;

use crate::types::Props;

/// Default cap on state-driven updates processed by one flush.
pub const DEFAULT_MAX_UPDATES: usize = 1000;

// =============================================================================
// Update policy
// =============================================================================

/// Decides whether a state transition is visible enough to re-render.
///
/// Skipping a render is only an optimisation, so a policy may err towards
/// reporting changes but never needs to be exact.
pub trait UpdatePolicy {
    fn state_changed(&self, prev: &Props, next: &Props) -> bool;
}

/// Field-by-field comparison, one level deep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowEqual;

impl UpdatePolicy for ShallowEqual {
    fn state_changed(&self, prev: &Props, next: &Props) -> bool {
        !prev.shallow_eq(next)
    }
}

/// Treats every transition as a change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUpdate;

impl UpdatePolicy for AlwaysUpdate {
    fn state_changed(&self, _prev: &Props, _next: &Props) -> bool {
        true
    }
}

// =============================================================================
// Config
// =============================================================================

/// Settings threaded through pipeline construction and the host.
#[derive(Clone)]
pub struct Config {
    /// Call pure base units directly instead of emitting a deferred node.
    ///
    /// Saves one host layer per enhancer. Off by default: with it on, a pure
    /// unit never gets its own slot in the host tree.
    pub eager_pure: bool,

    /// Comparison used by stateful enhancers to skip renders.
    pub policy: Rc<dyn UpdatePolicy>,

    /// Maximum number of state-driven instance updates per flush.
    pub max_updates: usize,
}

impl Config {
    pub fn with_eager_pure(mut self, eager: bool) -> Self {
        self.eager_pure = eager;
        self
    }

    pub fn with_policy(mut self, policy: impl UpdatePolicy + 'static) -> Self {
        self.policy = Rc::new(policy);
        self
    }

    pub fn with_max_updates(mut self, max: usize) -> Self {
        self.max_updates = max;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eager_pure: false,
            policy: Rc::new(ShallowEqual),
            max_updates: DEFAULT_MAX_UPDATES,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("eager_pure", &self.eager_pure)
            .field("max_updates", &self.max_updates)
            .finish_non_exhaustive()
    }
}
