//! Lifecycle - Attach a hook table to an instance without touching its render.
//!
//! Hooks are declared by name in a [`HookSet`] and stored in a dispatch table
//! on the produced unit. The host calls into that table at the matching phase:
//!
//! | Hook                 | Phase                                   | Shape          |
//! |----------------------|-----------------------------------------|----------------|
//! | `will_mount`         | before the first render                 | [`HookFn::Plain`] |
//! | `did_mount`          | after the first render has committed    | [`HookFn::Plain`] |
//! | `will_receive_props` | parent re-rendered with new props       | [`HookFn::Props`] |
//! | `should_update`      | gate before a re-render                 | [`HookFn::Gate`]  |
//! | `will_update`        | just before a re-render                 | [`HookFn::Diff`]  |
//! | `did_update`         | after a re-render has committed         | [`HookFn::Diff`]  |
//! | `will_unmount`       | teardown, at most once                  | [`HookFn::Plain`] |
//!
//! Any other name declared with [`HookFn::Method`] becomes a custom method,
//! callable from every hook through [`Cx::call`].
//!
//! Rendering is never overridable: a `render` entry, or a hook whose shape
//! does not match its phase, is logged and ignored. The produced unit always
//! forwards `props + state` to the base unit.
//!
//! # Example
//!
//! ```ignore
//! let fetch = lifecycle(HookSet::new().did_mount(|cx| {
//!     if let Ok(update) = cx.props().callback("update_data") {
//!         let update = update.clone();
//!         spawn_fetch(move |data| update.call(&[data]));
//!     }
//! }));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use bitflags::bitflags;
use tracing::{error, warn};

use crate::config::Config;
use crate::error::{EnhanceError, Result};
use crate::types::{Node, Props, Value};
use crate::unit::{Component, Cx, Method, Unit};

use super::Enhancer;

// =============================================================================
// Hook names
// =============================================================================

/// A lifecycle phase a hook can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hook {
    WillMount,
    DidMount,
    WillReceiveProps,
    ShouldUpdate,
    WillUpdate,
    DidUpdate,
    WillUnmount,
}

impl Hook {
    pub const ALL: [Hook; 7] = [
        Hook::WillMount,
        Hook::DidMount,
        Hook::WillReceiveProps,
        Hook::ShouldUpdate,
        Hook::WillUpdate,
        Hook::DidUpdate,
        Hook::WillUnmount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Hook::WillMount => "will_mount",
            Hook::DidMount => "did_mount",
            Hook::WillReceiveProps => "will_receive_props",
            Hook::ShouldUpdate => "should_update",
            Hook::WillUpdate => "will_update",
            Hook::DidUpdate => "did_update",
            Hook::WillUnmount => "will_unmount",
        }
    }

    pub fn flag(self) -> Hooks {
        match self {
            Hook::WillMount => Hooks::WILL_MOUNT,
            Hook::DidMount => Hooks::DID_MOUNT,
            Hook::WillReceiveProps => Hooks::WILL_RECEIVE_PROPS,
            Hook::ShouldUpdate => Hooks::SHOULD_UPDATE,
            Hook::WillUpdate => Hooks::WILL_UPDATE,
            Hook::DidUpdate => Hooks::DID_UPDATE,
            Hook::WillUnmount => Hooks::WILL_UNMOUNT,
        }
    }

    /// Shape a hook for this phase must have.
    fn shape(self) -> &'static str {
        match self {
            Hook::WillMount | Hook::DidMount | Hook::WillUnmount => "plain",
            Hook::WillReceiveProps => "props",
            Hook::ShouldUpdate => "gate",
            Hook::WillUpdate | Hook::DidUpdate => "diff",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts snake_case names and the classic camelCase component method names.
impl FromStr for Hook {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "will_mount" | "componentWillMount" => Ok(Hook::WillMount),
            "did_mount" | "componentDidMount" => Ok(Hook::DidMount),
            "will_receive_props" | "componentWillReceiveProps" => Ok(Hook::WillReceiveProps),
            "should_update" | "shouldComponentUpdate" => Ok(Hook::ShouldUpdate),
            "will_update" | "componentWillUpdate" => Ok(Hook::WillUpdate),
            "did_update" | "componentDidUpdate" => Ok(Hook::DidUpdate),
            "will_unmount" | "componentWillUnmount" => Ok(Hook::WillUnmount),
            other => Err(EnhanceError::UnknownHook(other.to_string())),
        }
    }
}

bitflags! {
    /// Set of phases a hook set has entries for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hooks: u8 {
        const WILL_MOUNT = 1 << 0;
        const DID_MOUNT = 1 << 1;
        const WILL_RECEIVE_PROPS = 1 << 2;
        const SHOULD_UPDATE = 1 << 3;
        const WILL_UPDATE = 1 << 4;
        const DID_UPDATE = 1 << 5;
        const WILL_UNMOUNT = 1 << 6;

        const MOUNT = Self::WILL_MOUNT.bits() | Self::DID_MOUNT.bits();
        const UPDATE = Self::WILL_RECEIVE_PROPS.bits()
            | Self::SHOULD_UPDATE.bits()
            | Self::WILL_UPDATE.bits()
            | Self::DID_UPDATE.bits();
    }
}

// =============================================================================
// Hook functions
// =============================================================================

/// A hook callback, tagged by the arguments it takes.
#[derive(Clone)]
pub enum HookFn {
    /// `will_mount`, `did_mount`, `will_unmount`.
    Plain(Rc<dyn Fn(&Cx<'_>)>),
    /// `will_receive_props`: receives the incoming props.
    Props(Rc<dyn Fn(&Cx<'_>, &Props)>),
    /// `should_update`: `(next_props, next_state) -> render?`.
    Gate(Rc<dyn Fn(&Cx<'_>, &Props, &Props) -> bool>),
    /// `will_update` gets the next props and state, `did_update` the previous.
    Diff(Rc<dyn Fn(&Cx<'_>, &Props, &Props)>),
    /// Custom instance method.
    Method(Method),
}

impl HookFn {
    pub fn plain(f: impl Fn(&Cx<'_>) + 'static) -> Self {
        HookFn::Plain(Rc::new(f))
    }

    pub fn props(f: impl Fn(&Cx<'_>, &Props) + 'static) -> Self {
        HookFn::Props(Rc::new(f))
    }

    pub fn gate(f: impl Fn(&Cx<'_>, &Props, &Props) -> bool + 'static) -> Self {
        HookFn::Gate(Rc::new(f))
    }

    pub fn diff(f: impl Fn(&Cx<'_>, &Props, &Props) + 'static) -> Self {
        HookFn::Diff(Rc::new(f))
    }

    pub fn method(f: impl Fn(&Cx<'_>, &[Value]) -> Result<Value> + 'static) -> Self {
        HookFn::Method(Rc::new(f))
    }

    fn shape(&self) -> &'static str {
        match self {
            HookFn::Plain(_) => "plain",
            HookFn::Props(_) => "props",
            HookFn::Gate(_) => "gate",
            HookFn::Diff(_) => "diff",
            HookFn::Method(_) => "method",
        }
    }
}

impl fmt::Debug for HookFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookFn::{}", self.shape())
    }
}

// =============================================================================
// Hook set
// =============================================================================

/// Declared hooks and custom methods.
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: BTreeMap<Hook, HookFn>,
    methods: BTreeMap<String, Method>,
    declared: Hooks,
    diagnostics: Vec<String>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entry by name. Invalid entries are reported and skipped.
    pub fn entry(mut self, name: &str, f: HookFn) -> Self {
        if name == "render" {
            self.reject(name, "render cannot be replaced by a lifecycle hook".into());
            return self;
        }

        match (name.parse::<Hook>(), f) {
            (Ok(hook), f) if hook.shape() == f.shape() => {
                if self.hooks.insert(hook, f).is_some() {
                    warn!(hook = %hook, "lifecycle hook declared twice; keeping the last one");
                }
                self.declared |= hook.flag();
            }
            (Ok(hook), f) => {
                let message = format!(
                    "`{hook}` expects a {} hook, got a {} one",
                    hook.shape(),
                    f.shape()
                );
                self.reject(name, message);
            }
            (Err(_), HookFn::Method(method)) => {
                self.methods.insert(name.to_string(), method);
            }
            (Err(_), f) => {
                let message = format!("`{name}` is not a lifecycle phase; a {} hook needs one", f.shape());
                self.reject(name, message);
            }
        }
        self
    }

    pub fn will_mount(self, f: impl Fn(&Cx<'_>) + 'static) -> Self {
        self.entry(Hook::WillMount.name(), HookFn::plain(f))
    }

    pub fn did_mount(self, f: impl Fn(&Cx<'_>) + 'static) -> Self {
        self.entry(Hook::DidMount.name(), HookFn::plain(f))
    }

    pub fn will_receive_props(self, f: impl Fn(&Cx<'_>, &Props) + 'static) -> Self {
        self.entry(Hook::WillReceiveProps.name(), HookFn::props(f))
    }

    pub fn should_update(self, f: impl Fn(&Cx<'_>, &Props, &Props) -> bool + 'static) -> Self {
        self.entry(Hook::ShouldUpdate.name(), HookFn::gate(f))
    }

    pub fn will_update(self, f: impl Fn(&Cx<'_>, &Props, &Props) + 'static) -> Self {
        self.entry(Hook::WillUpdate.name(), HookFn::diff(f))
    }

    pub fn did_update(self, f: impl Fn(&Cx<'_>, &Props, &Props) + 'static) -> Self {
        self.entry(Hook::DidUpdate.name(), HookFn::diff(f))
    }

    pub fn will_unmount(self, f: impl Fn(&Cx<'_>) + 'static) -> Self {
        self.entry(Hook::WillUnmount.name(), HookFn::plain(f))
    }

    /// Declare a custom method reachable through [`Cx::call`].
    pub fn method(
        self,
        name: &str,
        f: impl Fn(&Cx<'_>, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.entry(name, HookFn::method(f))
    }

    /// Phases with a hook attached.
    pub fn declared(&self) -> Hooks {
        self.declared
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Messages for entries that were rejected at declaration time.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    fn reject(&mut self, name: &str, message: String) {
        error!(hook = %name, "{message}; entry ignored");
        self.diagnostics.push(message);
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("declared", &self.declared)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

// =============================================================================
// Enhancer
// =============================================================================

/// Attach `hooks` to the wrapped unit.
pub fn lifecycle(hooks: HookSet) -> Enhancer {
    let hooks = Rc::new(hooks);
    Enhancer::new("lifecycle", move |base, config| {
        let name = format!("lifecycle({})", base.name());
        let hooks = hooks.clone();
        let config = config.clone();
        Unit::stateful(name, move |_| Hooked {
            hooks: hooks.clone(),
            base: base.clone(),
            config: config.clone(),
        })
    })
}

struct Hooked {
    hooks: Rc<HookSet>,
    base: Unit,
    config: Config,
}

impl Hooked {
    fn get(&self, hook: Hook) -> Option<&HookFn> {
        self.hooks.hooks.get(&hook)
    }

    fn plain(&self, hook: Hook, cx: &Cx<'_>) {
        if let Some(HookFn::Plain(f)) = self.get(hook) {
            f(&cx.with_methods(&self.hooks.methods));
        }
    }

    fn diff(&self, hook: Hook, cx: &Cx<'_>, props: &Props, state: &Props) {
        if let Some(HookFn::Diff(f)) = self.get(hook) {
            f(&cx.with_methods(&self.hooks.methods), props, state);
        }
    }
}

impl Component for Hooked {
    fn will_mount(&self, cx: &Cx<'_>) {
        self.plain(Hook::WillMount, cx);
    }

    fn did_mount(&self, cx: &Cx<'_>) {
        self.plain(Hook::DidMount, cx);
    }

    fn will_receive_props(&self, cx: &Cx<'_>, next: &Props) {
        if let Some(HookFn::Props(f)) = self.get(Hook::WillReceiveProps) {
            f(&cx.with_methods(&self.hooks.methods), next);
        }
    }

    fn should_update(&self, cx: &Cx<'_>, next_props: &Props, next_state: &Props) -> bool {
        match self.get(Hook::ShouldUpdate) {
            Some(HookFn::Gate(f)) => f(&cx.with_methods(&self.hooks.methods), next_props, next_state),
            _ => true,
        }
    }

    fn will_update(&self, cx: &Cx<'_>, next_props: &Props, next_state: &Props) {
        self.diff(Hook::WillUpdate, cx, next_props, next_state);
    }

    fn render(&self, cx: &Cx<'_>) -> Result<Node> {
        self.base.forward(cx.props().merge(&cx.state()), &self.config)
    }

    fn did_update(&self, cx: &Cx<'_>, prev_props: &Props, prev_state: &Props) {
        self.diff(Hook::DidUpdate, cx, prev_props, prev_state);
    }

    fn will_unmount(&self, cx: &Cx<'_>) {
        self.plain(Hook::WillUnmount, cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Root;
    use crate::props;
    use std::cell::RefCell;
    use test_case::test_case;

    type Log = Rc<RefCell<Vec<String>>>;

    fn echo() -> Unit {
        Unit::pure("Echo", |p| Node::text(p.to_string()))
    }

    fn push(log: &Log, entry: &'static str) -> impl Fn(&Cx<'_>) + 'static {
        let log = log.clone();
        move |_: &Cx<'_>| log.borrow_mut().push(entry.to_string())
    }

    fn logging_hooks(log: &Log) -> HookSet {
        let (wrp, wu, du) = (log.clone(), log.clone(), log.clone());
        HookSet::new()
            .will_mount(push(log, "will_mount"))
            .did_mount(push(log, "did_mount"))
            .will_receive_props(move |_, next| {
                wrp.borrow_mut()
                    .push(format!("will_receive_props {}", next.str("name").unwrap_or("")));
            })
            .will_update(move |_, next, _| {
                wu.borrow_mut()
                    .push(format!("will_update {}", next.str("name").unwrap_or("")));
            })
            .did_update(move |_, prev, _| {
                du.borrow_mut()
                    .push(format!("did_update {}", prev.str("name").unwrap_or("")));
            })
            .will_unmount(push(log, "will_unmount"))
    }

    #[test_case("did_mount", Hook::DidMount ; "snake case")]
    #[test_case("componentDidMount", Hook::DidMount ; "camel case")]
    #[test_case("shouldComponentUpdate", Hook::ShouldUpdate ; "should update camel")]
    #[test_case("will_receive_props", Hook::WillReceiveProps ; "receive props")]
    #[test_case("componentWillUnmount", Hook::WillUnmount ; "unmount camel")]
    fn test_hook_names_parse(name: &str, expected: Hook) {
        assert_eq!(name.parse::<Hook>().unwrap(), expected);
    }

    #[test]
    fn test_every_phase_has_a_flag() {
        let all = Hook::ALL.iter().fold(Hooks::empty(), |acc, h| acc | h.flag());
        assert_eq!(all, Hooks::all());
        assert!(Hook::ALL.iter().all(|h| h.name().parse::<Hook>().ok() == Some(*h)));
    }

    #[test]
    fn test_unknown_hook_name() {
        assert_eq!(
            "render".parse::<Hook>().unwrap_err(),
            EnhanceError::UnknownHook("render".into())
        );
    }

    #[test]
    fn test_hook_order_across_lifetime() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let unit = lifecycle(logging_hooks(&log)).apply(echo());
        let root = Root::new(Config::default());

        root.render_unit(&unit, props! { "name" => "Tom" }).unwrap();
        root.render_unit(&unit, props! { "name" => "Ann" }).unwrap();
        root.unmount().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "will_mount",
                "did_mount",
                "will_receive_props Ann",
                "will_update Ann",
                "did_update Tom",
                "will_unmount",
            ]
        );
    }

    #[test]
    fn test_will_mount_state_lands_before_first_render() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let renders = log.clone();
        let base = Unit::pure("Phase", move |p| {
            let phase = p.str("phase").unwrap_or("none");
            renders.borrow_mut().push(format!("render {phase}"));
            Node::text(phase)
        });
        let wm = log.clone();
        let hooks = HookSet::new()
            .will_mount(move |cx| {
                wm.borrow_mut().push("will_mount".into());
                cx.set_state(props! { "phase" => "ready" }).unwrap();
            })
            .did_mount(push(&log, "did_mount"));
        let root = Root::new(Config::default());

        root.render_unit(&lifecycle(hooks).apply(base), Props::new()).unwrap();

        assert_eq!(root.output().to_string(), "ready");
        assert_eq!(*log.borrow(), vec!["will_mount", "render ready", "did_mount"]);
    }

    #[test]
    fn test_force_update_bypasses_should_update() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let saved: Rc<RefCell<Option<crate::unit::Handle>>> = Rc::new(RefCell::new(None));
        let (wu, s) = (log.clone(), saved.clone());
        let hooks = HookSet::new()
            .should_update(|_, _, _| false)
            .will_update(move |_, next, _| {
                wu.borrow_mut()
                    .push(format!("will_update {}", next.str("name").unwrap_or("")));
            })
            .did_mount(move |cx| *s.borrow_mut() = Some(cx.handle()));
        let unit = lifecycle(hooks).apply(echo());
        let root = Root::new(Config::default());

        root.render_unit(&unit, props! { "name" => "Tom" }).unwrap();
        root.render_unit(&unit, props! { "name" => "Ann" }).unwrap();
        assert_eq!(root.output().to_string(), "{name: Tom}");
        assert!(log.borrow().is_empty(), "gated update never reaches will_update");

        saved.borrow().clone().unwrap().force_update().unwrap();
        assert_eq!(root.output().to_string(), "{name: Ann}");
        assert_eq!(*log.borrow(), vec!["will_update Ann"]);
    }

    #[test]
    fn test_render_entry_is_ignored() {
        let hooks = HookSet::new().entry("render", HookFn::plain(|_| {}));
        assert_eq!(hooks.diagnostics().len(), 1);
        assert!(hooks.declared().is_empty());

        let unit = lifecycle(hooks).apply(echo());
        let root = Root::new(Config::default());
        root.render_unit(&unit, props! { "name" => "Tom" }).unwrap();
        assert_eq!(root.output().to_string(), "{name: Tom}");
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let hooks = HookSet::new()
            .entry("did_mount", HookFn::gate(|_, _, _| false))
            .entry("mystery", HookFn::plain(|_| {}));
        assert_eq!(hooks.diagnostics().len(), 2);
        assert!(!hooks.declared().contains(Hooks::DID_MOUNT));
    }

    #[test]
    fn test_declared_flags() {
        let hooks = HookSet::new().will_mount(|_| {}).did_mount(|_| {});
        assert_eq!(hooks.declared(), Hooks::MOUNT);
        assert!(!hooks.declared().intersects(Hooks::UPDATE));
    }

    #[test]
    fn test_did_mount_state_reaches_base() {
        let hooks = HookSet::new().did_mount(|cx| {
            cx.set_state(props! { "loaded" => true }).unwrap();
        });
        let unit = lifecycle(hooks).apply(echo());
        let root = Root::new(Config::default());

        root.render_unit(&unit, props! { "name" => "Tom" }).unwrap();
        assert_eq!(root.output().to_string(), "{loaded: true, name: Tom}");
    }

    #[test]
    fn test_should_update_gate() {
        let hooks = HookSet::new().should_update(|cx, next, _| cx.props().str("name") != next.str("name"));
        let unit = lifecycle(hooks).apply(echo());
        let root = Root::new(Config::default());

        root.render_unit(&unit, props! { "name" => "Tom", "n" => 1 }).unwrap();
        root.render_unit(&unit, props! { "name" => "Tom", "n" => 2 }).unwrap();
        assert_eq!(root.output().to_string(), "{n: 1, name: Tom}");

        root.render_unit(&unit, props! { "name" => "Ann", "n" => 3 }).unwrap();
        assert_eq!(root.output().to_string(), "{n: 3, name: Ann}");
    }

    #[test]
    fn test_custom_method_called_from_hook() {
        let hooks = HookSet::new()
            .method("greet", |cx, args| {
                let who = args.first().and_then(Value::as_str).unwrap_or("nobody");
                cx.set_state(props! { "greeting" => format!("hi {who}") })?;
                Ok(Value::Null)
            })
            .did_mount(|cx| {
                cx.call("greet", &["Tom".into()]).unwrap();
                assert_eq!(
                    cx.call("missing", &[]).unwrap_err(),
                    EnhanceError::UnknownMethod("missing".into())
                );
            });
        assert!(hooks.has_method("greet"));

        let unit = lifecycle(hooks).apply(echo());
        let root = Root::new(Config::default());
        root.render_unit(&unit, Props::new()).unwrap();
        assert_eq!(root.output().to_string(), "{greeting: hi Tom}");
    }

    #[test]
    fn test_stored_updater_after_unmount_is_inert() {
        let saved: Rc<RefCell<Option<crate::unit::Handle>>> = Rc::new(RefCell::new(None));
        let s = saved.clone();
        let hooks = HookSet::new().did_mount(move |cx| *s.borrow_mut() = Some(cx.handle()));
        let unit = lifecycle(hooks).apply(echo());
        let root = Root::new(Config::default());
        root.render_unit(&unit, Props::new()).unwrap();
        root.unmount().unwrap();

        let handle = saved.borrow().clone().unwrap();
        assert!(!handle.is_alive());
        assert!(handle.set_state(props! { "late" => true }).is_ok());
        assert_eq!(root.output(), Node::Empty);
    }
}
