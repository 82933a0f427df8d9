//! Reference host - Mounts enhanced units and drives their lifecycle.
//!
//! The host plays the part of the external rendering engine:
//! 1. Instantiates stateful units once and keeps them alive across renders
//! 2. Schedules re-renders when instance state changes
//! 3. Consults `should_update` before re-rendering an instance
//!
//! # Reconciliation
//!
//! Positional only. A `Node::Unit` in the same slot with the same unit
//! identity updates the existing instance; anything else tears the old
//! subtree down and mounts a new one. There are no keys and no diffing of
//! host elements beyond tag equality.
//!
//! # Passes and flushing
//!
//! Work happens in passes. Updaters invoked during a pass (from render, from
//! a hook, inside [`Root::batch`]) are queued and flushed when the outermost
//! pass ends. An updater invoked outside any pass flushes immediately, so a
//! failing state handler reports its error straight to the caller.
//!
//! `did_mount` and `did_update` run after the pass has built the whole tree,
//! children before parents.
//!
//! A mount that fails partway tears down whatever it had already mounted:
//! those instances get `will_unmount` and never see `did_mount`. Teardown
//! through [`Root::unmount`] is itself a pass, so hooks cannot re-render or
//! re-enter the root while it runs.
//!
//! ```ignore
//! let root = Root::new(Config::default());
//! root.render_unit(&enhanced, props! { "name" => "Tom" })?;
//! println!("{}", root.output());
//! root.unmount()?;
//! ```

pub mod event;
pub mod reactive;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{EnhanceError, Result};
use crate::types::{Element, Node, Props};
use crate::unit::{InstanceCell, Unit};

// =============================================================================
// Mounted tree
// =============================================================================

/// Host-side record of what was rendered into one slot.
pub(crate) enum Mounted {
    Empty,
    Text(Rc<str>),
    Element {
        tag: Rc<str>,
        attrs: Props,
        children: Vec<Mounted>,
    },
    Fragment(Vec<Mounted>),
    Pure {
        unit: Unit,
        props: Props,
        child: Box<Mounted>,
    },
    Stateful(Rc<InstanceCell>),
}

impl Mounted {
    /// Resolved output: the same tree with every unit replaced by what it rendered.
    fn output(&self) -> Node {
        match self {
            Mounted::Empty => Node::Empty,
            Mounted::Text(text) => Node::Text(text.clone()),
            Mounted::Element {
                tag,
                attrs,
                children,
            } => Node::Element(Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: children.iter().map(Mounted::output).collect(),
            }),
            Mounted::Fragment(children) => {
                Node::Fragment(children.iter().map(Mounted::output).collect())
            }
            Mounted::Pure { child, .. } => child.output(),
            Mounted::Stateful(cell) => cell.child.borrow().output(),
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

enum Commit {
    Mount(Rc<InstanceCell>),
    Update {
        cell: Rc<InstanceCell>,
        prev_props: Props,
        prev_state: Props,
    },
}

/// Pass depth, dirty instances, and the pending commit list.
pub(crate) struct Scheduler {
    config: Config,
    depth: Cell<usize>,
    dirty: RefCell<VecDeque<Rc<InstanceCell>>>,
    commits: RefCell<Vec<Commit>>,
}

impl Scheduler {
    fn new(config: Config) -> Rc<Self> {
        Rc::new(Self {
            config,
            depth: Cell::new(0),
            dirty: RefCell::new(VecDeque::new()),
            commits: RefCell::new(Vec::new()),
        })
    }

    fn in_pass(&self) -> bool {
        self.depth.get() > 0
    }

    /// Mark `cell` dirty; flush right away when no pass is running.
    pub(crate) fn schedule(self: &Rc<Self>, cell: Rc<InstanceCell>) -> Result<()> {
        {
            let mut dirty = self.dirty.borrow_mut();
            if !dirty.iter().any(|c| Rc::ptr_eq(c, &cell)) {
                dirty.push_back(cell);
            }
        }
        if self.in_pass() {
            Ok(())
        } else {
            self.settle()
        }
    }

    /// Run `f` one level deeper, so updaters it triggers are queued.
    fn nested<T>(&self, f: impl FnOnce() -> T) -> T {
        self.depth.set(self.depth.get() + 1);
        let result = f();
        self.depth.set(self.depth.get() - 1);
        result
    }

    /// Run `f` as a pass. The outermost pass commits and flushes on exit.
    fn pass<T>(self: &Rc<Self>, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let outermost = !self.in_pass();
        let result = self.nested(f);

        if !outermost {
            return result;
        }
        let settled = self.settle();
        let value = result?;
        settled.map(|()| value)
    }

    /// Run commits and process dirty instances until nothing is left.
    fn settle(self: &Rc<Self>) -> Result<()> {
        let mut processed = 0usize;
        loop {
            self.run_commits();

            let Some(cell) = self.dirty.borrow_mut().pop_front() else {
                return Ok(());
            };
            if !cell.needs_update() {
                continue;
            }

            processed += 1;
            if processed > self.config.max_updates {
                self.dirty.borrow_mut().clear();
                return Err(EnhanceError::UpdateLoop(self.config.max_updates));
            }

            let result = self.nested(|| update_instance(self, &cell, None));

            if let Err(err) = result {
                if cell.has_pending() {
                    self.dirty.borrow_mut().push_front(cell);
                }
                self.run_commits();
                return Err(err);
            }
        }
    }

    fn run_commits(self: &Rc<Self>) {
        loop {
            let commits = std::mem::take(&mut *self.commits.borrow_mut());
            if commits.is_empty() {
                return;
            }
            self.nested(|| {
                for commit in commits {
                    match commit {
                        Commit::Mount(cell) if cell.is_alive() => {
                            cell.component().did_mount(&cell.cx());
                        }
                        Commit::Update {
                            cell,
                            prev_props,
                            prev_state,
                        } if cell.is_alive() => {
                            cell.component()
                                .did_update(&cell.cx(), &prev_props, &prev_state);
                        }
                        _ => {}
                    }
                }
            });
        }
    }

    /// Drop pending commits for instances that are no longer mounted.
    fn prune_commits(&self) {
        self.commits.borrow_mut().retain(|commit| match commit {
            Commit::Mount(cell) | Commit::Update { cell, .. } => cell.is_alive(),
        });
    }
}

// =============================================================================
// Mount / reconcile / unmount
// =============================================================================

fn mount(scheduler: &Rc<Scheduler>, node: Node) -> Result<Mounted> {
    match node {
        Node::Empty => Ok(Mounted::Empty),
        Node::Text(text) => Ok(Mounted::Text(text)),
        Node::Element(el) => Ok(Mounted::Element {
            tag: el.tag,
            attrs: el.attrs,
            children: mount_all(scheduler, el.children)?,
        }),
        Node::Fragment(children) => Ok(Mounted::Fragment(mount_all(scheduler, children)?)),
        Node::Unit(unit, props) => match &unit {
            Unit::Pure(_) => {
                let out = unit.call(&props)?;
                let child = mount(scheduler, out)?;
                Ok(Mounted::Pure {
                    unit: unit.clone(),
                    props,
                    child: Box::new(child),
                })
            }
            Unit::Stateful(def) => {
                let cell = InstanceCell::create(def, props, Rc::downgrade(scheduler))?;
                match mount_instance(scheduler, &cell) {
                    Ok(()) => Ok(Mounted::Stateful(cell)),
                    Err(err) => {
                        discard(scheduler, vec![Mounted::Stateful(cell)]);
                        Err(err)
                    }
                }
            }
        },
    }
}

/// Mount `nodes` in order. On failure, siblings already mounted are torn down.
fn mount_all(scheduler: &Rc<Scheduler>, nodes: Vec<Node>) -> Result<Vec<Mounted>> {
    let mut mounted = Vec::with_capacity(nodes.len());
    for node in nodes {
        match mount(scheduler, node) {
            Ok(m) => mounted.push(m),
            Err(err) => {
                discard(scheduler, mounted);
                return Err(err);
            }
        }
    }
    Ok(mounted)
}

/// Tear down subtrees whose mount did not complete.
fn discard(scheduler: &Scheduler, partial: Vec<Mounted>) {
    partial.into_iter().for_each(unmount);
    scheduler.prune_commits();
}

fn mount_instance(scheduler: &Rc<Scheduler>, cell: &Rc<InstanceCell>) -> Result<()> {
    trace!(id = cell.id, unit = %cell.unit.name(), "mount");
    let component = cell.component();
    component.will_mount(&cell.cx());

    // Updates queued by will_mount land before the first render.
    let props = cell.props();
    let state = cell.drain_queue(&props)?;
    cell.commit(props, state);

    let out = component.render(&cell.cx())?;
    let child = mount(scheduler, out)?;
    *cell.child.borrow_mut() = child;
    scheduler.commits.borrow_mut().push(Commit::Mount(cell.clone()));
    Ok(())
}

/// Bring `cell` up to date. `next_props` is `Some` when its parent re-rendered it.
fn update_instance(
    scheduler: &Rc<Scheduler>,
    cell: &Rc<InstanceCell>,
    next_props: Option<Props>,
) -> Result<()> {
    if !cell.is_alive() {
        return Ok(());
    }
    let component = cell.component();
    let prev_props = cell.props();
    let prev_state = cell.state();

    let next_props = match next_props {
        Some(props) => {
            component.will_receive_props(&cell.cx(), &props);
            props
        }
        None => prev_props.clone(),
    };
    let next_state = cell.drain_queue(&next_props)?;

    let forced = cell.take_forced();
    if !forced && !component.should_update(&cell.cx(), &next_props, &next_state) {
        trace!(id = cell.id, unit = %cell.unit.name(), "update skipped");
        cell.commit(next_props, next_state);
        return Ok(());
    }

    component.will_update(&cell.cx(), &next_props, &next_state);
    cell.commit(next_props, next_state);
    trace!(id = cell.id, unit = %cell.unit.name(), "update");

    let out = component.render(&cell.cx())?;
    let mut child = cell.child.replace(Mounted::Empty);
    let result = reconcile(scheduler, &mut child, out);
    *cell.child.borrow_mut() = child;
    result?;

    scheduler.commits.borrow_mut().push(Commit::Update {
        cell: cell.clone(),
        prev_props,
        prev_state,
    });
    Ok(())
}

fn reconcile(scheduler: &Rc<Scheduler>, slot: &mut Mounted, node: Node) -> Result<()> {
    match (slot, node) {
        (Mounted::Stateful(cell), Node::Unit(unit, props)) if cell.unit.ptr_eq(&unit) => {
            let cell = cell.clone();
            update_instance(scheduler, &cell, Some(props))
        }
        (
            Mounted::Pure {
                unit: current,
                props: current_props,
                child,
            },
            Node::Unit(unit, props),
        ) if current.ptr_eq(&unit) => {
            let out = unit.call(&props)?;
            *current_props = props;
            reconcile(scheduler, child, out)
        }
        (
            Mounted::Element {
                tag,
                attrs,
                children,
            },
            Node::Element(el),
        ) if *tag == el.tag => {
            *attrs = el.attrs;
            reconcile_all(scheduler, children, el.children)
        }
        (Mounted::Fragment(children), Node::Fragment(nodes)) => {
            reconcile_all(scheduler, children, nodes)
        }
        (Mounted::Text(text), Node::Text(next)) => {
            *text = next;
            Ok(())
        }
        (Mounted::Empty, Node::Empty) => Ok(()),
        (slot, node) => {
            unmount(std::mem::replace(slot, Mounted::Empty));
            *slot = mount(scheduler, node)?;
            Ok(())
        }
    }
}

fn reconcile_all(
    scheduler: &Rc<Scheduler>,
    slots: &mut Vec<Mounted>,
    nodes: Vec<Node>,
) -> Result<()> {
    let count = nodes.len();
    for (i, node) in nodes.into_iter().enumerate() {
        if i < slots.len() {
            reconcile(scheduler, &mut slots[i], node)?;
        } else {
            slots.push(mount(scheduler, node)?);
        }
    }
    if slots.len() > count {
        for old in slots.drain(count..) {
            unmount(old);
        }
    }
    Ok(())
}

/// Tear down a subtree, parents before children.
fn unmount(mounted: Mounted) {
    match mounted {
        Mounted::Empty | Mounted::Text(_) => {}
        Mounted::Element { children, .. } | Mounted::Fragment(children) => {
            children.into_iter().for_each(unmount);
        }
        Mounted::Pure { child, .. } => unmount(*child),
        Mounted::Stateful(cell) => {
            if cell.retire() {
                trace!(id = cell.id, unit = %cell.unit.name(), "unmount");
                cell.component().will_unmount(&cell.cx());
            }
            unmount(cell.child.replace(Mounted::Empty));
        }
    }
}

// =============================================================================
// Root
// =============================================================================

/// Top of a mounted tree.
pub struct Root {
    scheduler: Rc<Scheduler>,
    tree: RefCell<Option<Mounted>>,
}

impl Root {
    pub fn new(config: Config) -> Self {
        Self {
            scheduler: Scheduler::new(config),
            tree: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.scheduler.config
    }

    /// Render `node` into the root, updating what is already mounted.
    ///
    /// Fails with [`EnhanceError::Reentrant`] when called from inside a
    /// hook or render of this root.
    pub fn render(&self, node: Node) -> Result<()> {
        if self.scheduler.in_pass() {
            return Err(EnhanceError::Reentrant);
        }
        self.scheduler.pass(|| match self.tree.take() {
            Some(mut slot) => {
                let result = reconcile(&self.scheduler, &mut slot, node);
                *self.tree.borrow_mut() = Some(slot);
                result
            }
            None => {
                let mounted = mount(&self.scheduler, node)?;
                *self.tree.borrow_mut() = Some(mounted);
                Ok(())
            }
        })
    }

    /// Shorthand for `render(unit.element(props))`.
    pub fn render_unit(&self, unit: &Unit, props: Props) -> Result<()> {
        self.render(unit.element(props))
    }

    /// Resolved output of the current tree.
    pub fn output(&self) -> Node {
        self.tree
            .borrow()
            .as_ref()
            .map_or(Node::Empty, Mounted::output)
    }

    /// Run `f` with state updates deferred until it returns, then flush once.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> Result<T> {
        self.scheduler.pass(|| Ok(f()))
    }

    /// Process any pending state updates now.
    pub fn flush(&self) -> Result<()> {
        if self.scheduler.in_pass() {
            return Ok(());
        }
        self.scheduler.settle()
    }

    /// Tear the tree down. Every instance gets `will_unmount` at most once.
    ///
    /// Teardown runs as a pass: updaters called from `will_unmount` are
    /// dropped and `render` from a hook fails. Fails with
    /// [`EnhanceError::Reentrant`] when called from inside a hook or render.
    pub fn unmount(&self) -> Result<()> {
        if self.scheduler.in_pass() {
            return Err(EnhanceError::Reentrant);
        }
        if let Some(tree) = self.tree.take() {
            self.scheduler.nested(|| unmount(tree));
        }
        self.scheduler.dirty.borrow_mut().clear();
        self.scheduler.commits.borrow_mut().clear();
        Ok(())
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        if let Err(err) = self.unmount() {
            debug!(%err, "root dropped during a pass; tree left mounted");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
