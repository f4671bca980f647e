use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::{error::StructuralViolation, NodePath, NodeResolver, Symbol, Variant};

#[derive(Default)]
struct Scope {
    data: HashMap<Symbol, Variant>,
    parent: Option<Blackboard>,
}

/// Blackboard is a mapping of variable names to their values, optionally
/// chained to a parent scope.
///
/// The handle is reference counted: cloning it yields another handle to the
/// same scope, which is how every task of one instance shares a blackboard.
///
/// Reads walk the scope chain; writes always land in the local scope, so a
/// nested scope can shadow an outer variable without touching it. A parent
/// never refers back to its children, so dropping the last handle of a
/// child scope frees it.
#[derive(Clone, Default)]
pub struct Blackboard(Rc<RefCell<Scope>>);

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scope whose reads fall through to `parent`.
    pub fn with_parent(parent: &Blackboard) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            data: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    pub fn ptr_eq(&self, other: &Blackboard) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn parent_scope(&self) -> Option<Blackboard> {
        self.0.borrow().parent.clone()
    }

    /// Sets or clears the parent scope.
    ///
    /// Rejects `self` and any scope that already has `self` in its chain.
    pub fn set_parent_scope(&self, parent: Option<Blackboard>) -> Result<(), StructuralViolation> {
        if let Some(ref parent) = parent {
            if parent.ptr_eq(self) {
                return Err(StructuralViolation::SelfParent);
            }
            if parent.ancestors().any(|scope| scope.ptr_eq(self)) {
                return Err(StructuralViolation::Cycle);
            }
        }
        self.0.borrow_mut().parent = parent;
        Ok(())
    }

    /// Iterates over the strict ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Blackboard> {
        std::iter::successors(self.parent_scope(), |scope| scope.parent_scope())
    }

    /// The outermost scope of the chain.
    pub fn top(&self) -> Blackboard {
        self.ancestors().last().unwrap_or_else(|| self.clone())
    }

    pub fn get(&self, key: impl Into<Symbol>) -> Option<Variant> {
        let key = key.into();
        let mut scope = self.clone();
        loop {
            let next = {
                let inner = scope.0.borrow();
                if let Some(value) = inner.data.get(&key) {
                    return Some(value.clone());
                }
                inner.parent.clone()
            };
            scope = next?;
        }
    }

    /// Looks the key up in the local scope only.
    pub fn get_local(&self, key: impl Into<Symbol>) -> Option<Variant> {
        self.0.borrow().data.get(&key.into()).cloned()
    }

    pub fn get_var(&self, key: impl Into<Symbol>, default: Variant) -> Variant {
        self.get(key).unwrap_or(default)
    }

    pub fn set_var(&self, key: impl Into<Symbol>, value: impl Into<Variant>) {
        self.0.borrow_mut().data.insert(key.into(), value.into());
    }

    pub fn has_var(&self, key: impl Into<Symbol>) -> bool {
        let key = key.into();
        std::iter::once(self.clone())
            .chain(self.ancestors())
            .any(|scope| scope.0.borrow().data.contains_key(&key))
    }

    /// Removes a variable from the local scope, returning its old value.
    /// Ancestors are not touched, so an outer value may become visible again.
    pub fn erase_var(&self, key: impl Into<Symbol>) -> Option<Variant> {
        self.0.borrow_mut().data.remove(&key.into())
    }

    /// A copy of the local entries.
    pub fn data(&self) -> HashMap<Symbol, Variant> {
        self.0.borrow().data.clone()
    }

    pub fn set_data(&self, data: HashMap<Symbol, Variant>) {
        self.0.borrow_mut().data = data;
    }

    /// Replaces every local [`Variant::NodePath`] with the live reference
    /// `resolver` returns for it.
    ///
    /// Paths that do not resolve are kept, so a later call with a richer
    /// context can still pick them up. Already resolved entries are left
    /// alone, which makes repeated calls no-ops.
    pub fn prefetch_node_references(&self, resolver: &dyn NodeResolver) {
        // No borrow is held while the resolver runs, it may read this blackboard
        let paths: Vec<(Symbol, NodePath)> = self
            .0
            .borrow()
            .data
            .iter()
            .filter_map(|(key, value)| match value {
                Variant::NodePath(path) => Some((*key, path.clone())),
                _ => None,
            })
            .collect();
        for (key, path) in paths {
            match resolver.resolve_node(&path) {
                Some(node) => {
                    debug!("prefetched {} = {:?} for {:?}", key, node, path);
                    self.0.borrow_mut().data.insert(key, Variant::Node(node));
                }
                None => warn!("cannot prefetch {}: node {:?} not found", key, path),
            }
        }
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Blackboard")
            .field("data", &inner.data)
            .field("parent", &inner.parent)
            .finish()
    }
}
