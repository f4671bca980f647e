use std::collections::HashMap;

use crate::{NodePath, NodeRef};

/// Resolution context for deferred node references.
///
/// The host engine implements this for whatever owns its scene graph. An
/// agent type resolves paths relative to itself, which is what
/// [`BBNode`](crate::BBNode) relies on.
pub trait NodeResolver {
    fn resolve_node(&self, path: &NodePath) -> Option<NodeRef>;
}

/// The empty scene: nothing resolves.
impl NodeResolver for () {
    fn resolve_node(&self, _path: &NodePath) -> Option<NodeRef> {
        None
    }
}

/// A fixed lookup table, handy for headless hosts and tests.
impl NodeResolver for HashMap<NodePath, NodeRef> {
    fn resolve_node(&self, path: &NodePath) -> Option<NodeRef> {
        self.get(path).copied()
    }
}

impl<T: NodeResolver + ?Sized> NodeResolver for &T {
    fn resolve_node(&self, path: &NodePath) -> Option<NodeRef> {
        (**self).resolve_node(path)
    }
}

impl<T: NodeResolver + ?Sized> NodeResolver for std::rc::Rc<T> {
    fn resolve_node(&self, path: &NodePath) -> Option<NodeRef> {
        (**self).resolve_node(path)
    }
}
