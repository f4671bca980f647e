use tracing::{debug, warn};

use super::nom_parser::{BlackboardValue, PortDef, PortMap, TreeDef, TreeRootDef, TreeSource, VarDef};
use crate::{
    error::{BindError, LoadError},
    tasks::{IsTrue, NewScope},
    Agent, BBBool, BehaviorTree, ParamBinding, PortBinding, PortSpec, PortType, Registry, Symbol,
    Task, TaskId, TaskTree, Variant, VariantType,
};

/// Builds a behavior tree template from the AST of a source file.
///
/// The tree named `main` becomes the root. A node type that is not in
/// `registry` is looked up among the other trees of the source and
/// expanded in place as a [`NewScope`] task, so that a subtree gets its own
/// blackboard scope with its declared ports bridged in and out.
///
/// `check_ports` enables static checking of port availability before
/// actually ticking. It is useful to catch errors in a source file, but
/// tasks need to implement [`Task::provided_ports`] to pass it. Without it,
/// a port the task does not know is ignored with a warning.
///
/// The returned template is already linked with [`BehaviorTree::init`].
pub fn load<A: Agent>(
    tree_source: &TreeSource,
    registry: &Registry<A>,
    check_ports: bool,
) -> Result<BehaviorTree<A>, LoadError> {
    let main = tree_source.find("main").ok_or(LoadError::MissingTree)?;

    let loader = Loader {
        registry,
        tree_source,
        check_ports,
    };
    let top = TreeStack {
        name: "main",
        parent: None,
    };
    let vars = VarScope {
        vars: &[],
        parent: None,
    };

    let (root, subtree) = loader.instantiate(&main.root, &top, &vars)?;
    let mut tree = TaskTree::new_boxed(root);
    loader.expand(&mut tree, TaskId::ROOT, &main.root, subtree, &top, &vars)?;
    debug!("loaded tree main with {} tasks", tree.len());

    let mut ret = BehaviorTree::new(tree);
    ret.init();
    Ok(ret)
}

/// A mechanism to detect infinite recursion. It is a linked list in call stack.
/// You can traverse the link back to enumerate all the subtree names (which is effectively function names)
/// and check if a subtree name to be inserted is already there.
///
/// Recursive subtrees are an error: a template is expanded eagerly, so a
/// subtree that contains itself would never finish loading.
struct TreeStack<'a> {
    name: &'a str,
    parent: Option<&'a TreeStack<'a>>,
}

impl<'a> TreeStack<'a> {
    fn find(&self, name: &str) -> bool {
        if self.name == name {
            true
        } else if let Some(parent) = self.parent {
            parent.find(name)
        } else {
            false
        }
    }
}

/// Variables declared with `var` in the enclosing blocks of one tree.
struct VarScope<'a> {
    vars: &'a [VarDef<'a>],
    parent: Option<&'a VarScope<'a>>,
}

impl<'a> VarScope<'a> {
    fn find(&self, name: &str) -> bool {
        self.vars.iter().any(|var| var.name == name)
            || self.parent.map_or(false, |parent| parent.find(name))
    }
}

struct Loader<'a, 'src, A> {
    registry: &'a Registry<A>,
    tree_source: &'a TreeSource<'src>,
    check_ports: bool,
}

impl<'a, 'src, A: Agent> Loader<'a, 'src, A> {
    /// Creates the task for `def` with its ports bound. If `def` refers to
    /// a subtree, its definition is returned too, to be expanded below the
    /// task.
    fn instantiate(
        &self,
        def: &TreeDef,
        stack: &TreeStack,
        vars: &VarScope,
    ) -> Result<(Box<dyn Task<A>>, Option<&'a TreeRootDef<'src>>), LoadError> {
        // A bare reference to a declared variable reads it as a condition
        if def.port_maps.is_empty() && def.children.is_empty() && vars.find(def.ty) {
            let task: Box<dyn Task<A>> = Box::new(IsTrue::new(BBBool::variable(def.ty)));
            return Ok((task, None));
        }

        let (mut task, subtree) = if let Some(task) = self.registry.build(def.ty) {
            (task, None)
        } else {
            let tree = self
                .tree_source
                .find(def.ty)
                .ok_or_else(|| LoadError::MissingNode(def.ty.to_owned()))?;

            // Prevent infinite recursion
            if stack.find(def.ty) {
                return Err(LoadError::InfiniteRecursion {
                    node: def.ty.to_owned(),
                });
            }
            let params = tree
                .ports
                .iter()
                .map(|port| subtree_port_spec(tree, port))
                .collect::<Result<Vec<_>, _>>()?;
            let task: Box<dyn Task<A>> = Box::new(NewScope::new(tree.name, params));
            (task, Some(tree))
        };

        self.bind_ports(&mut *task, def)?;
        Ok((task, subtree))
    }

    fn bind_ports(&self, task: &mut dyn Task<A>, def: &TreeDef) -> Result<(), LoadError> {
        let provided_ports = if self.check_ports {
            task.provided_ports()
        } else {
            vec![]
        };
        for entry in &def.port_maps {
            if self.check_ports {
                match provided_ports.iter().find(|p| p.key == entry.node_port) {
                    Some(port) if port.ty != entry.ty => {
                        return Err(LoadError::PortIOUnmatch {
                            node: def.ty.to_owned(),
                            port: entry.node_port.to_owned(),
                        })
                    }
                    Some(_) => (),
                    None => {
                        return Err(LoadError::PortUnmatch {
                            node: def.ty.to_owned(),
                            port: entry.node_port.to_owned(),
                        })
                    }
                }
            }
            match task.bind_port(entry.node_port.into(), port_binding(entry)) {
                Ok(()) => (),
                Err(BindError::UnknownPort(_)) if !self.check_ports => {
                    warn!("{} has no port {:?}; ignored", def.ty, entry.node_port)
                }
                Err(source) => {
                    return Err(LoadError::Bind {
                        node: def.ty.to_owned(),
                        port: entry.node_port.to_owned(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    /// Adds the subtree behind `id`, if any, and then the children of
    /// `def`, recursively.
    fn expand(
        &self,
        tree: &mut TaskTree<A>,
        id: TaskId,
        def: &TreeDef,
        subtree: Option<&'a TreeRootDef<'src>>,
        stack: &TreeStack,
        vars: &VarScope,
    ) -> Result<(), LoadError> {
        if let Some(subtree) = subtree {
            let stack = TreeStack {
                name: subtree.name,
                parent: Some(stack),
            };
            // Each subtree has a namespace of its own
            let sub_vars = VarScope {
                vars: &[],
                parent: None,
            };
            let (task, nested) = self.instantiate(&subtree.root, &stack, &sub_vars)?;
            let root = tree
                .add_child_boxed(id, task)
                .map_err(|e| LoadError::AddChildError(e, subtree.name.to_owned()))?;
            self.expand(tree, root, &subtree.root, nested, &stack, &sub_vars)?;
        }

        let vars = VarScope {
            vars: &def.vars,
            parent: Some(vars),
        };
        for child in &def.children {
            let (task, nested) = self.instantiate(child, stack, &vars)?;
            let child_id = tree
                .add_child_boxed(id, task)
                .map_err(|e| LoadError::AddChildError(e, def.ty.to_owned()))?;
            self.expand(tree, child_id, child, nested, stack, &vars)?;
        }
        Ok(())
    }
}

fn port_binding(entry: &PortMap) -> PortBinding {
    match (&entry.blackboard_value, entry.ty) {
        (BlackboardValue::Literal(value), _) => {
            PortBinding::Input(ParamBinding::Literal(Variant::String(value.clone())))
        }
        (BlackboardValue::Ref(var), PortType::Input) => {
            PortBinding::Input(ParamBinding::Variable(Symbol::from(var)))
        }
        (BlackboardValue::Ref(var), PortType::Output) => PortBinding::Output(Symbol::from(var)),
        (BlackboardValue::Ref(var), PortType::InOut) => PortBinding::InOut(Symbol::from(var)),
    }
}

fn subtree_port_spec(tree: &TreeRootDef, port: &PortDef) -> Result<PortSpec, LoadError> {
    let value_type = port
        .ty
        .map(|ty| {
            value_type(ty).ok_or_else(|| LoadError::UnknownPortType {
                tree: tree.name.to_owned(),
                port: port.name.to_owned(),
                ty: ty.to_owned(),
            })
        })
        .transpose()?;
    Ok(PortSpec {
        ty: port.direction,
        key: port.name.into(),
        value_type,
    })
}

fn value_type(name: &str) -> Option<VariantType> {
    Some(match name {
        "bool" => VariantType::Bool,
        "int" => VariantType::Int,
        "float" => VariantType::Float,
        "string" => VariantType::String,
        "vector3" => VariantType::Vector3,
        "plane" => VariantType::Plane,
        "node_path" | "path" => VariantType::NodePath,
        _ => return None,
    })
}

#[cfg(test)]
mod test;
