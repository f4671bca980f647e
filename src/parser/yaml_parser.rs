use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::{
    error::{BindError, LoadYamlError},
    Agent, BehaviorTree, ParamBinding, PortBinding, PortType, Registry, Symbol, Task, TaskId,
    TaskTree, Variant,
};

#[derive(Deserialize)]
struct YamlFile {
    behavior_tree: Option<BTreeMap<String, YamlNode>>,
}

#[derive(Deserialize)]
struct YamlNode {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    children: Vec<YamlNode>,
    /// Port name to blackboard variable name.
    #[serde(default)]
    ports: BTreeMap<String, String>,
    /// Port name to literal value.
    #[serde(default)]
    params: BTreeMap<String, Value>,
}

/// Loads every tree under the top level `behavior_tree` mapping.
///
/// ```yaml
/// behavior_tree:
///   main:
///     type: Sequence
///     children:
///     - type: Wait
///       params:
///         ticks: 3
///     - type: SetVar
///       params:
///         value: done
///       ports:
///         output: state
/// ```
///
/// A variable in `ports` is bound in the direction the task declares for
/// that port, or as an input when the task does not declare it. Unknown
/// ports are ignored with a warning.
pub fn load_yaml<A: Agent>(
    yaml: &str,
    reg: &Registry<A>,
) -> Result<HashMap<String, BehaviorTree<A>>, LoadYamlError> {
    let file: YamlFile = serde_yaml::from_str(yaml)?;
    let roots = file.behavior_tree.ok_or(LoadYamlError::Missing)?;

    roots
        .iter()
        .map(|(name, node)| {
            let root = build(node, reg)?;
            let mut tree = TaskTree::new_boxed(root);
            add_children(&mut tree, TaskId::ROOT, node, reg)?;
            debug!("loaded yaml tree {} with {} tasks", name, tree.len());
            let mut behavior_tree = BehaviorTree::new(tree);
            behavior_tree.set_description(name.clone());
            behavior_tree.init();
            Ok((name.clone(), behavior_tree))
        })
        .collect()
}

fn add_children<A: Agent>(
    tree: &mut TaskTree<A>,
    parent: TaskId,
    node: &YamlNode,
    reg: &Registry<A>,
) -> Result<(), LoadYamlError> {
    for child in &node.children {
        let task = build(child, reg)?;
        let id = tree
            .add_child_boxed(parent, task)
            .map_err(|e| LoadYamlError::AddChildError(e, node.ty.clone()))?;
        add_children(tree, id, child, reg)?;
    }
    Ok(())
}

fn build<A: Agent>(node: &YamlNode, reg: &Registry<A>) -> Result<Box<dyn Task<A>>, LoadYamlError> {
    let mut task = reg
        .build(&node.ty)
        .ok_or_else(|| LoadYamlError::MissingNode(node.ty.clone()))?;
    let provided_ports = task.provided_ports();

    for (port, var) in &node.ports {
        let var = Symbol::from(var);
        let ty = provided_ports
            .iter()
            .find(|spec| spec.key == port)
            .map_or(PortType::Input, |spec| spec.ty);
        let binding = match ty {
            PortType::Input => PortBinding::Input(ParamBinding::Variable(var)),
            PortType::Output => PortBinding::Output(var),
            PortType::InOut => PortBinding::InOut(var),
        };
        bind(&mut *task, &node.ty, port, binding)?;
    }

    for (port, value) in &node.params {
        let Some(value) = literal(value) else {
            warn!("{}: param {:?} is not a scalar; ignored", node.ty, port);
            continue;
        };
        bind(&mut *task, &node.ty, port, PortBinding::Input(ParamBinding::Literal(value)))?;
    }

    Ok(task)
}

fn bind<A>(
    task: &mut dyn Task<A>,
    node: &str,
    port: &str,
    binding: PortBinding,
) -> Result<(), LoadYamlError> {
    match task.bind_port(port.into(), binding) {
        Ok(()) => Ok(()),
        Err(BindError::UnknownPort(_)) => {
            warn!("{} has no port {:?}; ignored", node, port);
            Ok(())
        }
        Err(source) => Err(LoadYamlError::Bind {
            node: node.to_owned(),
            port: port.to_owned(),
            source,
        }),
    }
}

fn literal(value: &Value) -> Option<Variant> {
    Some(match value {
        Value::Bool(b) => Variant::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Variant::Int(i),
            None => Variant::Float(n.as_f64()?),
        },
        Value::String(s) => Variant::String(s.clone()),
        _ => return None,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Blackboard, TaskStatus};

    #[test]
    fn test_load_yaml() {
        let trees = load_yaml::<()>(
            r#"
behavior_tree:
  main:
    type: Sequence
    children:
    - type: Repeat
      params:
        n: 2
      children:
      - type: Succeed
    - type: SetVar
      params:
        value: done
      ports:
        output: state
  idle:
    type: Succeed
"#,
            &Registry::default(),
        )
        .unwrap();

        assert_eq!(trees.len(), 2);
        assert!(trees["idle"].root_task().unwrap().is_linked());

        let mut instance = trees["main"].instance((), Blackboard::new()).unwrap();
        assert_eq!(instance.tick(), TaskStatus::Running);
        assert_eq!(instance.blackboard().get("state"), None);
        assert_eq!(instance.tick(), TaskStatus::Success);
        assert_eq!(instance.blackboard().get("state"), Some(Variant::from("done")));
    }

    #[test]
    fn test_yaml_variable_ports() {
        let trees = load_yaml::<()>(
            r#"
behavior_tree:
  main:
    type: Sequence
    children:
    - type: SetBool
      params:
        value: true
      ports:
        output: ready
    - type: IsTrue
      ports:
        input: ready
        nonsense: ignored
"#,
            &Registry::default(),
        )
        .unwrap();

        let mut instance = trees["main"].instance((), Blackboard::new()).unwrap();
        assert_eq!(instance.tick(), TaskStatus::Success);
        assert_eq!(instance.blackboard().get("ready"), Some(Variant::Bool(true)));
    }

    #[test]
    fn test_yaml_errors() {
        assert!(matches!(
            load_yaml::<()>("other: 1", &Registry::default()),
            Err(LoadYamlError::Missing)
        ));
        assert!(matches!(
            load_yaml::<()>("behavior_tree: [", &Registry::default()),
            Err(LoadYamlError::Yaml(_))
        ));
        assert!(matches!(
            load_yaml::<()>(
                "behavior_tree:\n  main:\n    type: Nope\n",
                &Registry::default()
            ),
            Err(LoadYamlError::MissingNode(name)) if name == "Nope"
        ));
        assert!(matches!(
            load_yaml::<()>(
                "behavior_tree:\n  main:\n    type: Inverter\n    children:\n    - type: Succeed\n    - type: Fail\n",
                &Registry::default()
            ),
            Err(LoadYamlError::AddChildError(_, name)) if name == "Inverter"
        ));
        assert!(matches!(
            load_yaml::<()>(
                "behavior_tree:\n  main:\n    type: CheckVar\n    params:\n      check: \"~\"\n",
                &Registry::default()
            ),
            Err(LoadYamlError::Bind { node, .. }) if node == "CheckVar"
        ));
    }
}
