use thiserror::Error;

use crate::{TaskId, VariantType};

/// A template cannot be turned into a working instance.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("Trying to instance a behavior tree with no valid root task")]
    MissingRoot,
    #[error("Task {task} needs at least {min} children, but has {actual}")]
    MissingChildren {
        task: String,
        min: usize,
        actual: usize,
    },
}

/// Assigning a parent scope would break the acyclic scope chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralViolation {
    #[error("A blackboard cannot be its own parent scope")]
    SelfParent,
    #[error("The parent scope is already a descendant of this blackboard")]
    Cycle,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AddChildError {
    #[error("Attempted to add too many nodes")]
    TooManyNodes,
    #[error("No task with id {0:?} in this tree")]
    UnknownParent(TaskId),
}

pub type AddChildResult = Result<TaskId, AddChildError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("Cannot use a {found} value where {expected} is expected")]
    Coercion {
        expected: VariantType,
        found: VariantType,
    },
}

/// A task refused a port binding supplied by a loader.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindError {
    #[error("Task does not provide port {0:?}")]
    UnknownPort(String),
    #[error("Port {0:?} cannot take a literal")]
    LiteralOutput(String),
    #[error("Port {0:?} is bound in the wrong direction")]
    WrongDirection(String),
    #[error("Port {port:?} does not accept {value:?}")]
    InvalidValue { port: String, value: String },
    #[error(transparent)]
    Param(#[from] ParamError),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("The main tree does not exist")]
    MissingTree,
    #[error("Node type or subtree name not found {0:?}")]
    MissingNode(String),
    #[error("{0} to {1}")]
    AddChildError(AddChildError, String),
    #[error("Port {port:?} is not provided by {node}")]
    PortUnmatch { node: String, port: String },
    #[error("Port {port:?} of {node} has a different direction")]
    PortIOUnmatch { node: String, port: String },
    #[error("Cannot bind port {port:?} of {node}: {source}")]
    Bind {
        node: String,
        port: String,
        source: BindError,
    },
    #[error("Subtree {node:?} refers to itself")]
    InfiniteRecursion { node: String },
    #[error("Port {port:?} of subtree {tree} has unknown type {ty:?}")]
    UnknownPortType {
        tree: String,
        port: String,
        ty: String,
    },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadYamlError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("Missing behavior_tree mapping")]
    Missing,
    #[error("Node type not found {0:?}")]
    MissingNode(String),
    #[error("{0} to {1}")]
    AddChildError(AddChildError, String),
    #[error("Cannot bind port {port:?} of {node}: {source}")]
    Bind {
        node: String,
        port: String,
        source: BindError,
    },
}
