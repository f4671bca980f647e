//! # scoped-behavior-tree (Rust crate)
//!
//! A behavior tree runtime for game agents, with templates instanced per
//! agent, scoped blackboards and task parameters bound to blackboard variables.
//!
//!
//! ## Overview
//!
//! A behavior tree is an extension to finite state machines that makes describing transitional behavior easier.
//! See [BehaviorTreeCPP's documentation](https://www.behaviortree.dev/) for the thorough introduction to the idea.
//!
//! This crate splits a tree in two halves:
//!
//! * A [`BehaviorTree`] is a template. It is authored once, from Rust code,
//!   the custom config file format or yaml, and is never ticked itself.
//! * An [`Instance`] is a deep copy of a template bound to one agent and one
//!   [`Blackboard`]. Every agent in the game gets its own instance, and they
//!   share nothing but the template they came from.
//!
//!
//! ## How it looks like
//!
//! First, you build a tree of tasks. Tasks live in an arena, [`TaskTree`],
//! and refer to each other by [`TaskId`].
//!
//! ```rust
//! # use scoped_behavior_tree::*;
//! let mut root = TaskTree::<()>::new(Sequence::default());
//! root.add_child(TaskId::ROOT, SetVar::new("greeting", ParamBinding::Literal("Hello".into())))
//!     .unwrap();
//! root.add_child(TaskId::ROOT, Wait::new(2)).unwrap();
//!
//! let mut tree = BehaviorTree::new(root);
//! tree.init();
//! ```
//!
//! Then make an instance for an agent and call `tick()` every frame.
//! The agent can be any type that implements [`NodeResolver`]; `()` is an
//! agent in an empty scene.
//!
//! ```rust
//! # use scoped_behavior_tree::*;
//! # let mut root = TaskTree::new(Sequence::default());
//! # root.add_child(TaskId::ROOT, Wait::new(1)).unwrap();
//! # let mut tree = BehaviorTree::new(root);
//! # tree.init();
//! let mut instance = tree.instance((), Blackboard::new()).unwrap();
//! assert_eq!(instance.tick(), TaskStatus::Running);
//! assert_eq!(instance.tick(), TaskStatus::Success);
//! ```
//!
//! Instancing checks the shape of the tree. A template without a root, or a
//! decorator without its child, is reported as a [`error::ConfigurationError`]
//! instead of a panic. If you would rather keep the agent running,
//! [`BehaviorTree::instance_or_inert`] gives an instance that always fails.
//!
//!
//! ## Blackboard
//!
//! The blackboard is a mapping of variable names ([`Symbol`]) to dynamically
//! typed [`Variant`] values.
//! A blackboard can have a parent scope. Reads walk up the scope chain until
//! the variable is found, but writes always go to the scope itself, so a
//! child scope can never clobber the variables of its parent.
//!
//! ```rust
//! # use scoped_behavior_tree::*;
//! let global = Blackboard::new();
//! global.set_var("hp", 10);
//!
//! let local = Blackboard::with_parent(&global);
//! assert_eq!(local.get("hp"), Some(Variant::Int(10)));
//!
//! local.set_var("hp", 5);
//! assert_eq!(global.get("hp"), Some(Variant::Int(10)));
//! ```
//!
//! The [`NewScope`] task runs its child in a fresh child scope.
//! Subtrees in the config file format are expanded to it.
//!
//!
//! ## How to define your own task
//!
//! The core of the library is the [`Task`] trait.
//! A task only holds its configuration and its own execution state; the
//! children, the blackboard and the agent are reached through the
//! [`TaskContext`] passed to `tick`.
//!
//! Parameters are best held in typed [`BBParam`] wrappers like [`BBInt`],
//! which are either a literal or a reference to a blackboard variable.
//!
//! ```rust
//! # use scoped_behavior_tree::{*, error::BindError};
//! #[derive(Clone, Default)]
//! struct Heal {
//!     amount: BBInt,
//! }
//!
//! impl<A: Agent> Task<A> for Heal {
//!     fn provided_ports(&self) -> Vec<PortSpec> {
//!         vec![PortSpec::new_in("amount", VariantType::Int)]
//!     }
//!
//!     fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
//!         match binding {
//!             PortBinding::Input(binding) if key == "amount" => {
//!                 Ok(self.amount.param_mut().bind(binding)?)
//!             }
//!             _ => Err(BindError::UnknownPort(key.to_string())),
//!         }
//!     }
//!
//!     fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult {
//!         let amount = self.amount.resolve(ctx.agent(), ctx.blackboard(), 0);
//!         let hp = ctx.blackboard().get("hp").and_then(|v| v.as_int()).unwrap_or(0);
//!         ctx.blackboard().set_var("hp", hp + amount);
//!         BehaviorResult::Success
//!     }
//! }
//! ```
//!
//! The type only needs `Clone`. Cloning a task is how a template is copied
//! into an instance, so `Task::reset` is the place to drop any execution state.
//!
//! In order to use it from a config file, register a constructor to the [`Registry`].
//!
//! ```rust
//! # use scoped_behavior_tree::*;
//! # #[derive(Clone, Default)]
//! # struct Heal;
//! # impl<A: Agent> Task<A> for Heal { fn tick(&mut self, _: &mut TaskContext<A>) -> BehaviorResult { BehaviorResult::Success } }
//! let mut registry = Registry::<()>::default();
//! registry.register("Heal", boxify(Heal::default));
//! ```
//!
//! Built-in tasks, like `Sequence`, `Selector` (also `Fallback`), `Parallel`,
//! `Repeat` or `CheckVar`, are registered by default.
//!
//!
//! ## The custom config file format
//!
//! We have specific file format for describing behavior tree structure of our own.
//!
//! ```raw
//! tree main = Sequence {
//!     CheckVar (input <- hp, check <- "<", value <- "5")
//!     Heal (amount <- "3")
//! }
//! ```
//!
//! It can be converted to an AST with `parse_file` function, and
//! subsequently loaded into a template with `load`.
//! The third argument `check_ports` will switch port checking during loading.
//! If a task's `Task::provided_ports` and the source file's direction arrow
//! (`<-`, `->` or `<->`) disagree, it will become an error.
//!
//! ```rust
//! # use scoped_behavior_tree::*;
//! let source = r#"
//! tree main = Sequence {
//!     SetVar (value <- "3", output -> hp)
//!     CheckVar (input <- hp, check <- "<", value <- "5")
//! }
//! "#;
//! let (_, tree_source) = parse_file(source).unwrap();
//! let tree = load(&tree_source, &Registry::default(), true).unwrap();
//!
//! let mut instance = tree.instance((), Blackboard::new()).unwrap();
//! assert_eq!(instance.tick(), TaskStatus::Success);
//! ```
//!
//! ### Ports
//!
//! ```raw
//! a <- b      input port
//! a -> b      output port
//! a <-> b     inout port
//! a <- "3"    literal
//! ```
//!
//! A literal is always a string in the source file, and is converted to the
//! type of the port when it is bound. Specifying a literal to an output or
//! inout port is a parse error.
//!
//! ### Subtrees
//!
//! ```raw
//! tree main = Sequence {
//!     Guard (hp <- health, ok -> safe)
//! }
//!
//! tree Guard(in hp: int, out ok) = Sequence {
//!     CheckVar (input <- hp, check <- ">", value <- "3")
//!     SetVar (value <- "true", output -> ok)
//! }
//! ```
//!
//! A subtree runs in its own blackboard scope. Input ports are copied in,
//! converted to the declared type if any, and output ports are copied back
//! out after every tick. A subtree that refers to itself is a load error.
//!
//! ### Conditionals and variables
//!
//! ```raw
//! tree main = Sequence {
//!     var alert = false      # declares and sets a variable
//!     if (!alert && Found) {
//!         Patrol
//!     } else {
//!         Chase
//!     }
//!     Done || Retry
//! }
//! ```
//!
//! `!` is an [`Inverter`], `&&` a [`Sequence`] and `||` a [`Selector`].
//! A declared variable used as a node reads it as a boolean.
//! `#` starts a comment until the end of the line.
//!
//!
//! ### Loading the tree structure from a yaml file
//!
//! Trees can also be written in yaml, which any yaml library can produce.
//!
//! ```rust
//! # use scoped_behavior_tree::*;
//! let trees = load_yaml::<()>(r#"
//! behavior_tree:
//!   main:
//!     type: Repeat
//!     params:
//!       n: 2
//!     children:
//!     - type: Succeed
//! "#, &Registry::default()).unwrap();
//! assert!(trees.contains_key("main"));
//! ```

mod bb_param;
mod behavior_tree;
mod blackboard;
pub mod debugger;
pub mod error;
pub mod parser;
mod port;
mod registry;
mod resolver;
mod symbol;
mod task;
pub mod tasks;
mod tree;
mod variant;

pub use crate::{
    bb_param::{
        BBBool, BBFloat, BBInt, BBNode, BBParam, BBPlane, BBString, BBVector3, ParamBinding,
        ValueSource,
    },
    behavior_tree::{BehaviorTree, Instance},
    blackboard::Blackboard,
    parser::{load, load_yaml, parse_file},
    port::{PortBinding, PortSpec, PortType},
    registry::{boxify, Constructor, Registry},
    resolver::NodeResolver,
    symbol::Symbol,
    task::{BehaviorResult, NumChildren, Task, TaskClone, TaskContext, TaskStatus},
    tasks::{
        CheckType, CheckVar, Fail, ForceFailure, ForceSuccess, If, Inverter, IsTrue, NewScope,
        Parallel, ReactiveSelector, ReactiveSequence, Repeat, RepeatUntilFailure, Retry, Selector,
        Sequence, SetBool, SetVar, Succeed, Wait,
    },
    tree::{TaskId, TaskRef, TaskTree},
    variant::{NodePath, NodeRef, Plane, Variant, VariantType, Vector3},
};
pub use ::once_cell::sync::Lazy;

/// The owner of a tree instance, as seen by its tasks.
///
/// Anything that can resolve node paths in the host's scene can be an agent.
pub trait Agent: NodeResolver + 'static {}

impl<T: NodeResolver + 'static> Agent for T {}
