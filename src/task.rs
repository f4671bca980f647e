use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::BindError, tree::TaskTree, Blackboard, PortBinding, PortSpec, Symbol, TaskId,
};

/// What a single tick of a task reports.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BehaviorResult {
    Success,
    Failure,
    /// The task should keep running in the next tick
    Running,
}

/// The recorded state of a task in a tree.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Never ticked since it was created, cloned or aborted.
    #[default]
    Fresh,
    Running,
    Success,
    Failure,
}

impl From<BehaviorResult> for TaskStatus {
    fn from(res: BehaviorResult) -> Self {
        match res {
            BehaviorResult::Success => Self::Success,
            BehaviorResult::Failure => Self::Failure,
            BehaviorResult::Running => Self::Running,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NumChildren {
    Finite(usize),
    Infinite,
}

impl PartialOrd for NumChildren {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(match (self, other) {
            (NumChildren::Finite(_), NumChildren::Infinite) => std::cmp::Ordering::Less,
            (NumChildren::Infinite, NumChildren::Finite(_)) => std::cmp::Ordering::Greater,
            (NumChildren::Finite(lhs), NumChildren::Finite(rhs)) => lhs.cmp(rhs),
            (NumChildren::Infinite, NumChildren::Infinite) => return None,
        })
    }
}

/// Object safe cloning of boxed tasks.
///
/// `Clone` itself is not object safe, so every `Task + Clone` gets this
/// through the blanket impl below and never needs to implement it by hand.
pub trait TaskClone<A> {
    fn clone_task(&self) -> Box<dyn Task<A>>;
}

impl<A, T> TaskClone<A> for T
where
    T: Task<A> + Clone + 'static,
{
    fn clone_task(&self) -> Box<dyn Task<A>> {
        Box::new(self.clone())
    }
}

/// A node of a behavior tree.
///
/// A task only holds its configuration and its local execution state, such
/// as which child to resume. Children, parent links and the recorded status
/// live in the [`TaskTree`] that owns the task, and are reached through the
/// [`TaskContext`] passed to [`Task::tick`].
pub trait Task<A>: TaskClone<A> {
    /// Type name used in diagnostics and debug snapshots.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![]
    }

    /// Configures a port from a template source.
    fn bind_port(&mut self, key: Symbol, _binding: PortBinding) -> Result<(), BindError> {
        Err(BindError::UnknownPort(key.to_string()))
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(0)
    }

    /// Fewer children than this is a configuration error at instancing time.
    fn min_children(&self) -> usize {
        0
    }

    /// Called once per instance, right after cloning, with the blackboard
    /// this task is bound to.
    fn setup(&mut self, _agent: &A, _blackboard: &Blackboard) {}

    /// The blackboard the children of this task are bound to.
    fn scope(&mut self, blackboard: &Blackboard) -> Blackboard {
        blackboard.clone()
    }

    /// Drops local execution state. Called when the task is aborted and on
    /// every fresh clone.
    fn reset(&mut self) {}

    fn tick(&mut self, ctx: &mut TaskContext<A>) -> BehaviorResult;
}

/// The view of the tree a task gets while it is being ticked.
pub struct TaskContext<'a, A> {
    pub(crate) tree: &'a mut TaskTree<A>,
    pub(crate) id: TaskId,
    pub(crate) agent: &'a A,
    pub(crate) blackboard: Blackboard,
}

impl<'a, A> TaskContext<'a, A> {
    pub fn agent(&self) -> &A {
        self.agent
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn task_id(&self) -> TaskId {
        self.id
    }

    pub fn child_count(&self) -> usize {
        self.tree.children_of(self.id).len()
    }

    pub fn child_status(&self, idx: usize) -> Option<crate::TaskStatus> {
        let child = *self.tree.children_of(self.id).get(idx)?;
        self.tree.task(child).map(|task| task.status())
    }

    /// Ticks the child at `idx`. A missing child counts as a failure.
    pub fn tick_child(&mut self, idx: usize) -> BehaviorResult {
        let Some(&child) = self.tree.children_of(self.id).get(idx) else {
            warn!("task {:?} has no child {}", self.id, idx);
            return BehaviorResult::Failure;
        };
        self.tree.tick_task(child, self.agent)
    }

    pub fn abort_child(&mut self, idx: usize) {
        if let Some(&child) = self.tree.children_of(self.id).get(idx) {
            self.tree.abort(child);
        }
    }

    /// Aborts every running child.
    pub fn abort_children(&mut self) {
        for idx in 0..self.child_count() {
            self.abort_child(idx);
        }
    }
}
