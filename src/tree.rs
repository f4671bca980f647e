//! The arena a task tree lives in.
//!
//! Tasks are stored in a flat `Vec` of slots and refer to each other by
//! [`TaskId`]. Children are owned through their position in the arena; the
//! parent link is a plain index, so there is no ownership cycle to break.
//!
//! Slot 0 is always the root, and every child is appended after its parent,
//! so walking the slots in order visits parents before their children.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    error::{AddChildError, AddChildResult, ConfigurationError},
    task::TaskContext,
    BehaviorResult, Blackboard, NumChildren, Task, TaskStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(usize);

impl TaskId {
    pub const ROOT: TaskId = TaskId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Stands in for a task while it is taken out of its slot to be ticked.
#[derive(Clone)]
struct Ticking;

impl<A> Task<A> for Ticking {
    fn name(&self) -> &str {
        "<ticking>"
    }

    fn tick(&mut self, _ctx: &mut TaskContext<A>) -> BehaviorResult {
        BehaviorResult::Failure
    }
}

struct TaskSlot<A> {
    task: Box<dyn Task<A>>,
    children: Vec<TaskId>,
    parent: Option<TaskId>,
    status: TaskStatus,
    blackboard: Option<Blackboard>,
}

impl<A> TaskSlot<A> {
    fn new(task: Box<dyn Task<A>>) -> Self {
        Self {
            task,
            children: vec![],
            parent: None,
            status: TaskStatus::Fresh,
            blackboard: None,
        }
    }
}

pub struct TaskTree<A> {
    slots: Vec<TaskSlot<A>>,
    linked: bool,
}

impl<A> TaskTree<A> {
    pub fn new(root: impl Task<A> + 'static) -> Self {
        Self::new_boxed(Box::new(root))
    }

    pub fn new_boxed(root: Box<dyn Task<A>>) -> Self {
        Self {
            slots: vec![TaskSlot::new(root)],
            linked: true,
        }
    }

    /// Number of tasks, the root included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn add_child(&mut self, parent: TaskId, task: impl Task<A> + 'static) -> AddChildResult {
        self.add_child_boxed(parent, Box::new(task))
    }

    /// Appends `task` as the last child of `parent`.
    ///
    /// Only the child edge is recorded; parent links are written by
    /// [`TaskTree::link`].
    pub fn add_child_boxed(&mut self, parent: TaskId, task: Box<dyn Task<A>>) -> AddChildResult {
        let slot = self
            .slots
            .get(parent.0)
            .ok_or(AddChildError::UnknownParent(parent))?;
        if NumChildren::Finite(slot.children.len()) >= slot.task.max_children() {
            return Err(AddChildError::TooManyNodes);
        }
        let id = TaskId(self.slots.len());
        self.slots.push(TaskSlot::new(task));
        self.slots[parent.0].children.push(id);
        self.linked = false;
        Ok(id)
    }

    /// Appends a copy of `subtree` under `parent` and returns the id of the
    /// copied root.
    pub fn add_subtree(&mut self, parent: TaskId, subtree: &TaskTree<A>) -> AddChildResult {
        // Structural parents, read from the child lists so that an unlinked
        // subtree copies just as well.
        let mut parents = vec![None; subtree.slots.len()];
        for (idx, slot) in subtree.slots.iter().enumerate() {
            for child in &slot.children {
                parents[child.0] = Some(idx);
            }
        }

        let mut mapping: Vec<TaskId> = Vec::with_capacity(subtree.slots.len());
        for (slot, sub_parent) in subtree.slots.iter().zip(parents) {
            let new_parent = sub_parent.map_or(parent, |idx| mapping[idx]);
            let mut task = slot.task.clone_task();
            task.reset();
            mapping.push(self.add_child_boxed(new_parent, task)?);
        }
        Ok(mapping[0])
    }

    /// Writes every parent link, breadth first from the root. Running it
    /// again only rewrites the same links.
    pub fn link(&mut self) {
        self.slots[0].parent = None;
        let mut queue = VecDeque::from([TaskId::ROOT]);
        while let Some(id) = queue.pop_front() {
            let children = self.slots[id.0].children.clone();
            for child in children {
                self.slots[child.0].parent = Some(id);
                queue.push_back(child);
            }
        }
        self.linked = true;
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// A structural copy: same task types, configuration and child order,
    /// parent links copied as they are. Every task of the copy is fresh and
    /// unbound.
    pub fn clone_tree(&self) -> TaskTree<A> {
        Self {
            slots: self
                .slots
                .iter()
                .map(|slot| TaskSlot {
                    task: {
                        let mut task = slot.task.clone_task();
                        task.reset();
                        task
                    },
                    children: slot.children.clone(),
                    parent: slot.parent,
                    status: TaskStatus::Fresh,
                    blackboard: None,
                })
                .collect(),
            linked: self.linked,
        }
    }

    /// Binds every task to `agent` and a blackboard. The root gets
    /// `blackboard`; each child gets whatever its parent's
    /// [`Task::scope`] returns.
    pub fn initialize(&mut self, agent: &A, blackboard: &Blackboard) {
        self.slots[0].blackboard = Some(blackboard.clone());
        for idx in 0..self.slots.len() {
            let Some(bound) = self.slots[idx].blackboard.clone() else {
                error!("task {} is not reachable from the root", idx);
                continue;
            };
            let slot = &mut self.slots[idx];
            slot.task.setup(agent, &bound);
            let scope = slot.task.scope(&bound);
            if !scope.ptr_eq(&bound) {
                debug!("task {} ({}) opens a new blackboard scope", idx, slot.task.name());
            }
            for child in slot.children.clone() {
                self.slots[child.0].blackboard = Some(scope.clone());
            }
        }
    }

    /// Checks that every task has as many children as it needs.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for slot in &self.slots {
            let min = slot.task.min_children();
            if slot.children.len() < min {
                return Err(ConfigurationError::MissingChildren {
                    task: slot.task.name().to_owned(),
                    min,
                    actual: slot.children.len(),
                });
            }
        }
        Ok(())
    }

    /// Ticks the root task.
    pub fn tick(&mut self, agent: &A) -> TaskStatus {
        self.tick_task(TaskId::ROOT, agent).into()
    }

    pub(crate) fn tick_task(&mut self, id: TaskId, agent: &A) -> BehaviorResult {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return BehaviorResult::Failure;
        };
        let Some(blackboard) = slot.blackboard.clone() else {
            error!("task {:?} ticked before it was initialized", id);
            return BehaviorResult::Failure;
        };
        let ticking: Box<dyn Task<A>> = Box::new(Ticking);
        let mut task = std::mem::replace(&mut slot.task, ticking);

        let res = task.tick(&mut TaskContext {
            tree: self,
            id,
            agent,
            blackboard,
        });

        let slot = &mut self.slots[id.0];
        slot.task = task;
        slot.status = res.into();
        res
    }

    /// Returns a task and its whole subtree to [`TaskStatus::Fresh`], so the
    /// subtree is ticked from the start next time.
    pub fn abort(&mut self, id: TaskId) {
        let Some(slot) = self.slots.get(id.0) else {
            return;
        };
        for child in slot.children.clone() {
            self.abort(child);
        }
        let slot = &mut self.slots[id.0];
        if slot.status == TaskStatus::Running {
            debug!("aborting task {:?} ({})", id, slot.task.name());
        }
        slot.task.reset();
        slot.status = TaskStatus::Fresh;
    }

    pub(crate) fn children_of(&self, id: TaskId) -> &[TaskId] {
        self.slots
            .get(id.0)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn root(&self) -> TaskRef<'_, A> {
        TaskRef {
            tree: self,
            id: TaskId::ROOT,
        }
    }

    pub fn task(&self, id: TaskId) -> Option<TaskRef<'_, A>> {
        (id.0 < self.slots.len()).then_some(TaskRef { tree: self, id })
    }

    /// All tasks in arena order, which is parents before children.
    pub fn iter(&self) -> impl Iterator<Item = TaskRef<'_, A>> {
        (0..self.slots.len()).map(move |idx| TaskRef {
            tree: self,
            id: TaskId(idx),
        })
    }
}

impl<A> fmt::Debug for TaskTree<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// A read-only handle to one task of a [`TaskTree`].
pub struct TaskRef<'a, A> {
    tree: &'a TaskTree<A>,
    id: TaskId,
}

impl<'a, A> Clone for TaskRef<'a, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, A> Copy for TaskRef<'a, A> {}

impl<'a, A> TaskRef<'a, A> {
    fn slot(&self) -> &'a TaskSlot<A> {
        &self.tree.slots[self.id.0]
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.slot().task.name()
    }

    pub fn status(&self) -> TaskStatus {
        self.slot().status
    }

    pub fn parent(&self) -> Option<TaskRef<'a, A>> {
        self.slot().parent.map(|id| TaskRef {
            tree: self.tree,
            id,
        })
    }

    pub fn child_count(&self) -> usize {
        self.slot().children.len()
    }

    pub fn child(&self, idx: usize) -> Option<TaskRef<'a, A>> {
        self.slot().children.get(idx).map(|&id| TaskRef {
            tree: self.tree,
            id,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = TaskRef<'a, A>> + 'a {
        let tree = self.tree;
        self.slot()
            .children
            .iter()
            .map(move |&id| TaskRef { tree, id })
    }

    /// The blackboard this task was bound to by `initialize`.
    pub fn blackboard(&self) -> Option<&'a Blackboard> {
        self.slot().blackboard.as_ref()
    }

    pub fn task(&self) -> &'a dyn Task<A> {
        &*self.slot().task
    }
}

impl<'a, A> fmt::Debug for TaskRef<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TaskRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}
