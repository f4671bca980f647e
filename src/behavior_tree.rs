use tracing::{debug, error, warn};

use crate::{
    debugger::TreeSnapshot, error::ConfigurationError, tasks::Fail, Agent, Blackboard, TaskId,
    TaskRef, TaskStatus, TaskTree,
};

/// A reusable template of a task tree.
///
/// Templates are authored once, linked with [`BehaviorTree::init`] and then
/// instanced per agent. Instancing takes `&self` and never modifies the
/// template, so any number of independent instances can be made from one
/// template.
pub struct BehaviorTree<A> {
    description: String,
    path: Option<String>,
    root_task: Option<TaskTree<A>>,
}

impl<A> Default for BehaviorTree<A> {
    fn default() -> Self {
        Self {
            description: String::new(),
            path: None,
            root_task: None,
        }
    }
}

impl<A> BehaviorTree<A> {
    pub fn new(root_task: TaskTree<A>) -> Self {
        Self {
            root_task: Some(root_task),
            ..Self::default()
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Where the template was loaded from, if anywhere.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn root_task(&self) -> Option<&TaskTree<A>> {
        self.root_task.as_ref()
    }

    pub fn root_task_mut(&mut self) -> Option<&mut TaskTree<A>> {
        self.root_task.as_mut()
    }

    pub fn set_root_task(&mut self, root_task: Option<TaskTree<A>>) {
        self.root_task = root_task;
    }

    /// Links every task of the template to its parent, breadth first.
    ///
    /// Call it once after authoring, before cloning or instancing. Calling
    /// it again only rewrites the same links.
    pub fn init(&mut self) {
        if let Some(root_task) = &mut self.root_task {
            root_task.link();
            debug!("linked behavior tree with {} tasks", root_task.len());
        }
    }
}

/// A detached copy to be used as a new template. The copy shares no task
/// with the original and is not considered to come from its path.
impl<A> Clone for BehaviorTree<A> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            path: None,
            root_task: self.root_task.as_ref().map(TaskTree::clone_tree),
        }
    }
}

impl<A: Agent> BehaviorTree<A> {
    fn checked_root(&self) -> Result<&TaskTree<A>, ConfigurationError> {
        let Some(root_task) = &self.root_task else {
            error!("Trying to instance a behavior tree with no valid root task");
            return Err(ConfigurationError::MissingRoot);
        };
        if let Err(e) = root_task.validate() {
            error!("Cannot instance behavior tree: {}", e);
            return Err(e);
        }
        Ok(root_task)
    }

    /// Clones the template and binds the copy to `agent` and `blackboard`.
    ///
    /// A template without a root task or with a task that lacks required
    /// children is reported as a [`ConfigurationError`].
    pub fn instance(&self, agent: A, blackboard: Blackboard) -> Result<Instance<A>, ConfigurationError> {
        let root_task = self.checked_root()?;
        Ok(Instance::from_template(root_task, agent, blackboard))
    }

    /// Like [`Self::instance`], but a misconfigured template yields an inert
    /// instance that fails on every tick instead of an error. The error is
    /// logged.
    pub fn instance_or_inert(&self, agent: A, blackboard: Blackboard) -> Instance<A> {
        match self.checked_root() {
            Ok(root_task) => Instance::from_template(root_task, agent, blackboard),
            Err(_) => {
                let mut tree = TaskTree::new(Fail);
                tree.initialize(&agent, &blackboard);
                Instance {
                    tree,
                    agent,
                    blackboard,
                }
            }
        }
    }
}

/// A template bound to one agent, ready to be ticked.
pub struct Instance<A> {
    tree: TaskTree<A>,
    agent: A,
    blackboard: Blackboard,
}

impl<A> Instance<A> {
    fn from_template(template: &TaskTree<A>, agent: A, blackboard: Blackboard) -> Self {
        let mut tree = template.clone_tree();
        if !tree.is_linked() {
            warn!("Behavior tree was not initialized with init(); linking the instance");
            tree.link();
        }
        tree.initialize(&agent, &blackboard);
        debug!("instanced behavior tree with {} tasks", tree.len());
        Self {
            tree,
            agent,
            blackboard,
        }
    }

    pub fn tick(&mut self) -> TaskStatus {
        self.tree.tick(&self.agent)
    }

    /// Aborts the running branch, so the next tick starts over.
    pub fn abort(&mut self) {
        self.tree.abort(TaskId::ROOT);
    }

    /// Status of the root task after the last tick.
    pub fn status(&self) -> TaskStatus {
        self.tree.root().status()
    }

    pub fn root(&self) -> TaskRef<'_, A> {
        self.tree.root()
    }

    pub fn tree(&self) -> &TaskTree<A> {
        &self.tree
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    /// The current shape and statuses, labeled with `path` for inspectors.
    pub fn snapshot(&self, path: impl Into<String>) -> TreeSnapshot {
        TreeSnapshot::capture(path, &self.tree)
    }
}

#[cfg(test)]
mod test;
