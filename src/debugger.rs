//! Inspection support.
//!
//! An inspector (typically an editor on the other end of some transport)
//! watches running instances by their path. This module produces the data it
//! consumes and keeps track of what it asked for; moving the messages across
//! is left to the host.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{behavior_tree::Instance, TaskId, TaskStatus, TaskTree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub parent: Option<TaskId>,
    pub name: String,
    pub status: TaskStatus,
    pub children: Vec<TaskId>,
}

/// Shape and statuses of one instance at a point in time, in arena order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub instance_path: String,
    pub tasks: Vec<TaskSnapshot>,
}

impl TreeSnapshot {
    pub fn capture<A>(instance_path: impl Into<String>, tree: &TaskTree<A>) -> Self {
        Self {
            instance_path: instance_path.into(),
            tasks: tree
                .iter()
                .map(|task| TaskSnapshot {
                    id: task.id(),
                    parent: task.parent().map(|parent| parent.id()),
                    name: task.name().to_owned(),
                    status: task.status(),
                    children: task.children().map(|child| child.id()).collect(),
                })
                .collect(),
        }
    }

    pub fn root(&self) -> Option<&TaskSnapshot> {
        self.tasks.first()
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskSnapshot> {
        self.tasks.get(id.index())
    }
}

/// Requests from the inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "snake_case")]
pub enum DebugCommand {
    StartSession,
    StopSession,
    /// Start sending updates of the instance with this path.
    Track(String),
    Untrack,
}

/// Data sent to the inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", content = "data", rename_all = "snake_case")]
pub enum DebugMessage {
    ActiveInstances(Vec<String>),
    TreeUpdate(TreeSnapshot),
}

/// Bookkeeping for one inspector connection.
#[derive(Debug, Default)]
pub struct DebugSession {
    active: bool,
    instances: BTreeSet<String>,
    tracked: Option<String>,
    instances_changed: bool,
}

impl DebugSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tracked(&self) -> Option<&str> {
        self.tracked.as_deref()
    }

    pub fn register_instance(&mut self, path: impl Into<String>) {
        let path = path.into();
        debug!("registered instance {:?}", path);
        self.instances_changed |= self.instances.insert(path);
    }

    pub fn unregister_instance(&mut self, path: &str) {
        if !self.instances.remove(path) {
            return;
        }
        self.instances_changed = true;
        if self.tracked.as_deref() == Some(path) {
            info!("tracked instance {:?} is gone", path);
            self.tracked = None;
        }
    }

    /// Registered instance paths, sorted.
    pub fn active_instances(&self) -> Vec<String> {
        self.instances.iter().cloned().collect()
    }

    /// Applies a command. Starting a session answers with the list of
    /// instances; the other commands have no immediate reply.
    pub fn handle(&mut self, command: DebugCommand) -> Option<DebugMessage> {
        match command {
            DebugCommand::StartSession => {
                self.active = true;
                self.instances_changed = false;
                Some(DebugMessage::ActiveInstances(self.active_instances()))
            }
            DebugCommand::StopSession => {
                self.active = false;
                self.tracked = None;
                None
            }
            DebugCommand::Track(path) => {
                if self.instances.contains(&path) {
                    self.tracked = Some(path);
                } else {
                    warn!("cannot track unknown instance {:?}", path);
                }
                None
            }
            DebugCommand::Untrack => {
                self.tracked = None;
                None
            }
        }
    }

    /// The instance list, if it changed since it was last reported and a
    /// session is running.
    pub fn poll_instances(&mut self) -> Option<DebugMessage> {
        if !self.active || !self.instances_changed {
            return None;
        }
        self.instances_changed = false;
        Some(DebugMessage::ActiveInstances(self.active_instances()))
    }

    /// A snapshot of `instance`, if it is the tracked one. Meant to be called
    /// by the host after each tick of every registered instance.
    pub fn update<A>(&self, path: &str, instance: &Instance<A>) -> Option<DebugMessage> {
        if !self.active || self.tracked.as_deref() != Some(path) {
            return None;
        }
        Some(DebugMessage::TreeUpdate(instance.snapshot(path)))
    }
}

#[cfg(test)]
mod test;
