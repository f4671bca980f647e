use super::*;
use crate::{
    error::ConfigurationError,
    tasks::{Inverter, Selector, Sequence, Succeed},
    BehaviorResult, Task, TaskContext, Variant,
};

/// Counts its ticks in the `<name>_ticks` variable. Reports running on its
/// first `running` ticks after being reset, then succeeds.
#[derive(Clone)]
struct Leaf {
    name: &'static str,
    running: usize,
    ticked: usize,
}

impl Leaf {
    fn new(name: &'static str, running: usize) -> Self {
        Self {
            name,
            running,
            ticked: 0,
        }
    }
}

impl Task<()> for Leaf {
    fn reset(&mut self) {
        self.ticked = 0;
    }

    fn tick(&mut self, ctx: &mut TaskContext<()>) -> BehaviorResult {
        let counter = format!("{}_ticks", self.name);
        let bb = ctx.blackboard();
        let ticks = bb.get(&counter).and_then(|v| v.as_int()).unwrap_or(0);
        bb.set_var(&counter, ticks + 1);
        self.ticked += 1;
        if self.ticked <= self.running {
            BehaviorResult::Running
        } else {
            BehaviorResult::Success
        }
    }
}

fn ticks<A>(instance: &Instance<A>, name: &str) -> i64 {
    instance
        .blackboard()
        .get(format!("{}_ticks", name))
        .and_then(|v| v.as_int())
        .unwrap_or(0)
}

fn sequence(a_running: usize, b_running: usize) -> BehaviorTree<()> {
    let mut root = TaskTree::new(Sequence::default());
    root.add_child(TaskId::ROOT, Leaf::new("a", a_running)).unwrap();
    root.add_child(TaskId::ROOT, Leaf::new("b", b_running)).unwrap();
    let mut tree = BehaviorTree::new(root);
    tree.init();
    tree
}

#[test]
fn test_sequence_end_to_end() {
    let tree = sequence(0, 1);
    let mut instance = tree.instance((), Blackboard::new()).unwrap();
    assert!(instance.tree().iter().all(|task| task.status() == TaskStatus::Fresh));

    assert_eq!(instance.tick(), TaskStatus::Running);
    assert_eq!((ticks(&instance, "a"), ticks(&instance, "b")), (1, 1));

    assert_eq!(instance.tick(), TaskStatus::Success);
    // The first leaf is not re-ticked
    assert_eq!((ticks(&instance, "a"), ticks(&instance, "b")), (1, 2));
    assert_eq!(instance.status(), TaskStatus::Success);
}

#[test]
fn test_missing_root() {
    let tree = BehaviorTree::<()>::default();
    assert!(matches!(
        tree.instance((), Blackboard::new()),
        Err(ConfigurationError::MissingRoot)
    ));

    let mut inert = tree.instance_or_inert((), Blackboard::new());
    assert_eq!(inert.tick(), TaskStatus::Failure);
    assert_eq!(inert.tick(), TaskStatus::Failure);
}

#[test]
fn test_missing_children() {
    let mut root = TaskTree::new(Sequence::default());
    root.add_child(TaskId::ROOT, Inverter).unwrap();
    let tree = BehaviorTree::new(root);

    match tree.instance((), Blackboard::new()) {
        Err(ConfigurationError::MissingChildren { task, min, actual }) => {
            assert_eq!((task.as_str(), min, actual), ("Inverter", 1, 0));
        }
        _ => panic!("a childless decorator should not be instanced"),
    }
    let mut inert = tree.instance_or_inert((), Blackboard::new());
    assert_eq!(inert.root().name(), "Fail");
    assert_eq!(inert.tick(), TaskStatus::Failure);
}

#[test]
fn test_instances_are_independent() {
    let tree = sequence(1, 0);
    let mut first = tree.instance((), Blackboard::new()).unwrap();
    let mut second = tree.instance((), Blackboard::new()).unwrap();

    assert_eq!(first.tick(), TaskStatus::Running);
    assert_eq!(second.root().status(), TaskStatus::Fresh);
    assert_eq!(ticks(&second, "a"), 0);

    // The template itself is never ticked
    let template = tree.root_task().unwrap();
    assert!(template.iter().all(|task| task.status() == TaskStatus::Fresh));

    assert_eq!(second.tick(), TaskStatus::Running);
    assert_eq!(first.tick(), TaskStatus::Success);
    assert_eq!(second.tick(), TaskStatus::Success);
    assert_eq!(ticks(&first, "a"), 2);
    assert_eq!(ticks(&second, "a"), 2);
}

#[test]
fn test_instance_is_isomorphic() {
    let mut root = TaskTree::new(Selector::default());
    let seq = root.add_child(TaskId::ROOT, Sequence::default()).unwrap();
    root.add_child(seq, Succeed).unwrap();
    root.add_child(TaskId::ROOT, Succeed).unwrap();
    let mut tree = BehaviorTree::new(root);
    tree.init();

    let instance = tree.instance((), Blackboard::new()).unwrap();
    let template = tree.root_task().unwrap();
    assert_eq!(instance.tree().len(), template.len());
    for (copy, original) in instance.tree().iter().zip(template.iter()) {
        assert_eq!(copy.name(), original.name());
        assert_eq!(copy.child_count(), original.child_count());
        assert_eq!(copy.parent().map(|p| p.id()), original.parent().map(|p| p.id()));
    }
    assert!(instance.root().parent().is_none());
}

#[test]
fn test_uninitialized_template() {
    // Without init() the instance is linked anyway
    let mut root = TaskTree::new(Sequence::default());
    let leaf = root.add_child(TaskId::ROOT, Succeed).unwrap();
    let tree = BehaviorTree::new(root);
    assert!(!tree.root_task().unwrap().is_linked());

    let mut instance = tree.instance((), Blackboard::new()).unwrap();
    assert_eq!(instance.tree().task(leaf).unwrap().parent().unwrap().id(), TaskId::ROOT);
    assert_eq!(instance.tick(), TaskStatus::Success);
}

#[test]
fn test_clone_template() {
    let mut tree = sequence(0, 0);
    tree.set_path("res://enemy.bt");
    tree.set_description("enemy");

    let copy = tree.clone();
    assert_eq!(copy.path(), None);
    assert_eq!(copy.description(), "enemy");
    assert_eq!(copy.root_task().unwrap().len(), 3);
    assert!(copy.root_task().unwrap().is_linked());

    tree.set_root_task(None);
    assert!(copy.instance((), Blackboard::new()).is_ok());
}

#[test]
fn test_abort_restarts() {
    let tree = sequence(0, 2);
    let mut instance = tree.instance((), Blackboard::new()).unwrap();
    assert_eq!(instance.tick(), TaskStatus::Running);
    assert_eq!(instance.root().child(1).unwrap().status(), TaskStatus::Running);

    instance.abort();
    assert!(instance.tree().iter().all(|task| task.status() == TaskStatus::Fresh));

    // Starts over at the first child, and the second leaf lost its progress
    assert_eq!(instance.tick(), TaskStatus::Running);
    assert_eq!((ticks(&instance, "a"), ticks(&instance, "b")), (2, 2));
    assert_eq!(instance.tick(), TaskStatus::Running);
    assert_eq!(instance.tick(), TaskStatus::Success);
}

#[test]
fn test_snapshot() {
    let tree = sequence(0, 1);
    let mut instance = tree.instance((), Blackboard::new()).unwrap();
    instance.tick();

    let snapshot = instance.snapshot("/root/Enemy");
    assert_eq!(snapshot.instance_path, "/root/Enemy");
    assert_eq!(snapshot.tasks.len(), 3);
    let root = snapshot.root().unwrap();
    assert_eq!(root.name, "Sequence");
    assert_eq!(root.status, TaskStatus::Running);
    assert_eq!(root.parent, None);
    let b = snapshot.task(root.children[1]).unwrap();
    assert_eq!((b.name.as_str(), b.status), ("Leaf", TaskStatus::Running));
    assert_eq!(b.parent, Some(TaskId::ROOT));
}

#[test]
fn test_agent_and_blackboard_access() {
    let tree = sequence(0, 0);
    let bb = Blackboard::new();
    bb.set_var("hp", 3);
    let mut instance = tree.instance((), bb.clone()).unwrap();
    assert!(instance.blackboard().ptr_eq(&bb));
    instance.tick();
    assert_eq!(bb.get("a_ticks"), Some(Variant::Int(1)));
    let _: &() = instance.agent();
    let _: &mut () = instance.agent_mut();
}
