use super::*;
use crate::{
    tasks::{Sequence, Succeed, Wait},
    BehaviorTree, Blackboard, TaskId,
};

fn instance() -> Instance<()> {
    let mut root = TaskTree::new(Sequence::default());
    root.add_child(TaskId::ROOT, Succeed).unwrap();
    root.add_child(TaskId::ROOT, Wait::new(1)).unwrap();
    let mut tree = BehaviorTree::new(root);
    tree.init();
    tree.instance((), Blackboard::new()).unwrap()
}

#[test]
fn test_session_flow() {
    let mut session = DebugSession::new();
    session.register_instance("/root/b");
    session.register_instance("/root/a");
    assert!(!session.is_active());
    // Nothing is reported before a session starts
    assert_eq!(session.poll_instances(), None);

    assert_eq!(
        session.handle(DebugCommand::StartSession),
        Some(DebugMessage::ActiveInstances(vec![
            "/root/a".to_owned(),
            "/root/b".to_owned()
        ]))
    );
    assert!(session.is_active());
    assert_eq!(session.poll_instances(), None);

    session.register_instance("/root/c");
    assert_eq!(
        session.poll_instances(),
        Some(DebugMessage::ActiveInstances(vec![
            "/root/a".to_owned(),
            "/root/b".to_owned(),
            "/root/c".to_owned()
        ]))
    );
    assert_eq!(session.poll_instances(), None);

    session.handle(DebugCommand::StopSession);
    assert!(!session.is_active());
}

#[test]
fn test_tracking() {
    let mut session = DebugSession::new();
    let mut tracked = instance();
    let other = instance();
    session.register_instance("/root/a");
    session.register_instance("/root/b");
    session.handle(DebugCommand::StartSession);

    // Unknown paths are not tracked
    assert_eq!(session.handle(DebugCommand::Track("/root/z".to_owned())), None);
    assert_eq!(session.tracked(), None);

    session.handle(DebugCommand::Track("/root/a".to_owned()));
    assert_eq!(session.tracked(), Some("/root/a"));

    tracked.tick();
    match session.update("/root/a", &tracked) {
        Some(DebugMessage::TreeUpdate(snapshot)) => {
            assert_eq!(snapshot.instance_path, "/root/a");
            assert_eq!(snapshot.root().unwrap().status, TaskStatus::Running);
            assert_eq!(snapshot, tracked.snapshot("/root/a"));
        }
        msg => panic!("unexpected message {:?}", msg),
    }
    assert_eq!(session.update("/root/b", &other), None);

    session.handle(DebugCommand::Untrack);
    assert_eq!(session.update("/root/a", &tracked), None);

    session.handle(DebugCommand::Track("/root/a".to_owned()));
    session.unregister_instance("/root/a");
    assert_eq!(session.tracked(), None);
    assert_eq!(session.active_instances(), vec!["/root/b".to_owned()]);
}

#[test]
fn test_no_update_without_session() {
    let mut session = DebugSession::new();
    let instance = instance();
    session.register_instance("/root/a");
    session.handle(DebugCommand::Track("/root/a".to_owned()));
    assert_eq!(session.update("/root/a", &instance), None);
}

#[test]
fn test_snapshot_shape() {
    let instance = instance();
    let snapshot = TreeSnapshot::capture("/root/a", instance.tree());
    assert_eq!(snapshot.tasks.len(), 3);
    let root = snapshot.root().unwrap();
    assert_eq!(root.children, vec![snapshot.tasks[1].id, snapshot.tasks[2].id]);
    for task in &snapshot.tasks[1..] {
        assert_eq!(task.parent, Some(TaskId::ROOT));
        assert_eq!(task.status, TaskStatus::Fresh);
    }
    assert_eq!(snapshot.task(root.children[1]).unwrap().name, "Wait");
}

#[test]
fn test_commands_from_yaml() -> anyhow::Result<()> {
    let command: DebugCommand = serde_yaml::from_str("command: track\ndata: /root/a\n")?;
    assert_eq!(command, DebugCommand::Track("/root/a".to_owned()));

    let command: DebugCommand = serde_yaml::from_str("command: start_session\n")?;
    assert_eq!(command, DebugCommand::StartSession);

    let message = DebugMessage::ActiveInstances(vec!["/root/a".to_owned()]);
    let text = serde_yaml::to_string(&message)?;
    let back: DebugMessage = serde_yaml::from_str(&text)?;
    assert_eq!(back, message);
    Ok(())
}
