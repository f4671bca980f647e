use super::*;
use crate::{
    boxify, parse_file, BehaviorResult, Blackboard, Instance, TaskContext, TaskStatus,
};

/// Adds one to the `count` variable every tick.
#[derive(Clone)]
struct Counter;

impl Task<()> for Counter {
    fn tick(&mut self, ctx: &mut TaskContext<()>) -> BehaviorResult {
        let bb = ctx.blackboard();
        let count = bb.get("count").and_then(|v| v.as_int()).unwrap_or(0);
        bb.set_var("count", count + 1);
        BehaviorResult::Success
    }
}

/// Writes "hello, <name>" to its `greeting` port.
#[derive(Clone, Default)]
struct Greet {
    name: crate::BBString,
    greeting: Option<Symbol>,
}

impl Task<()> for Greet {
    fn provided_ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::new_in("name", VariantType::String),
            PortSpec::new_out("greeting"),
        ]
    }

    fn bind_port(&mut self, key: Symbol, binding: PortBinding) -> Result<(), BindError> {
        match (key.as_str(), binding) {
            ("name", PortBinding::Input(binding)) => Ok(self.name.param_mut().bind(binding)?),
            ("greeting", PortBinding::Output(var)) => {
                self.greeting = Some(var);
                Ok(())
            }
            ("name" | "greeting", _) => Err(BindError::WrongDirection(key.to_string())),
            _ => Err(BindError::UnknownPort(key.to_string())),
        }
    }

    fn tick(&mut self, ctx: &mut TaskContext<()>) -> BehaviorResult {
        let Some(greeting) = self.greeting else {
            return BehaviorResult::Failure;
        };
        let name = self.name.resolve(ctx.agent(), ctx.blackboard(), String::new());
        ctx.blackboard().set_var(greeting, format!("hello, {}", name));
        BehaviorResult::Success
    }
}

fn registry() -> Registry<()> {
    let mut registry = Registry::default();
    registry.register("Counter", boxify(|| Counter));
    registry.register("Greet", boxify(Greet::default));
    registry
}

fn instance(src: &str, check_ports: bool) -> Instance<()> {
    let (_, tree_source) = parse_file(src).unwrap();
    let tree = load(&tree_source, &registry(), check_ports).unwrap();
    tree.instance((), Blackboard::new()).unwrap()
}

fn load_err(src: &str, check_ports: bool) -> LoadError {
    let (_, tree_source) = parse_file(src).unwrap();
    match load(&tree_source, &registry(), check_ports) {
        Ok(_) => panic!("{} should not load", src),
        Err(e) => e,
    }
}

#[test]
fn test_subtree() {
    let mut instance = instance(
        r#"
tree main = Sequence {
    sub
}

tree sub = Fallback {
    Counter
}
"#,
        true,
    );

    assert_eq!(instance.tick(), TaskStatus::Success);
    assert_eq!(instance.root().name(), "Sequence");
    let sub = instance.root().child(0).unwrap();
    assert_eq!(sub.name(), "sub");
    assert_eq!(sub.child(0).unwrap().name(), "Selector");
    // Written in the scope of the subtree only
    assert_eq!(instance.blackboard().get("count"), None);
    assert_eq!(
        sub.child(0).unwrap().blackboard().unwrap().get("count"),
        Some(Variant::Int(1))
    );
}

#[test]
fn test_subtree_map() {
    let mut instance = instance(
        r#"
tree main = Sequence {
    sub(input <- "96", output -> result)
}

tree sub(in input: int, out output) = Fallback {
    SetVar(value <- input, output -> output)
}
"#,
        true,
    );

    assert_eq!(instance.tick(), TaskStatus::Success);
    assert_eq!(instance.blackboard().get("result"), Some(Variant::Int(96)));
    assert_eq!(instance.blackboard().get("output"), None);
}

#[test]
fn test_subtree_inout() {
    let mut instance = instance(
        r#"
tree main = Sequence {
    SetVar(value <- "41", output -> total)
    bump(count <-> total)
}

tree bump(inout count: int) = Sequence {
    SetVar(value <- "42", output -> count)
}
"#,
        true,
    );

    assert_eq!(instance.tick(), TaskStatus::Success);
    assert_eq!(instance.blackboard().get("total"), Some(Variant::String("42".to_owned())));
}

#[test]
fn test_recurse() {
    let e = load_err(
        r#"
tree main = Sequence {
    sub
}

tree sub = Sequence {
    sub
}
"#,
        false,
    );
    assert!(matches!(e, LoadError::InfiniteRecursion { node } if node == "sub"));

    let e = load_err(
        r#"
tree main = one

tree one = Sequence {
    two
}

tree two = Sequence {
    Counter
    one
}
"#,
        false,
    );
    assert!(matches!(e, LoadError::InfiniteRecursion { node } if node == "one"));
}

#[test]
fn test_missing_tree_and_node() {
    assert!(matches!(
        load_err("tree other = Sequence {}", false),
        LoadError::MissingTree
    ));
    assert!(matches!(
        load_err("tree main = Sequence { Nope }", false),
        LoadError::MissingNode(name) if name == "Nope"
    ));
}

#[test]
fn test_check_ports() {
    let src = r#"tree main = Wait(tick <- "3")"#;
    assert!(matches!(
        load_err(src, true),
        LoadError::PortUnmatch { node, port } if node == "Wait" && port == "tick"
    ));
    // Ignored with a warning when unchecked
    let (_, tree_source) = parse_file(src).unwrap();
    assert!(load(&tree_source, &registry(), false).is_ok());

    assert!(matches!(
        load_err("tree main = Wait(ticks -> elapsed)", true),
        LoadError::PortIOUnmatch { node, port } if node == "Wait" && port == "ticks"
    ));
}

#[test]
fn test_bind_error() {
    let e = load_err(r#"tree main = CheckVar(input <- x, check <- "~")"#, false);
    match e {
        LoadError::Bind { node, port, source } => {
            assert_eq!(node, "CheckVar");
            assert_eq!(port, "check");
            assert_eq!(
                source,
                BindError::InvalidValue {
                    port: "check".to_owned(),
                    value: "~".to_owned()
                }
            );
        }
        e => panic!("unexpected error {:?}", e),
    }
}

#[test]
fn test_unknown_port_type() {
    let e = load_err(
        r#"
tree main = sub(x <- "1")

tree sub(in x: widget) = Succeed
"#,
        false,
    );
    assert!(matches!(
        e,
        LoadError::UnknownPortType { tree, port, ty }
            if tree == "sub" && port == "x" && ty == "widget"
    ));
}

#[test]
fn test_literal_param() {
    let mut instance = instance(
        r#"
tree main = Repeat(n <- "3") {
    Counter
}
"#,
        true,
    );

    assert_eq!(instance.tick(), TaskStatus::Running);
    assert_eq!(instance.tick(), TaskStatus::Running);
    assert_eq!(instance.tick(), TaskStatus::Success);
    assert_eq!(instance.blackboard().get("count"), Some(Variant::Int(3)));
}

#[test]
fn test_var_condition() {
    let src = |init: &str| {
        format!(
            r#"
tree main = Sequence {{
    var ready = {}
    if (ready) {{
        SetVar(value <- "yes", output -> answer)
    }} else {{
        SetVar(value <- "no", output -> answer)
    }}
}}
"#,
            init
        )
    };

    let mut yes = instance(&src("true"), true);
    assert_eq!(yes.tick(), TaskStatus::Success);
    assert_eq!(yes.blackboard().get("answer"), Some(Variant::from("yes")));
    assert_eq!(yes.root().child(1).unwrap().child(0).unwrap().name(), "IsTrue");

    let mut no = instance(&src("false"), true);
    assert_eq!(no.tick(), TaskStatus::Success);
    assert_eq!(no.blackboard().get("answer"), Some(Variant::from("no")));
}

#[test]
fn test_logical_operators() {
    let mut or = instance(
        r#"
tree main = Sequence {
    var a = false
    var b = true
    a || b
    Counter
}
"#,
        true,
    );
    assert_eq!(or.tick(), TaskStatus::Success);
    assert_eq!(or.blackboard().get("count"), Some(Variant::Int(1)));

    let mut and = instance(
        r#"
tree main = Sequence {
    var a = false
    var b = true
    !a && b && !b
    Counter
}
"#,
        true,
    );
    assert_eq!(and.tick(), TaskStatus::Failure);
    assert_eq!(and.blackboard().get("count"), None);
}

#[test]
fn test_custom_task() {
    let mut instance = instance(
        r#"
tree main = Sequence {
    Greet(name <- "world", greeting -> out)
    Greet(name <- out, greeting -> twice)
}
"#,
        true,
    );

    assert_eq!(instance.tick(), TaskStatus::Success);
    assert_eq!(
        instance.blackboard().get("twice"),
        Some(Variant::from("hello, hello, world"))
    );
}
