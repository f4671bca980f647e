use super::*;
use std::collections::HashMap;

#[test]
fn test_literal_ignores_blackboard() {
    let bb = Blackboard::new();
    bb.set_var("speed", 9.0);
    let speed = BBFloat::literal(1.5);
    assert_eq!(speed.resolve(&(), &bb, 0.), 1.5);
}

#[test]
fn test_variable_reads_live() {
    let bb = Blackboard::new();
    let speed = BBFloat::variable("speed");
    assert_eq!(speed.resolve(&(), &bb, -1.), -1.);

    bb.set_var("speed", 2.0);
    assert_eq!(speed.resolve(&(), &bb, -1.), 2.0);

    // No caching: a changed value is observed on the next call
    bb.set_var("speed", 3.0);
    assert_eq!(speed.resolve(&(), &bb, -1.), 3.0);
}

#[test]
fn test_variable_coercion() {
    let bb = Blackboard::new();
    bb.set_var("count", 4);
    bb.set_var("name", "four");
    assert_eq!(BBFloat::variable("count").resolve(&(), &bb, 0.), 4.);
    assert_eq!(BBInt::variable("name").resolve(&(), &bb, -1), -1);
    assert_eq!(
        BBString::variable("count").resolve(&(), &bb, String::new()),
        "4"
    );
}

#[test]
fn test_resolution_never_writes() {
    let bb = Blackboard::new();
    let param = BBBool::variable("alert");
    assert!(!param.resolve(&(), &bb, false));
    assert!(!bb.has_var("alert"));
}

#[test]
fn test_set_literal_coerces_once() {
    let mut param = BBParam::new(VariantType::Int);
    param.set_literal("12").unwrap();
    assert_eq!(param.saved_value(), &Variant::Int(12));
    assert_eq!(
        param.set_literal("twelve"),
        Err(ParamError::Coercion {
            expected: VariantType::Int,
            found: VariantType::String,
        })
    );
    // A rejected literal keeps the previous configuration
    assert_eq!(param.saved_value(), &Variant::Int(12));
}

#[test]
fn test_bind_switches_mode() {
    let mut param = BBParam::new(VariantType::Bool);
    assert_eq!(param.value_source(), ValueSource::Literal);
    param
        .bind(ParamBinding::Variable("flag".into()))
        .unwrap();
    assert_eq!(param.value_source(), ValueSource::BlackboardVar);
    assert_eq!(param.variable_key(), Some(Symbol::from("flag")));
}

#[test]
fn test_plane_param() {
    let bb = Blackboard::new();
    let plane = Plane::new(Vector3::new(0., 1., 0.), 2.);
    bb.set_var("ground", "0, 1, 0, 2");
    assert_eq!(
        BBPlane::variable("ground").resolve(&(), &bb, Plane::default()),
        plane
    );
    assert_eq!(
        BBPlane::variable("missing").resolve(&(), &bb, plane),
        plane
    );
}

#[test]
fn test_node_param() {
    let scene: HashMap<NodePath, NodeRef> = [
        (NodePath::from("Enemy"), NodeRef(10)),
        (NodePath::from("../Ally"), NodeRef(11)),
    ]
    .into_iter()
    .collect();
    let bb = Blackboard::new();

    assert_eq!(
        BBNode::literal("Enemy").resolve(&scene, &bb),
        Some(NodeRef(10))
    );

    let target = BBNode::variable("target");
    assert_eq!(target.resolve(&scene, &bb), None);
    bb.set_var("target", NodePath::from("../Ally"));
    assert_eq!(target.resolve(&scene, &bb), Some(NodeRef(11)));

    // Prefetched values pass through untouched
    bb.prefetch_node_references(&scene);
    assert_eq!(bb.get("target"), Some(Variant::Node(NodeRef(11))));
    assert_eq!(target.resolve(&scene, &bb), Some(NodeRef(11)));

    bb.set_var("target", 3.5);
    assert_eq!(
        target.get_value(&scene, &bb, Variant::Nil),
        Variant::Nil
    );
}
