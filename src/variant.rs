//! Dynamically typed blackboard values.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

/// A plane in Hessian normal form: points `p` with `normal · p == d`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vector3,
    pub d: f64,
}

impl Plane {
    pub const fn new(normal: Vector3, d: f64) -> Self {
        Self { normal, d }
    }

    pub fn distance_to(&self, point: &Vector3) -> f64 {
        self.normal.dot(point) - self.d
    }

    pub fn is_point_over(&self, point: &Vector3) -> bool {
        self.distance_to(point) > 0.
    }
}

/// A deferred reference to a node, resolved through a
/// [`NodeResolver`](crate::NodeResolver).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live handle to a node owned by the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantType {
    Nil,
    Bool,
    Int,
    Float,
    String,
    Vector3,
    Plane,
    NodePath,
    Node,
}

impl Display for VariantType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            Self::Nil => "Nil",
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Vector3 => "Vector3",
            Self::Plane => "Plane",
            Self::NodePath => "NodePath",
            Self::Node => "Node",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Variant {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector3(Vector3),
    Plane(Plane),
    NodePath(NodePath),
    Node(NodeRef),
}

impl Variant {
    pub fn get_type(&self) -> VariantType {
        match self {
            Self::Nil => VariantType::Nil,
            Self::Bool(_) => VariantType::Bool,
            Self::Int(_) => VariantType::Int,
            Self::Float(_) => VariantType::Float,
            Self::String(_) => VariantType::String,
            Self::Vector3(_) => VariantType::Vector3,
            Self::Plane(_) => VariantType::Plane,
            Self::NodePath(_) => VariantType::NodePath,
            Self::Node(_) => VariantType::Node,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Converts the value to `ty`, or returns `None` if there is no
    /// sensible conversion.
    pub fn coerce(&self, ty: VariantType) -> Option<Variant> {
        if self.get_type() == ty {
            return Some(self.clone());
        }
        Some(match (self, ty) {
            (Self::Int(i), VariantType::Float) => Self::Float(*i as f64),
            (Self::Float(f), VariantType::Int) => Self::Int(f.trunc() as i64),
            (Self::Bool(b), VariantType::Int) => Self::Int(*b as i64),
            (Self::Int(i), VariantType::Bool) => Self::Bool(*i != 0),
            (Self::String(s), VariantType::Bool) => Self::Bool(s.trim().parse().ok()?),
            (Self::String(s), VariantType::Int) => Self::Int(s.trim().parse().ok()?),
            (Self::String(s), VariantType::Float) => Self::Float(s.trim().parse().ok()?),
            (Self::String(s), VariantType::Vector3) => {
                let [x, y, z] = parse_floats(s)?;
                Self::Vector3(Vector3::new(x, y, z))
            }
            (Self::String(s), VariantType::Plane) => {
                let [x, y, z, d] = parse_floats(s)?;
                Self::Plane(Plane::new(Vector3::new(x, y, z), d))
            }
            (Self::String(s), VariantType::NodePath) => Self::NodePath(NodePath::new(s.clone())),
            (Self::NodePath(p), VariantType::String) => Self::String(p.to_string()),
            (Self::Bool(_) | Self::Int(_) | Self::Float(_), VariantType::String) => {
                Self::String(self.to_string())
            }
            _ => return None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.coerce(VariantType::Bool)? {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.coerce(VariantType::Int)? {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.coerce(VariantType::Float)? {
            Self::Float(f) => Some(f),
            _ => None,
        }
    }
}

/// Parses `"a, b, c"` or `"(a, b, c)"` into exactly `N` floats.
fn parse_floats<const N: usize>(s: &str) -> Option<[f64; N]> {
    let s = s.trim();
    let s = s
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(s);
    let mut ret = [0.; N];
    let mut parts = s.split(',');
    for slot in ret.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(ret)
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
            Self::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Self::Plane(p) => write!(
                f,
                "({}, {}, {}, {})",
                p.normal.x, p.normal.y, p.normal.z, p.d
            ),
            Self::NodePath(p) => write!(f, "{}", p),
            Self::Node(n) => write!(f, "<node#{}>", n.0),
        }
    }
}

macro_rules! impl_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Variant {
            fn from(v: $ty) -> Self {
                Self::$variant(v.into())
            }
        }
    };
}

impl_from!(bool, Bool);
impl_from!(i64, Int);
impl_from!(i32, Int);
impl_from!(f64, Float);
impl_from!(String, String);
impl_from!(&str, String);
impl_from!(Vector3, Vector3);
impl_from!(Plane, Plane);
impl_from!(NodePath, NodePath);
impl_from!(NodeRef, Node);
