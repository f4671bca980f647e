//! Task parameters that are either a literal or a blackboard variable.

use tracing::{debug, warn};

use crate::{
    error::ParamError, Blackboard, NodePath, NodeRef, NodeResolver, Plane, Symbol, Variant,
    VariantType, Vector3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Literal,
    BlackboardVar,
}

/// What a loader hands to a parameter: a literal to store or a variable to
/// read on every tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamBinding {
    Literal(Variant),
    Variable(Symbol),
}

/// A dynamically bound value with a fixed expected type.
///
/// Resolution only reads the blackboard and keeps no cache, so a changed
/// variable is observed on the very next call.
#[derive(Debug, Clone, PartialEq)]
pub struct BBParam {
    value_source: ValueSource,
    saved_value: Variant,
    variable: Option<Symbol>,
    expected_type: VariantType,
}

fn zero_value(ty: VariantType) -> Variant {
    match ty {
        VariantType::Nil | VariantType::Node => Variant::Nil,
        VariantType::Bool => Variant::Bool(false),
        VariantType::Int => Variant::Int(0),
        VariantType::Float => Variant::Float(0.),
        VariantType::String => Variant::String(String::new()),
        VariantType::Vector3 => Variant::Vector3(Vector3::default()),
        VariantType::Plane => Variant::Plane(Plane::default()),
        VariantType::NodePath => Variant::NodePath(NodePath::default()),
    }
}

impl BBParam {
    /// A literal holding the zero value of `expected_type`.
    pub fn new(expected_type: VariantType) -> Self {
        Self {
            value_source: ValueSource::Literal,
            saved_value: zero_value(expected_type),
            variable: None,
            expected_type,
        }
    }

    pub fn literal(expected_type: VariantType, value: impl Into<Variant>) -> Result<Self, ParamError> {
        let mut ret = Self::new(expected_type);
        ret.set_literal(value)?;
        Ok(ret)
    }

    pub fn variable(expected_type: VariantType, key: impl Into<Symbol>) -> Self {
        let mut ret = Self::new(expected_type);
        ret.set_variable(key);
        ret
    }

    pub fn value_source(&self) -> ValueSource {
        self.value_source
    }

    pub fn saved_value(&self) -> &Variant {
        &self.saved_value
    }

    pub fn variable_key(&self) -> Option<Symbol> {
        self.variable
    }

    pub fn expected_type(&self) -> VariantType {
        self.expected_type
    }

    /// Switches to literal mode. The value is coerced once, here.
    pub fn set_literal(&mut self, value: impl Into<Variant>) -> Result<(), ParamError> {
        let value = value.into();
        let coerced = value
            .coerce(self.expected_type)
            .ok_or(ParamError::Coercion {
                expected: self.expected_type,
                found: value.get_type(),
            })?;
        self.saved_value = coerced;
        self.value_source = ValueSource::Literal;
        Ok(())
    }

    pub fn set_variable(&mut self, key: impl Into<Symbol>) {
        self.variable = Some(key.into());
        self.value_source = ValueSource::BlackboardVar;
    }

    pub fn bind(&mut self, binding: ParamBinding) -> Result<(), ParamError> {
        match binding {
            ParamBinding::Literal(value) => self.set_literal(value),
            ParamBinding::Variable(key) => {
                self.set_variable(key);
                Ok(())
            }
        }
    }

    /// The raw value before coercion: the literal, or whatever the
    /// blackboard holds under the variable.
    fn raw_value(&self, blackboard: &Blackboard) -> Option<Variant> {
        match self.value_source {
            ValueSource::Literal => Some(self.saved_value.clone()),
            ValueSource::BlackboardVar => self.variable.and_then(|key| blackboard.get(key)),
        }
    }

    pub fn get_value(
        &self,
        _agent: &dyn NodeResolver,
        blackboard: &Blackboard,
        default: Variant,
    ) -> Variant {
        if let ValueSource::Literal = self.value_source {
            return self.saved_value.clone();
        }
        let Some(raw) = self.raw_value(blackboard) else {
            debug!("blackboard variable {:?} is not set, using default", self.variable);
            return default;
        };
        raw.coerce(self.expected_type).unwrap_or_else(|| {
            debug!(
                "blackboard variable {:?} holds {}, expected {}; using default",
                self.variable,
                raw.get_type(),
                self.expected_type
            );
            default
        })
    }
}

macro_rules! typed_param {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $rust:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(BBParam);

        impl $name {
            pub fn literal(value: $rust) -> Self {
                Self(BBParam {
                    value_source: ValueSource::Literal,
                    saved_value: Variant::$variant(value),
                    variable: None,
                    expected_type: VariantType::$variant,
                })
            }

            pub fn variable(key: impl Into<Symbol>) -> Self {
                Self(BBParam::variable(VariantType::$variant, key))
            }

            pub fn param(&self) -> &BBParam {
                &self.0
            }

            pub fn param_mut(&mut self) -> &mut BBParam {
                &mut self.0
            }

            pub fn resolve(
                &self,
                agent: &dyn NodeResolver,
                blackboard: &Blackboard,
                default: $rust,
            ) -> $rust {
                match self.0.get_value(agent, blackboard, Variant::Nil) {
                    Variant::$variant(value) => value,
                    _ => default,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(BBParam::new(VariantType::$variant))
            }
        }
    };
}

typed_param!(BBBool, Bool, bool);
typed_param!(BBInt, Int, i64);
typed_param!(BBFloat, Float, f64);
typed_param!(BBString, String, String);
typed_param!(BBVector3, Vector3, Vector3);
typed_param!(
    /// A geometric plane parameter, e.g. a patrol boundary.
    BBPlane,
    Plane,
    Plane
);

/// A node reference parameter.
///
/// The stored value is a [`NodePath`] relative to the agent, or, when read
/// from a prefetched blackboard, an already live [`NodeRef`].
#[derive(Debug, Clone, PartialEq)]
pub struct BBNode(BBParam);

impl BBNode {
    pub fn literal(path: impl Into<NodePath>) -> Self {
        Self(BBParam {
            value_source: ValueSource::Literal,
            saved_value: Variant::NodePath(path.into()),
            variable: None,
            expected_type: VariantType::NodePath,
        })
    }

    pub fn variable(key: impl Into<Symbol>) -> Self {
        Self(BBParam::variable(VariantType::NodePath, key))
    }

    pub fn param(&self) -> &BBParam {
        &self.0
    }

    pub fn param_mut(&mut self) -> &mut BBParam {
        &mut self.0
    }

    pub fn resolve(&self, agent: &dyn NodeResolver, blackboard: &Blackboard) -> Option<NodeRef> {
        let raw = self.0.raw_value(blackboard)?;
        match raw {
            Variant::Node(node) => Some(node),
            Variant::NodePath(ref path) if path.is_empty() => None,
            Variant::NodePath(ref path) => {
                let node = agent.resolve_node(path);
                if node.is_none() {
                    warn!("node not found: {}", path);
                }
                node
            }
            Variant::String(ref path) => agent.resolve_node(&NodePath::new(path.as_str())),
            other => {
                warn!("expected a node path, got {}", other.get_type());
                None
            }
        }
    }

    pub fn get_value(
        &self,
        agent: &dyn NodeResolver,
        blackboard: &Blackboard,
        default: Variant,
    ) -> Variant {
        self.resolve(agent, blackboard)
            .map(Variant::Node)
            .unwrap_or(default)
    }
}

impl Default for BBNode {
    fn default() -> Self {
        Self(BBParam::new(VariantType::NodePath))
    }
}

#[cfg(test)]
mod test;
