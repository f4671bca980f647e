use crate::{ParamBinding, Symbol, VariantType};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PortType {
    Input,
    Output,
    InOut,
}

/// A configurable field of a task, as seen by loaders.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PortSpec {
    pub ty: PortType,
    pub key: Symbol,
    /// The type an input port resolves to; `None` for untyped ports.
    pub value_type: Option<VariantType>,
}

impl PortSpec {
    pub fn new_in(key: impl Into<Symbol>, value_type: VariantType) -> Self {
        Self {
            ty: PortType::Input,
            key: key.into(),
            value_type: Some(value_type),
        }
    }

    pub fn new_out(key: impl Into<Symbol>) -> Self {
        Self {
            ty: PortType::Output,
            key: key.into(),
            value_type: None,
        }
    }

    pub fn new_inout(key: impl Into<Symbol>) -> Self {
        Self {
            ty: PortType::InOut,
            key: key.into(),
            value_type: None,
        }
    }
}

/// A port assignment coming from a template source.
#[derive(Debug, Clone, PartialEq)]
pub enum PortBinding {
    /// `port <- var` or `port <- "literal"`
    Input(ParamBinding),
    /// `port -> var`
    Output(Symbol),
    /// `port <-> var`
    InOut(Symbol),
}

impl PortBinding {
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Input(_) => PortType::Input,
            Self::Output(_) => PortType::Output,
            Self::InOut(_) => PortType::InOut,
        }
    }
}
