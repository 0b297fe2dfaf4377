use crate::frontend::ast::{TypeSpec, TypeSpecKind};

/// A semantic type, separated from the [`TypeSpec`] syntax that spelled it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Short,
    Int,
    Bool,
    Void,
    /// The type of a string literal. No variable can hold one; it only flows
    /// into `output`.
    Str,
    Pointer(Box<Type>),
}

impl Type {
    pub fn from_spec(spec: &TypeSpec) -> Self {
        match &spec.kind {
            TypeSpecKind::Int => Self::Int,
            TypeSpecKind::Short => Self::Short,
            TypeSpecKind::Bool => Self::Bool,
            TypeSpecKind::Void => Self::Void,
            TypeSpecKind::Pointer(inner) => Self::Pointer(Box::new(Self::from_spec(inner))),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Short | Self::Int)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_))
    }

    /// Whether a variable or formal may be declared with this type. `void`
    /// and `void ptr` hold no values, so they are rejected at declaration
    /// sites.
    pub fn is_valid_variable_type(&self) -> bool {
        match self {
            Self::Void | Self::Str => false,
            Self::Pointer(inner) => !inner.is_void(),
            _ => true,
        }
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Short => f.write_str("short"),
            Self::Int => f.write_str("int"),
            Self::Bool => f.write_str("bool"),
            Self::Void => f.write_str("void"),
            Self::Str => f.write_str("str"),
            Self::Pointer(inner) => f.write_fmt(format_args!("{inner} ptr")),
        }
    }
}

/// The type of a function: what it takes and what it returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub formals: Vec<Type>,
    pub return_type: Type,
}

impl core::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, formal) in self.formals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }

            core::fmt::Display::fmt(formal, f)?;
        }

        f.write_fmt(format_args!(" -> {}", self.return_type))
    }
}
