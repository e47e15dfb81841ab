//! Type AST nodes

use serde::{Deserialize, Serialize};

/// Type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// String
    Str,
    /// Unit type ()
    Unit,
    /// Class (or object) type
    Class(String),
    /// Type of a `when` without arms; assignable to every type.
    /// Never written in source.
    Never,
}

impl Type {
    /// Resolve a type name written in source
    pub fn from_name(name: &str) -> Self {
        match name {
            "Int" => Type::Int,
            "Bool" => Type::Bool,
            "String" => Type::Str,
            "Unit" => Type::Unit,
            other => Type::Class(other.to_string()),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Bool | Type::Str | Type::Unit)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Bool => write!(f, "Bool"),
            Type::Str => write!(f, "String"),
            Type::Unit => write!(f, "Unit"),
            Type::Class(name) => write!(f, "{name}"),
            Type::Never => write!(f, "!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_primitives() {
        assert_eq!(Type::from_name("Int"), Type::Int);
        assert_eq!(Type::from_name("Bool"), Type::Bool);
        assert_eq!(Type::from_name("String"), Type::Str);
        assert_eq!(Type::from_name("Unit"), Type::Unit);
    }

    #[test]
    fn test_from_name_class() {
        let ty = Type::from_name("Mammal");
        assert_eq!(ty.class_name(), Some("Mammal"));
        assert!(!ty.is_primitive());
    }

    #[test]
    fn test_never_is_not_a_source_name() {
        assert_eq!(Type::from_name("Never"), Type::Class("Never".to_string()));
        assert!(!Type::Never.is_primitive());
        assert_eq!(Type::Never.to_string(), "!");
    }

    #[test]
    fn test_display_round_trips_source_names() {
        for name in ["Int", "Bool", "String", "Unit", "Cat"] {
            assert_eq!(Type::from_name(name).to_string(), name);
        }
    }
}
