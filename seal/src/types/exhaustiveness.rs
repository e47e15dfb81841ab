//! Exhaustiveness checking for `when`
//!
//! Coverage is computed over constructors:
//! - `is C` covers `C` and every subclass of `C`
//! - a sealed class is also covered once each member of its variant set is
//!   covered, recursively
//! - open and abstract classes may gain subclasses in any module, so only
//!   `is C` (or `else`) covers them
//! - `Bool` has two values; `Int`, `String` and `Unit` need `else`
//!
//! The check is a pure function of the class table and the arms.

use super::hierarchy::ClassTable;
use crate::ast::{ClassKind, LiteralPattern, Pattern, Type, WhenArm};

/// Head of a `when` pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constructor {
    /// `else` - matches anything
    Wildcard,
    /// `is C`
    Class(String),
    BoolLit(bool),
    IntLit(i64),
    StringLit(String),
}

impl Constructor {
    pub fn from_pattern(pattern: &Pattern) -> Self {
        match pattern {
            Pattern::Else => Constructor::Wildcard,
            Pattern::Is(class) => Constructor::Class(class.clone()),
            Pattern::Literal(LiteralPattern::Bool(b)) => Constructor::BoolLit(*b),
            Pattern::Literal(LiteralPattern::Int(n)) => Constructor::IntLit(*n),
            Pattern::Literal(LiteralPattern::String(s)) => Constructor::StringLit(s.clone()),
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, Constructor::Wildcard)
    }
}

/// Result of exhaustiveness check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExhaustivenessResult {
    /// Whether the arms cover every value of the scrutinee type
    pub is_exhaustive: bool,
    /// Indices of arms whose patterns are all covered by earlier arms
    pub unreachable_arms: Vec<usize>,
    /// Uncovered patterns, e.g. `is Cat`
    pub missing_patterns: Vec<String>,
    /// Classes left uncovered because they are not sealed
    pub unsealed: Vec<String>,
    /// Index of an `else` arm that follows arms which are already exhaustive
    pub redundant_else: Option<usize>,
}

#[derive(Debug, Default)]
struct Missing {
    patterns: Vec<String>,
    unsealed: Vec<String>,
}

impl Missing {
    fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Check the arms of a `when` over a value of type `match_type`
pub fn check_exhaustiveness(match_type: &Type, arms: &[WhenArm], table: &ClassTable) -> ExhaustivenessResult {
    let mut matrix: Vec<Constructor> = Vec::new();
    let mut result = ExhaustivenessResult::default();

    for (i, arm) in arms.iter().enumerate() {
        let row: Vec<Constructor> = arm
            .patterns
            .iter()
            .map(|p| Constructor::from_pattern(&p.node))
            .collect();

        let useful = row.iter().any(|ctor| is_useful(&matrix, ctor, match_type, table));
        if !useful {
            let else_seen = matrix.iter().any(Constructor::is_wildcard);
            if arm.is_else() && !else_seen && result.redundant_else.is_none() {
                result.redundant_else = Some(i);
            } else {
                result.unreachable_arms.push(i);
            }
        }
        matrix.extend(row);
    }

    let missing = find_missing(&matrix, match_type, table);
    result.is_exhaustive = missing.is_empty();
    result.missing_patterns = missing.patterns;
    result.unsealed = missing.unsealed;
    result
}

/// Does `ctor` match a value that no row of `matrix` matches?
fn is_useful(matrix: &[Constructor], ctor: &Constructor, ty: &Type, table: &ClassTable) -> bool {
    if matrix.iter().any(Constructor::is_wildcard) {
        return false;
    }
    match ctor {
        Constructor::Wildcard => !find_missing(matrix, ty, table).is_empty(),
        Constructor::Class(class) => {
            // `is Mammal` on a `Cat` scrutinee only ever sees cats
            let target = match ty {
                Type::Class(scrutinee) if table.is_subclass(scrutinee, class) => scrutinee,
                _ => class,
            };
            let mut missing = Missing::default();
            collect_missing_class(matrix, target, table, &mut missing);
            !missing.is_empty()
        }
        literal => !matrix.contains(literal),
    }
}

fn find_missing(matrix: &[Constructor], ty: &Type, table: &ClassTable) -> Missing {
    let mut missing = Missing::default();
    if matrix.iter().any(Constructor::is_wildcard) {
        return missing;
    }
    match ty {
        Type::Class(class) => collect_missing_class(matrix, class, table, &mut missing),
        Type::Bool => {
            for value in [true, false] {
                if !matrix.contains(&Constructor::BoolLit(value)) {
                    missing.patterns.push(value.to_string());
                }
            }
        }
        Type::Int | Type::Str | Type::Unit => missing.patterns.push("else".to_string()),
        Type::Never => {}
    }
    missing
}

fn collect_missing_class(matrix: &[Constructor], class: &str, table: &ClassTable, missing: &mut Missing) {
    let covered = matrix.iter().any(|ctor| match ctor {
        Constructor::Wildcard => true,
        Constructor::Class(pattern) => table.is_subclass(class, pattern),
        _ => false,
    });
    if covered {
        return;
    }

    match table.get(class) {
        Some(info) if info.is_sealed() => {
            for variant in &info.children {
                collect_missing_class(matrix, variant, table, missing);
            }
        }
        Some(info) => {
            missing.patterns.push(format!("is {class}"));
            if matches!(info.kind, ClassKind::Open | ClassKind::Abstract) && !missing.unsealed.iter().any(|c| c == class)
            {
                missing.unsealed.push(class.to_string());
            }
        }
        None => missing.patterns.push(format!("is {class}")),
    }
}

/// Format a list of missing patterns for display
pub fn format_missing_patterns(patterns: &[String]) -> String {
    patterns.iter().map(|p| format!("`{p}`")).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Item, Program};
    use crate::lexer::tokenize;
    use crate::parser::parse;

    const MAMMALS: &str = "
        sealed class Mammal(name: String)
        class Cat(name: String) : Mammal(name)
        class Human(name: String, job: String) : Mammal(name)
    ";

    fn parse_program(source: &str) -> Program {
        let tokens = tokenize(source).unwrap();
        parse(tokens).unwrap()
    }

    /// Check the `when` that forms the body of the last function in `source`
    fn check(source: &str) -> ExhaustivenessResult {
        let program = parse_program(source);
        let table = ClassTable::build(&program).unwrap();
        let Some(Item::FnDef(f)) = program.items.last() else {
            panic!("Expected a trailing function");
        };
        let Expr::When { arms, .. } = &f.body.node else {
            panic!("Expected when");
        };
        let ty = f.params[0].ty.node.clone();
        check_exhaustiveness(&ty, arms, &table)
    }

    fn with_mammals(when_fn: &str) -> ExhaustivenessResult {
        check(&format!("{MAMMALS}\n{when_fn}"))
    }

    #[test]
    fn test_all_variants_covered() {
        let result = with_mammals("fn f(m: Mammal) -> Int = when m { is Human => 1, is Cat => 2 };");
        assert!(result.is_exhaustive);
        assert!(result.missing_patterns.is_empty());
        assert!(result.unreachable_arms.is_empty());
    }

    #[test]
    fn test_missing_variant() {
        let result = with_mammals("fn f(m: Mammal) -> Int = when m { is Human => 1 };");
        assert!(!result.is_exhaustive);
        assert_eq!(result.missing_patterns, vec!["is Cat"]);
        assert!(result.unsealed.is_empty());
    }

    #[test]
    fn test_alternatives_cover_variants() {
        let result = with_mammals("fn f(m: Mammal) -> Int = when m { is Human | is Cat => 1 };");
        assert!(result.is_exhaustive);
    }

    #[test]
    fn test_supertype_pattern_covers_everything() {
        let result = with_mammals("fn f(m: Mammal) -> Int = when m { is Mammal => 1 };");
        assert!(result.is_exhaustive);
    }

    #[test]
    fn test_open_class_needs_else() {
        let result = check(
            "open class Mammal
             class Cat : Mammal
             class Human : Mammal
             fn f(m: Mammal) -> Int = when m { is Human => 1, is Cat => 2 };",
        );
        assert!(!result.is_exhaustive);
        assert_eq!(result.missing_patterns, vec!["is Mammal"]);
        assert_eq!(result.unsealed, vec!["Mammal"]);
    }

    #[test]
    fn test_abstract_class_needs_else() {
        let result = check(
            "abstract class Mammal
             class Cat : Mammal
             fn f(m: Mammal) -> Int = when m { is Cat => 2 };",
        );
        assert_eq!(result.unsealed, vec!["Mammal"]);
    }

    #[test]
    fn test_else_makes_open_class_exhaustive() {
        let result = check(
            "open class Mammal
             class Cat : Mammal
             fn f(m: Mammal) -> Int = when m { is Cat => 2, else => 0 };",
        );
        assert!(result.is_exhaustive);
        assert!(result.redundant_else.is_none());
    }

    #[test]
    fn test_new_variant_breaks_exhaustive_when() {
        let when_fn = "fn f(m: Mammal) -> Int = when m { is Human => 1, is Cat => 2 };";
        assert!(with_mammals(when_fn).is_exhaustive);

        let with_dog = format!("{MAMMALS}\nclass Dog(name: String) : Mammal(name)\n{when_fn}");
        let result = check(&with_dog);
        assert!(!result.is_exhaustive);
        assert_eq!(result.missing_patterns, vec!["is Dog"]);
    }

    #[test]
    fn test_nested_sealed_covered_by_its_variants() {
        let source = "
            sealed class Shape
            sealed class Round : Shape
            class Circle : Round
            class Oval : Round
            class Square : Shape
            fn f(s: Shape) -> Int = when s { is Circle => 1, is Oval => 2, is Square => 3 };";
        assert!(check(source).is_exhaustive);

        let partial = source.replace("is Oval => 2, ", "");
        assert_eq!(check(&partial).missing_patterns, vec!["is Oval"]);
    }

    #[test]
    fn test_open_variant_of_sealed_class() {
        let result = check(
            "sealed class Mammal
             open class Pet : Mammal
             class Dog : Pet
             object Wild : Mammal
             fn f(m: Mammal) -> Int = when m { is Dog => 1, is Wild => 2 };",
        );
        assert_eq!(result.missing_patterns, vec!["is Pet"]);
        assert_eq!(result.unsealed, vec!["Pet"]);
    }

    #[test]
    fn test_objects_are_variants() {
        let result = check(
            "sealed class Light
             object Red : Light
             object Green : Light
             fn f(l: Light) -> Int = when l { is Red => 1 };",
        );
        assert_eq!(result.missing_patterns, vec!["is Green"]);
    }

    #[test]
    fn test_empty_sealed_is_vacuously_exhaustive() {
        let result = check("sealed class Never fn f(n: Never) -> Int = when n { };");
        assert!(result.is_exhaustive);
    }

    #[test]
    fn test_unreachable_arm() {
        let result = with_mammals("fn f(m: Mammal) -> Int = when m { is Cat => 1, is Human => 2, is Cat => 3 };");
        assert!(result.is_exhaustive);
        assert_eq!(result.unreachable_arms, vec![2]);
    }

    #[test]
    fn test_supertype_arm_after_scrutinee_type_is_unreachable() {
        let result = with_mammals("fn f(c: Cat) -> Int = when c { is Cat => 1, is Mammal => 2 };");
        assert_eq!(result.unreachable_arms, vec![1]);
    }

    #[test]
    fn test_redundant_else() {
        let result = with_mammals("fn f(m: Mammal) -> Int = when m { is Cat => 1, is Human => 2, else => 3 };");
        assert!(result.is_exhaustive);
        assert_eq!(result.redundant_else, Some(2));
        assert!(result.unreachable_arms.is_empty());
    }

    #[test]
    fn test_arms_after_else_are_unreachable() {
        let result = with_mammals("fn f(m: Mammal) -> Int = when m { else => 0, is Cat => 1 };");
        assert_eq!(result.unreachable_arms, vec![1]);
        assert!(result.redundant_else.is_none());
    }

    #[test]
    fn test_bool_literals() {
        let result = check("fn f(b: Bool) -> Int = when b { true => 1 };");
        assert_eq!(result.missing_patterns, vec!["false"]);
        assert!(check("fn f(b: Bool) -> Int = when b { true => 1, false => 0 };").is_exhaustive);
    }

    #[test]
    fn test_int_needs_else() {
        let result = check("fn f(n: Int) -> Int = when n { 0 => 1, 1 => 2, 1 => 3 };");
        assert_eq!(result.missing_patterns, vec!["else"]);
        assert_eq!(result.unreachable_arms, vec![2]);
        assert!(check("fn f(n: Int) -> Int = when n { 0 => 1, else => 2 };").is_exhaustive);
    }

    #[test]
    fn test_check_is_idempotent() {
        let source = format!("{MAMMALS}\nfn f(m: Mammal) -> Int = when m {{ is Human => 1 }};");
        assert_eq!(check(&source), check(&source));
    }

    #[test]
    fn test_format_missing_patterns() {
        let patterns = vec!["is Cat".to_string(), "is Dog".to_string()];
        assert_eq!(format_missing_patterns(&patterns), "`is Cat`, `is Dog`");
    }
}
