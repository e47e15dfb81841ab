//! Expression evaluator

use super::env::{child_env, EnvRef, Environment};
use super::error::{InterpResult, RuntimeError};
use super::value::{Instance, Value};
use crate::ast::{BinOp, ClassDef, ClassKind, Expr, FnDef, Item, LiteralPattern, Pattern, Program, Spanned, UnOp};
use std::collections::HashMap;
use std::rc::Rc;

/// Maximum call depth before reporting a stack overflow
const MAX_RECURSION_DEPTH: usize = 10_000;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Tree-walking interpreter
pub struct Interpreter {
    /// Global environment (empty; functions and classes live in their own tables)
    global_env: EnvRef,
    /// User-defined functions
    functions: HashMap<String, Rc<FnDef>>,
    /// Class and object declarations
    classes: HashMap<String, Rc<ClassDef>>,
    /// Object singletons, created on first use
    objects: HashMap<String, Value>,
    /// Current recursion depth
    recursion_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create a new interpreter
    pub fn new() -> Self {
        Interpreter {
            global_env: Environment::new().into_ref(),
            functions: HashMap::new(),
            classes: HashMap::new(),
            objects: HashMap::new(),
            recursion_depth: 0,
        }
    }

    /// Load every function and class of a program, including nested modules
    pub fn load(&mut self, program: &Program) {
        self.load_items(&program.items);
        tracing::debug!(
            functions = self.functions.len(),
            classes = self.classes.len(),
            "interpreter loaded program"
        );
    }

    fn load_items(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::Module(module) => self.load_items(&module.items),
                Item::ClassDef(class) => {
                    self.classes.insert(class.name.node.clone(), Rc::new(class.clone()));
                }
                Item::FnDef(f) => {
                    self.functions.insert(f.name.node.clone(), Rc::new(f.clone()));
                }
            }
        }
    }

    /// Run the entry function with no arguments
    pub fn run(&mut self, entry: &str) -> InterpResult<Value> {
        tracing::debug!(entry, "running entry function");
        self.call_function_with_args(entry, Vec::new())
    }

    /// Call a function by name
    pub fn call_function_with_args(&mut self, name: &str, args: Vec<Value>) -> InterpResult<Value> {
        let func = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::undefined_function(name))?;
        self.call_function(&func, args)
    }

    fn call_function(&mut self, func: &FnDef, args: Vec<Value>) -> InterpResult<Value> {
        if func.params.len() != args.len() {
            return Err(RuntimeError::arity_mismatch(&func.name.node, func.params.len(), args.len()));
        }
        let env = child_env(&self.global_env);
        for (param, value) in func.params.iter().zip(args) {
            env.borrow_mut().define(param.name.node.clone(), value);
        }
        self.enter()?;
        let result = self.eval(&func.body, &env);
        self.recursion_depth -= 1;
        result
    }

    fn enter(&mut self) -> InterpResult<()> {
        if self.recursion_depth >= MAX_RECURSION_DEPTH {
            return Err(RuntimeError::stack_overflow());
        }
        self.recursion_depth += 1;
        Ok(())
    }

    /// Evaluate an expression
    fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        match &expr.node {
            Expr::IntLit(n) => Ok(Value::Int(*n)),
            Expr::BoolLit(b) => Ok(Value::Bool(*b)),
            Expr::StringLit(s) => Ok(Value::string(s.as_str())),
            Expr::Unit => Ok(Value::Unit),

            Expr::Var(name) => {
                if let Some(value) = env.borrow().get(name) {
                    return Ok(value);
                }
                let is_object = self.classes.get(name).is_some_and(|c| c.kind == ClassKind::Object);
                if is_object {
                    self.object(name)
                } else {
                    Err(RuntimeError::undefined_variable(name))
                }
            }

            Expr::SelfRef => env
                .borrow()
                .get("self")
                .ok_or_else(|| RuntimeError::undefined_variable("self")),

            Expr::Binary { left, op, right } => match op {
                BinOp::And | BinOp::Or => {
                    let l = self.eval_bool(left, env)?;
                    // Short-circuit
                    if l == (*op == BinOp::Or) {
                        return Ok(Value::Bool(l));
                    }
                    Ok(Value::Bool(self.eval_bool(right, env)?))
                }
                _ => {
                    let l = self.eval(left, env)?;
                    let r = self.eval(right, env)?;
                    eval_binary(*op, l, r)
                }
            },

            Expr::Unary { op, expr: inner } => {
                let value = self.eval(inner, env)?;
                match (op, value) {
                    (UnOp::Neg, Value::Int(n)) => n
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| RuntimeError::integer_overflow("-")),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnOp::Neg, other) => Err(RuntimeError::type_error("Int", other.type_name())),
                    (UnOp::Not, other) => Err(RuntimeError::type_error("Bool", other.type_name())),
                }
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_bool(cond, env)? {
                    self.eval(then_branch, env)
                } else {
                    self.eval(else_branch, env)
                }
            }

            Expr::Let { name, value, body, .. } => {
                let value = self.eval(value, env)?;
                let scope = child_env(env);
                scope.borrow_mut().define(name.node.clone(), value);
                self.eval(body, &scope)
            }

            Expr::Call { func, args } => {
                let args = self.eval_args(args, env)?;
                if let Some(f) = self.functions.get(&func.node).cloned() {
                    return self.call_function(&f, args);
                }
                self.construct(&func.node, args)
            }

            Expr::FieldAccess { expr: object, field } => {
                let value = self.eval(object, env)?;
                let instance = value
                    .as_object()
                    .ok_or_else(|| RuntimeError::type_error("object", value.type_name()))?;
                instance
                    .field(&field.node)
                    .cloned()
                    .ok_or_else(|| RuntimeError::undefined_variable(&format!("{}.{}", instance.class, field.node)))
            }

            Expr::MethodCall { receiver, method, args } => {
                let receiver = self.eval(receiver, env)?;
                let args = self.eval_args(args, env)?;
                self.call_method(receiver, &method.node, args)
            }

            Expr::When { scrutinee, arms } => {
                let value = self.eval(scrutinee, env)?;
                for arm in arms {
                    if arm.patterns.iter().any(|p| self.matches(&p.node, &value)) {
                        return self.eval(&arm.body, env);
                    }
                }
                Err(RuntimeError::no_matching_arm(&value.to_string()))
            }
        }
    }

    fn eval_bool(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<bool> {
        let value = self.eval(expr, env)?;
        value
            .as_bool()
            .ok_or_else(|| RuntimeError::type_error("Bool", value.type_name()))
    }

    fn eval_args(&mut self, args: &[Spanned<Expr>], env: &EnvRef) -> InterpResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, env)).collect()
    }

    fn matches(&self, pattern: &Pattern, value: &Value) -> bool {
        match (pattern, value) {
            (Pattern::Else, _) => true,
            (Pattern::Is(class), Value::Object(instance)) => self.is_instance_of(&instance.class, class),
            (Pattern::Literal(LiteralPattern::Int(a)), Value::Int(b)) => a == b,
            (Pattern::Literal(LiteralPattern::Bool(a)), Value::Bool(b)) => a == b,
            (Pattern::Literal(LiteralPattern::String(a)), Value::Str(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }

    /// `class` is `target` or one of its subclasses
    fn is_instance_of(&self, class: &str, target: &str) -> bool {
        let mut current = Some(class);
        let mut steps = 0;
        while let Some(name) = current {
            if name == target {
                return true;
            }
            steps += 1;
            if steps > self.classes.len() {
                return false;
            }
            current = self
                .classes
                .get(name)
                .and_then(|c| c.parent.as_ref())
                .map(|p| p.name.node.as_str());
        }
        false
    }

    fn class_def(&self, name: &str) -> InterpResult<Rc<ClassDef>> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::undefined_function(name))
    }

    /// Constructor call `Cat("Lucy")`
    fn construct(&mut self, name: &str, args: Vec<Value>) -> InterpResult<Value> {
        let class = self.class_def(name)?;
        match class.kind {
            ClassKind::Object if args.is_empty() => return self.object(name),
            ClassKind::Object => return Err(RuntimeError::arity_mismatch(name, 0, args.len())),
            kind if kind.is_abstract() => return Err(RuntimeError::not_instantiable(name)),
            _ => {}
        }
        let fields = self.init_fields(&class, args)?;
        Ok(Value::Object(Rc::new(Instance {
            class: name.to_string(),
            fields,
            singleton: false,
        })))
    }

    /// Singleton of an `object` declaration
    fn object(&mut self, name: &str) -> InterpResult<Value> {
        if let Some(value) = self.objects.get(name) {
            return Ok(value.clone());
        }
        let class = self.class_def(name)?;
        let fields = self.init_fields(&class, Vec::new())?;
        let value = Value::Object(Rc::new(Instance {
            class: name.to_string(),
            fields,
            singleton: true,
        }));
        self.objects.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Fields of a new instance: the supertype's fields from the super call,
    /// then constructor parameters that are not inherited fields
    fn init_fields(&mut self, class: &ClassDef, args: Vec<Value>) -> InterpResult<Vec<(String, Value)>> {
        if class.params.len() != args.len() {
            return Err(RuntimeError::arity_mismatch(&class.name.node, class.params.len(), args.len()));
        }
        let env = child_env(&self.global_env);
        for (param, value) in class.params.iter().zip(&args) {
            env.borrow_mut().define(param.name.node.clone(), value.clone());
        }

        let mut fields = match &class.parent {
            Some(parent) => {
                let parent_class = self.class_def(&parent.name.node)?;
                let super_args = self.eval_args(&parent.args, &env)?;
                self.init_fields(&parent_class, super_args)?
            }
            None => Vec::new(),
        };

        for (param, value) in class.params.iter().zip(args) {
            if !fields.iter().any(|(n, _)| *n == param.name.node) {
                fields.push((param.name.node.clone(), value));
            }
        }
        Ok(fields)
    }

    /// Dynamic dispatch: the nearest declaration from the receiver's class upwards
    fn call_method(&mut self, receiver: Value, method: &str, args: Vec<Value>) -> InterpResult<Value> {
        let instance = receiver
            .as_object()
            .cloned()
            .ok_or_else(|| RuntimeError::type_error("object", receiver.type_name()))?;

        let mut current = Some(self.class_def(&instance.class)?);
        while let Some(class) = current {
            if let Some(def) = class.methods.iter().find(|m| m.name.node == method) {
                let Some(body) = &def.body else {
                    return Err(RuntimeError::abstract_call(&instance.class, method));
                };
                if def.params.len() != args.len() {
                    return Err(RuntimeError::arity_mismatch(method, def.params.len(), args.len()));
                }
                let env = child_env(&self.global_env);
                {
                    let mut scope = env.borrow_mut();
                    for (name, value) in &instance.fields {
                        scope.define(name.clone(), value.clone());
                    }
                    scope.define("self", receiver.clone());
                    for (param, value) in def.params.iter().zip(args) {
                        scope.define(param.name.node.clone(), value);
                    }
                }
                self.enter()?;
                let result = self.eval(body, &env);
                self.recursion_depth -= 1;
                return result;
            }
            current = match &class.parent {
                Some(parent) => Some(self.class_def(&parent.name.node)?),
                None => None,
            };
        }
        Err(RuntimeError::undefined_method(&instance.class, method))
    }
}

/// Binary operators on evaluated operands (`and`/`or` short-circuit before this)
fn eval_binary(op: BinOp, l: Value, r: Value) -> InterpResult<Value> {
    let overflow = || RuntimeError::integer_overflow(&op.to_string());
    match (op, l, r) {
        (BinOp::Add, Value::Int(a), Value::Int(b)) => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Add, Value::Str(a), b) => Ok(Value::string(format!("{a}{b}"))),
        (BinOp::Sub, Value::Int(a), Value::Int(b)) => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Mul, Value::Int(a), Value::Int(b)) => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Div | BinOp::Mod, Value::Int(_), Value::Int(0)) => Err(RuntimeError::division_by_zero()),
        (BinOp::Div, Value::Int(a), Value::Int(b)) => a.checked_div(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Mod, Value::Int(a), Value::Int(b)) => a.checked_rem(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        (BinOp::Gt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
        (BinOp::Le, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a <= b)),
        (BinOp::Ge, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
        (BinOp::Eq, a, b) => Ok(Value::Bool(a == b)),
        (BinOp::Ne, a, b) => Ok(Value::Bool(a != b)),
        (BinOp::And, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
        (BinOp::Or, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
        (_, l, r) => Err(RuntimeError::type_error(
            &format!("operands for `{op}`"),
            &format!("{} and {}", l.type_name(), r.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    const ZOO: &str = "
        sealed class Mammal(name: String) {
            fn sound() -> String;
            fn greeting() -> String = self.sound() + \", I am \" + name;
        }
        class Cat(name: String) : Mammal(name) {
            override fn sound() -> String = \"meow\";
        }
        class Human(name: String, job: String) : Mammal(name) {
            override fn sound() -> String = \"hello\";
        }
        object Nobody : Mammal(\"nobody\") {
            override fn sound() -> String = \"...\";
        }
        fn greet(m: Mammal) -> String = when m {
            is Human => \"Hello \" + m.name,
            is Cat => \"Hello \" + m.name,
            is Nobody => \"Hello nobody\",
        };
    ";

    /// Run `main` of `source` without type checking
    fn run(source: &str) -> InterpResult<Value> {
        let tokens = tokenize(source).expect("tokenize");
        let program = parse(tokens).expect("parse");
        let mut interp = Interpreter::new();
        interp.load(&program);
        interp.run("main")
    }

    fn run_zoo(main: &str) -> InterpResult<Value> {
        run(&format!("{ZOO}\n{main}"))
    }

    #[test]
    fn test_when_selects_variant_arm() {
        assert_eq!(
            run_zoo("fn main() -> String = greet(Cat(\"Lucy\"));").unwrap(),
            Value::string("Hello Lucy")
        );
        assert_eq!(
            run_zoo("fn main() -> String = greet(Nobody);").unwrap(),
            Value::string("Hello nobody")
        );
    }

    #[test]
    fn test_else_arm_taken_for_uncovered_instance() {
        let value = run(
            "open class Mammal(name: String)
             class Human(name: String) : Mammal(name)
             class Dog(name: String) : Mammal(name)
             fn greet(m: Mammal) -> String = when m {
                 is Human => \"Hello \" + m.name,
                 else => \"Hello unknown\",
             };
             fn main() -> String = greet(Dog(\"Rex\"));",
        )
        .unwrap();
        assert_eq!(value, Value::string("Hello unknown"));
    }

    #[test]
    fn test_dynamic_dispatch_through_inherited_method() {
        assert_eq!(
            run_zoo("fn main() -> String = Cat(\"Lucy\").greeting();").unwrap(),
            Value::string("meow, I am Lucy")
        );
    }

    #[test]
    fn test_inherited_field_set_by_super_call() {
        let value = run_zoo("fn main() -> Human = Human(\"Ada\", \"engineer\");").unwrap();
        assert_eq!(value.to_string(), "Human(name=Ada, job=engineer)");
        assert_eq!(run_zoo("fn main() -> String = Nobody.name;").unwrap(), Value::string("nobody"));
    }

    #[test]
    fn test_object_is_a_singleton() {
        assert_eq!(run_zoo("fn main() -> Bool = Nobody == Nobody;").unwrap(), Value::Bool(true));
        assert_eq!(
            run_zoo("fn main() -> Bool = Cat(\"a\") == Cat(\"a\");").unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_literal_patterns() {
        let source = "fn name(n: Int) -> String = when n { 0 => \"zero\", 1 | 2 => \"small\", else => \"many\" };
                      fn main() -> String = name(0) + name(2) + name(-7);";
        assert_eq!(run(source).unwrap(), Value::string("zerosmallmany"));
    }

    #[test]
    fn test_let_if_and_recursion() {
        let source = "fn fact(n: Int) -> Int = if n <= 1 { 1 } else { n * fact(n - 1) };
                      fn main() -> Int = { let x = 5; let y: Int = fact(x); y + 0 };";
        assert_eq!(run(source).unwrap(), Value::Int(120));
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(run("fn main() -> Bool = false and 1 / 0 == 0;").unwrap(), Value::Bool(false));
        assert_eq!(run("fn main() -> Bool = true or 1 / 0 == 0;").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_string_concatenation_displays_values() {
        assert_eq!(
            run("fn main() -> String = \"n=\" + 3 + \" b=\" + true;").unwrap(),
            Value::string("n=3 b=true")
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run("fn main() -> Int = 1 % 0;").unwrap_err().kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_integer_overflow() {
        let err = run("fn main() -> Int = 9223372036854775807 + 1;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegerOverflow);
    }

    #[test]
    fn test_unchecked_when_without_match() {
        let err = run_zoo("fn main() -> Int = when Cat(\"Tom\") { is Human => 1 };").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoMatchingArm);
        assert!(err.message.contains("Cat(name=Tom)"));
    }

    #[test]
    fn test_abstract_call_in_unchecked_program() {
        let err = run("sealed class S { fn f() -> Int; } class C : S fn main() -> Int = C().f();").unwrap_err();
        assert_eq!(err.kind, ErrorKind::AbstractCall);
    }

    #[test]
    fn test_sealed_class_not_instantiable() {
        let err = run_zoo("fn main() -> Mammal = Mammal(\"x\");").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_unbounded_recursion_reports_stack_overflow() {
        let err = run("fn forever(n: Int) -> Int = forever(n + 1); fn main() -> Int = forever(0);").unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
    }

    #[test]
    fn test_missing_entry() {
        let err = run("fn start() -> Int = 1;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedFunction);
    }

    #[test]
    fn test_functions_inside_modules_are_global() {
        assert_eq!(
            run("module util { fn one() -> Int = 1; } fn main() -> Int = one() + one();").unwrap(),
            Value::Int(2)
        );
    }
}
