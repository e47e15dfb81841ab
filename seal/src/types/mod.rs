//! Type checking

pub mod exhaustiveness;
pub mod hierarchy;

use std::collections::HashMap;

use crate::ast::*;
use crate::error::{CompileError, CompileWarning, Result};
use crate::util::{find_similar_name, format_suggestion_hint};

use exhaustiveness::{check_exhaustiveness, format_missing_patterns};
use hierarchy::check_unique_params;
pub use hierarchy::{ClassInfo, ClassTable, MethodSig};

/// Function signature
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub params: Vec<Type>,
    pub ret: Type,
    pub span: Span,
}

/// Type checker
#[derive(Debug, Default)]
pub struct TypeChecker {
    classes: ClassTable,
    /// Top-level functions (one namespace across all modules)
    functions: HashMap<String, FnSig>,
    /// Variable environment
    env: HashMap<String, Type>,
    /// Class of `self` while checking a method body
    self_class: Option<String>,
    /// Errors collected from function and method bodies
    errors: Vec<CompileError>,
    warnings: Vec<CompileWarning>,
}

/// Functions and classes of a program, including those inside modules
fn collect_items<'a>(items: &'a [Item], fns: &mut Vec<&'a FnDef>, classes: &mut Vec<&'a ClassDef>) {
    for item in items {
        match item {
            Item::Module(module) => collect_items(&module.items, fns, classes),
            Item::ClassDef(class) => classes.push(class),
            Item::FnDef(f) => fns.push(f),
        }
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a whole program.
    ///
    /// Declaration errors stop the check at the first one. Errors inside
    /// bodies are collected, so every inexhaustive `when` is reported.
    pub fn check_program(&mut self, program: &Program) -> Result<()> {
        self.functions.clear();
        self.env.clear();
        self.errors.clear();
        self.warnings.clear();

        self.classes = ClassTable::build(program)?;
        self.warnings.extend(self.classes.warnings().iter().cloned());

        let mut fns = Vec::new();
        let mut classes = Vec::new();
        collect_items(&program.items, &mut fns, &mut classes);

        for f in &fns {
            self.register_function(f)?;
        }
        for class in &classes {
            self.check_class_body(class);
        }
        for f in &fns {
            self.check_fn_body(f);
        }

        tracing::debug!(
            classes = self.classes.len(),
            functions = self.functions.len(),
            errors = self.errors.len(),
            warnings = self.warnings.len(),
            "type check finished"
        );

        match CompileError::from_many(std::mem::take(&mut self.errors)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<CompileWarning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn function(&self, name: &str) -> Option<&FnSig> {
        self.functions.get(name)
    }

    fn register_function(&mut self, f: &FnDef) -> Result<()> {
        let name = &f.name.node;
        if self.functions.contains_key(name) {
            return Err(CompileError::type_error(format!("duplicate function `{name}`"), f.name.span));
        }
        if self.classes.contains(name) {
            return Err(CompileError::type_error(
                format!("function `{name}` has the same name as a class"),
                f.name.span,
            ));
        }
        check_unique_params(&f.params, &format!("function `{name}`"))?;
        for param in &f.params {
            self.classes.check_type_known(&param.ty.node, param.ty.span)?;
        }
        self.classes.check_type_known(&f.ret_ty.node, f.ret_ty.span)?;

        self.functions.insert(
            name.clone(),
            FnSig {
                params: f.params.iter().map(|p| p.ty.node.clone()).collect(),
                ret: f.ret_ty.node.clone(),
                span: f.name.span,
            },
        );
        Ok(())
    }

    fn check_fn_body(&mut self, f: &FnDef) {
        self.env = f.params.iter().map(|p| (p.name.node.clone(), p.ty.node.clone())).collect();
        self.self_class = None;
        let result = self
            .infer(&f.body)
            .and_then(|ty| self.expect_type(&ty, &f.ret_ty.node, f.body.span));
        if let Err(err) = result {
            self.errors.push(err);
        }
    }

    fn check_class_body(&mut self, class: &ClassDef) {
        let Some(info) = self.classes.get(&class.name.node).cloned() else { return };

        // Super-constructor arguments see the constructor parameters only
        if let Some(parent) = &class.parent {
            self.env = info.params.iter().cloned().collect();
            self.self_class = None;
            let expected = self
                .classes
                .get(&parent.name.node)
                .map(|p| p.params.clone())
                .unwrap_or_default();
            for (arg, (_, ty)) in parent.args.iter().zip(&expected) {
                let result = self.infer(arg).and_then(|actual| self.expect_type(&actual, ty, arg.span));
                if let Err(err) = result {
                    self.errors.push(err);
                }
            }
        }

        for method in &class.methods {
            let Some(body) = &method.body else { continue };
            self.env = info.fields.iter().cloned().collect();
            for param in &method.params {
                self.env.insert(param.name.node.clone(), param.ty.node.clone());
            }
            self.self_class = Some(info.name.clone());
            let result = self
                .infer(body)
                .and_then(|ty| self.expect_type(&ty, &method.ret_ty.node, body.span));
            if let Err(err) = result {
                self.errors.push(err);
            }
        }
        self.self_class = None;
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn infer(&mut self, expr: &Spanned<Expr>) -> Result<Type> {
        match &expr.node {
            Expr::IntLit(_) => Ok(Type::Int),
            Expr::BoolLit(_) => Ok(Type::Bool),
            Expr::StringLit(_) => Ok(Type::Str),
            Expr::Unit => Ok(Type::Unit),

            Expr::Var(name) => self.infer_var(name, expr.span),

            Expr::SelfRef => self
                .self_class
                .clone()
                .map(Type::Class)
                .ok_or_else(|| CompileError::type_error("`self` is only available inside methods", expr.span)),

            Expr::Binary { left, op, right } => {
                let l = self.infer(left)?;
                let r = self.infer(right)?;
                self.binary_type(*op, &l, &r, expr.span)
            }

            Expr::Unary { op, expr: inner } => {
                let ty = self.infer(inner)?;
                let expected = match op {
                    UnOp::Neg => Type::Int,
                    UnOp::Not => Type::Bool,
                };
                if ty != expected {
                    return Err(CompileError::type_error(
                        format!("`{op}` expects `{expected}`, found `{ty}`"),
                        expr.span,
                    ));
                }
                Ok(ty)
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.infer(cond)?;
                self.expect_type(&cond_ty, &Type::Bool, cond.span)?;
                let then_ty = self.infer(then_branch)?;
                let else_ty = self.infer(else_branch)?;
                self.join(&then_ty, &else_ty, else_branch.span)
            }

            Expr::Let { name, ty, value, body } => {
                let value_ty = self.infer(value)?;
                let bound = match ty {
                    Some(annotation) => {
                        self.classes.check_type_known(&annotation.node, annotation.span)?;
                        self.expect_type(&value_ty, &annotation.node, value.span)?;
                        annotation.node.clone()
                    }
                    None => value_ty,
                };
                let old = self.env.insert(name.node.clone(), bound);
                let result = self.infer(body);
                self.restore(&name.node, old);
                result
            }

            Expr::Call { func, args } => self.infer_call(func, args, expr.span),

            Expr::FieldAccess { expr: object, field } => {
                let ty = self.infer(object)?;
                let class = self.expect_class(&ty, object.span)?;
                if let Some(field_ty) = self.classes.field_type(&class, &field.node) {
                    return Ok(field_ty.clone());
                }
                let fields: Vec<&str> = self
                    .classes
                    .get(&class)
                    .map(|c| c.fields.iter().map(|(n, _)| n.as_str()).collect())
                    .unwrap_or_default();
                Err(CompileError::type_error(
                    format!(
                        "`{}` has no field `{}`{}",
                        class,
                        field.node,
                        format_suggestion_hint(find_similar_name(&field.node, &fields, 2))
                    ),
                    field.span,
                ))
            }

            Expr::MethodCall { receiver, method, args } => {
                let ty = self.infer(receiver)?;
                let class = self.expect_class(&ty, receiver.span)?;
                let Some(sig) = self.classes.lookup_method(&class, &method.node).cloned() else {
                    return Err(CompileError::type_error(
                        format!("`{}` has no method `{}`", class, method.node),
                        method.span,
                    ));
                };
                self.check_args(&format!("method `{}`", method.node), &sig.params, args, expr.span)?;
                Ok(sig.ret)
            }

            Expr::When { scrutinee, arms } => self.infer_when(scrutinee, arms, expr.span),
        }
    }

    fn infer_var(&self, name: &str, span: Span) -> Result<Type> {
        if let Some(ty) = self.env.get(name) {
            return Ok(ty.clone());
        }
        if let Some(info) = self.classes.get(name) {
            if info.kind == ClassKind::Object {
                return Ok(Type::Class(name.to_string()));
            }
            return Err(CompileError::type_error(
                format!("`{name}` is a class; construct it with `{name}(...)`"),
                span,
            ));
        }
        if self.functions.contains_key(name) {
            return Err(CompileError::type_error(
                format!("`{name}` is a function; call it with `{name}(...)`"),
                span,
            ));
        }
        let mut candidates: Vec<&str> = self.env.keys().map(String::as_str).collect();
        candidates.sort_unstable();
        Err(CompileError::type_error(
            format!(
                "unknown variable `{}`{}",
                name,
                format_suggestion_hint(find_similar_name(name, &candidates, 2))
            ),
            span,
        ))
    }

    fn infer_call(&mut self, func: &Spanned<String>, args: &[Spanned<Expr>], span: Span) -> Result<Type> {
        let name = &func.node;
        if let Some(sig) = self.functions.get(name).cloned() {
            self.check_args(&format!("function `{name}`"), &sig.params, args, span)?;
            return Ok(sig.ret);
        }

        if let Some(info) = self.classes.get(name).cloned() {
            if info.kind == ClassKind::Object {
                return Err(CompileError::type_error(
                    format!("object `{name}` is a singleton; refer to it as `{name}` without arguments"),
                    func.span,
                ));
            }
            if info.kind.is_abstract() {
                return Err(CompileError::type_error(
                    format!("cannot instantiate {} `{}`", info.kind.keyword(), name),
                    func.span,
                ));
            }
            let params: Vec<Type> = info.params.iter().map(|(_, t)| t.clone()).collect();
            self.check_args(&format!("constructor of `{name}`"), &params, args, span)?;
            return Ok(Type::Class(name.clone()));
        }

        let mut candidates: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        candidates.extend(self.classes.classes().map(|c| c.name.as_str()));
        candidates.sort_unstable();
        Err(CompileError::type_error(
            format!(
                "unknown function `{}`{}",
                name,
                format_suggestion_hint(find_similar_name(name, &candidates, 2))
            ),
            func.span,
        ))
    }

    fn check_args(&mut self, what: &str, params: &[Type], args: &[Spanned<Expr>], span: Span) -> Result<()> {
        if params.len() != args.len() {
            return Err(CompileError::type_error(
                format!("{} expects {} argument(s), got {}", what, params.len(), args.len()),
                span,
            ));
        }
        for (arg, expected) in args.iter().zip(params) {
            let actual = self.infer(arg)?;
            self.expect_type(&actual, expected, arg.span)?;
        }
        Ok(())
    }

    fn binary_type(&self, op: BinOp, l: &Type, r: &Type, span: Span) -> Result<Type> {
        let ty = match op {
            BinOp::Add => match (l, r) {
                (Type::Int, Type::Int) => Some(Type::Int),
                (Type::Str, r) if r.is_primitive() => Some(Type::Str),
                _ => None,
            },
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                (*l == Type::Int && *r == Type::Int).then_some(Type::Int)
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                (*l == Type::Int && *r == Type::Int).then_some(Type::Bool)
            }
            BinOp::Eq | BinOp::Ne => {
                (self.is_assignable(l, r) || self.is_assignable(r, l)).then_some(Type::Bool)
            }
            BinOp::And | BinOp::Or => (*l == Type::Bool && *r == Type::Bool).then_some(Type::Bool),
        };
        ty.ok_or_else(|| {
            CompileError::type_error(format!("cannot apply `{op}` to `{l}` and `{r}`"), span)
        })
    }

    fn infer_when(&mut self, scrutinee: &Spanned<Expr>, arms: &[WhenArm], span: Span) -> Result<Type> {
        let scrutinee_ty = self.infer(scrutinee)?;
        for arm in arms {
            for pattern in &arm.patterns {
                self.check_pattern(&pattern.node, pattern.span, &scrutinee_ty)?;
            }
        }

        let result = check_exhaustiveness(&scrutinee_ty, arms, &self.classes);
        for &index in &result.unreachable_arms {
            self.warnings.push(CompileWarning::unreachable_arm(index, arms[index].span));
        }
        if let Some(index) = result.redundant_else {
            self.warnings.push(CompileWarning::redundant_else(arms[index].patterns[0].span));
        }
        if !result.is_exhaustive {
            tracing::debug!(
                scrutinee = %scrutinee_ty,
                missing = %format_missing_patterns(&result.missing_patterns),
                "inexhaustive when"
            );
            // `when <scrutinee>`, without the arms
            let head = Span::in_file(span.file, span.start, span.start).merge(scrutinee.span);
            self.errors.push(CompileError::inexhaustive_match(
                result.missing_patterns,
                result.unsealed,
                head,
            ));
        }

        // Smart cast: a plain variable scrutinee takes the arm's class inside the arm
        let cast_var = match &scrutinee.node {
            Expr::Var(name) if self.env.contains_key(name) => Some(name.clone()),
            _ => None,
        };

        let mut result_ty: Option<Type> = None;
        for arm in arms {
            let narrowed = cast_var
                .as_ref()
                .and_then(|name| self.narrow(&scrutinee_ty, &arm.patterns).map(|ty| (name, ty)));
            let body_ty = match narrowed {
                Some((name, ty)) => {
                    let old = self.env.insert(name.clone(), ty);
                    let body = self.infer(&arm.body);
                    self.restore(name, old);
                    body?
                }
                None => self.infer(&arm.body)?,
            };
            result_ty = Some(match result_ty {
                None => body_ty,
                Some(prev) => self.join(&prev, &body_ty, arm.body.span)?,
            });
        }
        // No arms: the scrutinee has no values, so neither does the `when`
        Ok(result_ty.unwrap_or(Type::Never))
    }

    fn check_pattern(&self, pattern: &Pattern, span: Span, scrutinee: &Type) -> Result<()> {
        match pattern {
            Pattern::Else => Ok(()),
            Pattern::Is(class) => {
                if !self.classes.contains(class) {
                    return Err(CompileError::type_error(
                        format!("unknown class `{}`{}", class, self.classes.suggest(class)),
                        span,
                    ));
                }
                match scrutinee {
                    Type::Class(s) if self.classes.is_related(class, s) => Ok(()),
                    Type::Class(s) => Err(CompileError::type_error(
                        format!("pattern `is {class}` can never match a value of type `{s}`"),
                        span,
                    )),
                    other => Err(CompileError::type_error(
                        format!("`is` patterns need a class value, found `{other}`"),
                        span,
                    )),
                }
            }
            Pattern::Literal(lit) if lit.ty() == *scrutinee => Ok(()),
            Pattern::Literal(lit) => Err(CompileError::type_error(
                format!("literal pattern `{lit}` does not match type `{scrutinee}`"),
                span,
            )),
        }
    }

    /// Type of the scrutinee inside an arm made only of `is` patterns
    fn narrow(&self, scrutinee: &Type, patterns: &[Spanned<Pattern>]) -> Option<Type> {
        let Type::Class(declared) = scrutinee else { return None };
        let mut joined: Option<String> = None;
        for pattern in patterns {
            let Pattern::Is(class) = &pattern.node else { return None };
            let narrowed = if self.classes.is_subclass(class, declared) { class } else { declared };
            joined = match joined {
                None => Some(narrowed.clone()),
                Some(prev) => self.classes.join(&prev, narrowed),
            };
        }
        joined.map(Type::Class)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn restore(&mut self, name: &str, old: Option<Type>) {
        match old {
            Some(ty) => self.env.insert(name.to_string(), ty),
            None => self.env.remove(name),
        };
    }

    fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Never, _) => true,
            (Type::Class(sub), Type::Class(sup)) => self.classes.is_subclass(sub, sup),
            _ => from == to,
        }
    }

    fn expect_type(&self, actual: &Type, expected: &Type, span: Span) -> Result<()> {
        if self.is_assignable(actual, expected) {
            Ok(())
        } else {
            Err(CompileError::type_error(
                format!("expected `{expected}`, found `{actual}`"),
                span,
            ))
        }
    }

    fn expect_class(&self, ty: &Type, span: Span) -> Result<String> {
        match ty {
            Type::Class(name) => Ok(name.clone()),
            other => Err(CompileError::type_error(
                format!("expected a class value, found `{other}`"),
                span,
            )),
        }
    }

    /// Nearest common type of two branches
    fn join(&self, a: &Type, b: &Type, span: Span) -> Result<Type> {
        if a == b || *b == Type::Never {
            return Ok(a.clone());
        }
        if *a == Type::Never {
            return Ok(b.clone());
        }
        if let (Type::Class(x), Type::Class(y)) = (a, b)
            && let Some(common) = self.classes.join(x, y)
        {
            return Ok(Type::Class(common));
        }
        Err(CompileError::type_error(
            format!("branches have incompatible types `{a}` and `{b}`"),
            span,
        ))
    }
}
