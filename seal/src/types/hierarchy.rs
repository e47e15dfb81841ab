//! Class table: the inheritance hierarchy and closed variant sets
//!
//! Built once per program before any body is checked. Declaration errors
//! are fatal and reported in the order they are found.

use std::collections::{HashMap, HashSet};

use crate::ast::{ClassDef, ClassKind, Item, Param, Program, Span, Type};
use crate::error::{CompileError, CompileWarning, Result};
use crate::util::{find_similar_name, format_suggestion_hint};

/// Display name of the module that holds items outside any `module` block
pub const ROOT_MODULE: &str = "<root>";

/// Method signature as seen by callers
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub is_abstract: bool,
    /// Class that declares the method
    pub owner: String,
    pub span: Span,
}

impl MethodSig {
    fn same_signature(&self, other: &MethodSig) -> bool {
        self.params == other.params && self.ret == other.ret
    }

    fn describe(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|t| t.to_string()).collect();
        format!("fn {}({}) -> {}", self.name, params.join(", "), self.ret)
    }
}

/// Checked class declaration
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
    /// Module path such as `zoo::pets`, empty for the root module
    pub module: String,
    pub parent: Option<String>,
    /// Constructor parameters
    pub params: Vec<(String, Type)>,
    /// Every field, inherited fields first
    pub fields: Vec<(String, Type)>,
    /// Methods declared by this class
    pub methods: Vec<MethodSig>,
    /// Direct subclasses in declaration order
    pub children: Vec<String>,
    pub span: Span,
    pub name_span: Span,
}

impl ClassInfo {
    pub fn module_name(&self) -> &str {
        module_display(&self.module)
    }

    pub fn is_sealed(&self) -> bool {
        self.kind == ClassKind::Sealed
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn own_method(&self, name: &str) -> Option<&MethodSig> {
        self.methods.iter().find(|m| m.name == name)
    }
}

pub fn module_display(path: &str) -> &str {
    if path.is_empty() { ROOT_MODULE } else { path }
}

/// All classes of a program
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: HashMap<String, ClassInfo>,
    /// Declaration order
    order: Vec<String>,
    warnings: Vec<CompileWarning>,
}

/// Walk items, recording each class with the module path it is declared in
fn collect_classes<'a>(items: &'a [Item], path: &mut Vec<String>, out: &mut Vec<(String, &'a ClassDef)>) {
    for item in items {
        match item {
            Item::Module(module) => {
                path.push(module.name.node.clone());
                collect_classes(&module.items, path, out);
                path.pop();
            }
            Item::ClassDef(class) => out.push((path.join("::"), class)),
            Item::FnDef(_) => {}
        }
    }
}

pub(crate) fn check_unique_params(params: &[Param], what: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for param in params {
        if !seen.insert(param.name.node.as_str()) {
            return Err(CompileError::type_error(
                format!("duplicate parameter `{}` in {}", param.name.node, what),
                param.name.span,
            ));
        }
    }
    Ok(())
}

impl ClassTable {
    /// Collect and check every class declaration of the program
    pub fn build(program: &Program) -> Result<Self> {
        let mut decls = Vec::new();
        collect_classes(&program.items, &mut Vec::new(), &mut decls);

        let mut table = ClassTable::default();
        for (module, def) in &decls {
            table.register(module, def)?;
        }
        for (_, def) in &decls {
            table.check_supertype_exists(def)?;
        }
        table.check_cycles(&decls)?;
        for (module, def) in &decls {
            table.check_extension(module, def)?;
        }
        for (_, def) in &decls {
            table.check_declared_types(def)?;
        }
        for (_, def) in &decls {
            if let Some(parent) = &def.parent
                && let Some(info) = table.classes.get_mut(&parent.name.node)
            {
                info.children.push(def.name.node.clone());
            }
        }

        // Supertypes before subtypes from here on
        let mut by_depth: Vec<&ClassDef> = decls.iter().map(|(_, d)| *d).collect();
        by_depth.sort_by_key(|d| table.ancestors(&d.name.node).count());
        for def in &by_depth {
            table.compute_fields(def)?;
        }
        for def in &by_depth {
            table.check_methods(def)?;
        }
        for def in &by_depth {
            table.check_implementations(def)?;
        }

        let empty: Vec<CompileWarning> = table
            .classes()
            .filter(|c| c.is_sealed() && c.children.is_empty())
            .map(|c| CompileWarning::empty_sealed(c.name.clone(), c.name_span))
            .collect();
        table.warnings = empty;

        tracing::debug!(classes = table.order.len(), "built class table");
        Ok(table)
    }

    fn register(&mut self, module: &str, def: &ClassDef) -> Result<()> {
        let name = &def.name.node;
        if let Some(existing) = self.classes.get(name) {
            return Err(CompileError::type_error(
                format!(
                    "duplicate class `{}` (already declared in module `{}`)",
                    name,
                    existing.module_name()
                ),
                def.name.span,
            ));
        }
        if Type::from_name(name).is_primitive() {
            return Err(CompileError::type_error(
                format!("`{name}` is a built-in type and cannot be declared as a class"),
                def.name.span,
            ));
        }
        check_unique_params(&def.params, &format!("constructor of `{name}`"))?;

        let methods = def
            .methods
            .iter()
            .map(|m| MethodSig {
                name: m.name.node.clone(),
                params: m.params.iter().map(|p| p.ty.node.clone()).collect(),
                ret: m.ret_ty.node.clone(),
                is_abstract: m.body.is_none(),
                owner: name.clone(),
                span: m.name.span,
            })
            .collect();

        tracing::debug!(class = %name, kind = def.kind.keyword(), module = %module_display(module), "registered class");
        self.classes.insert(
            name.clone(),
            ClassInfo {
                name: name.clone(),
                kind: def.kind,
                module: module.to_string(),
                parent: def.parent.as_ref().map(|p| p.name.node.clone()),
                params: def.params.iter().map(|p| (p.name.node.clone(), p.ty.node.clone())).collect(),
                fields: Vec::new(),
                methods,
                children: Vec::new(),
                span: def.span,
                name_span: def.name.span,
            },
        );
        self.order.push(name.clone());
        Ok(())
    }

    fn check_supertype_exists(&self, def: &ClassDef) -> Result<()> {
        let Some(parent) = &def.parent else { return Ok(()) };
        if self.classes.contains_key(&parent.name.node) {
            return Ok(());
        }
        Err(CompileError::type_error(
            format!("unknown class `{}`{}", parent.name.node, self.suggest(&parent.name.node)),
            parent.name.span,
        ))
    }

    fn check_cycles(&self, decls: &[(String, &ClassDef)]) -> Result<()> {
        for (_, def) in decls {
            let start = &def.name.node;
            let mut current = self.classes.get(start).and_then(|c| c.parent.as_ref());
            let mut steps = 0;
            while let Some(name) = current {
                if name == start {
                    return Err(CompileError::type_error(
                        format!("cyclic inheritance involving `{start}`"),
                        def.name.span,
                    ));
                }
                steps += 1;
                if steps > self.order.len() {
                    break;
                }
                current = self.classes.get(name).and_then(|c| c.parent.as_ref());
            }
        }
        Ok(())
    }

    /// Final and object supertypes, then the sealed boundary
    fn check_extension(&self, module: &str, def: &ClassDef) -> Result<()> {
        let Some(parent) = &def.parent else { return Ok(()) };
        let Some(super_info) = self.classes.get(&parent.name.node) else { return Ok(()) };

        if !super_info.kind.is_extendable() {
            let what = if super_info.kind == ClassKind::Object { "object" } else { "final class" };
            return Err(CompileError::type_error(
                format!(
                    "class `{}` cannot extend {} `{}`; declare it `open`, `abstract` or `sealed` to allow subclasses",
                    def.name.node, what, super_info.name
                ),
                parent.name.span,
            ));
        }

        if super_info.is_sealed() && super_info.module != module {
            return Err(CompileError::scope_violation(
                def.name.node.clone(),
                module_display(module),
                super_info.name.clone(),
                super_info.module_name(),
                def.name.span,
            ));
        }
        Ok(())
    }

    fn check_declared_types(&self, def: &ClassDef) -> Result<()> {
        for param in &def.params {
            self.check_type_known(&param.ty.node, param.ty.span)?;
        }
        for method in &def.methods {
            check_unique_params(&method.params, &format!("method `{}`", method.name.node))?;
            for param in &method.params {
                self.check_type_known(&param.ty.node, param.ty.span)?;
            }
            self.check_type_known(&method.ret_ty.node, method.ret_ty.span)?;
        }
        Ok(())
    }

    /// A type written in source must name a primitive or a declared class
    pub fn check_type_known(&self, ty: &Type, span: Span) -> Result<()> {
        match ty {
            Type::Class(name) if !self.classes.contains_key(name) => Err(CompileError::type_error(
                format!("unknown type `{}`{}", name, self.suggest(name)),
                span,
            )),
            _ => Ok(()),
        }
    }

    fn compute_fields(&mut self, def: &ClassDef) -> Result<()> {
        let name = &def.name.node;
        let (mut fields, super_params) = match &def.parent {
            Some(parent) => {
                let info = self.expect(&parent.name.node)?;
                (info.fields.clone(), info.params.len())
            }
            None => (Vec::new(), 0),
        };

        if let Some(parent) = &def.parent
            && parent.args.len() != super_params
        {
            return Err(CompileError::type_error(
                format!(
                    "`{}` expects {} constructor argument(s), got {}",
                    parent.name.node,
                    super_params,
                    parent.args.len()
                ),
                parent.span,
            ));
        }

        for param in &def.params {
            match fields.iter().find(|(n, _)| *n == param.name.node) {
                Some((_, inherited)) if *inherited != param.ty.node => {
                    return Err(CompileError::type_error(
                        format!(
                            "parameter `{}: {}` of `{}` shadows inherited field `{}: {}`",
                            param.name.node, param.ty.node, name, param.name.node, inherited
                        ),
                        param.name.span,
                    ));
                }
                Some(_) => {}
                None => fields.push((param.name.node.clone(), param.ty.node.clone())),
            }
        }

        if let Some(info) = self.classes.get_mut(name) {
            info.fields = fields;
        }
        Ok(())
    }

    fn check_methods(&self, def: &ClassDef) -> Result<()> {
        let class = self.expect(&def.name.node)?;
        let mut seen = HashSet::new();

        for (method, sig) in def.methods.iter().zip(&class.methods) {
            if !seen.insert(sig.name.as_str()) {
                return Err(CompileError::type_error(
                    format!("duplicate method `{}` in `{}`", sig.name, class.name),
                    method.name.span,
                ));
            }
            if sig.is_abstract && !class.kind.is_abstract() {
                return Err(CompileError::type_error(
                    format!(
                        "method `{}` has no body, but `{}` is not `sealed` or `abstract`",
                        sig.name, class.name
                    ),
                    method.span,
                ));
            }

            let inherited = class.parent.as_deref().and_then(|p| self.lookup_method(p, &sig.name));
            match (method.is_override, inherited) {
                (true, None) => {
                    return Err(CompileError::type_error(
                        format!("method `{}` is marked `override` but overrides nothing", sig.name),
                        method.name.span,
                    ));
                }
                (true, Some(base)) if !base.same_signature(sig) => {
                    return Err(CompileError::type_error(
                        format!(
                            "method `{}` does not match `{}` declared in `{}`",
                            sig.name,
                            base.describe(),
                            base.owner
                        ),
                        method.name.span,
                    ));
                }
                (false, Some(base)) => {
                    return Err(CompileError::type_error(
                        format!(
                            "method `{}` redefines the method inherited from `{}`; mark it `override`",
                            sig.name, base.owner
                        ),
                        method.name.span,
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_implementations(&self, def: &ClassDef) -> Result<()> {
        let class = self.expect(&def.name.node)?;
        if class.kind.is_abstract() {
            return Ok(());
        }
        let mut names: Vec<&str> = Vec::new();
        for ancestor in self.ancestors(&class.name) {
            for method in &ancestor.methods {
                if !names.contains(&method.name.as_str()) {
                    names.push(&method.name);
                }
            }
        }
        for name in names {
            if let Some(sig) = self.lookup_method(&class.name, name)
                && sig.is_abstract
            {
                return Err(CompileError::type_error(
                    format!(
                        "{} `{}` must implement abstract method `{}` declared in `{}`",
                        class.kind.keyword(),
                        class.name,
                        sig.name,
                        sig.owner
                    ),
                    class.name_span,
                ));
            }
        }
        Ok(())
    }

    fn expect(&self, name: &str) -> Result<&ClassInfo> {
        self.classes
            .get(name)
            .ok_or_else(|| CompileError::type_error(format!("unknown class `{name}`"), Span::new(0, 0)))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Classes in declaration order
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.order.iter().filter_map(|n| self.classes.get(n))
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    /// The class itself, then its supertypes up to the root
    pub fn ancestors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ClassInfo> + use<'a> {
        let limit = self.order.len();
        std::iter::successors(self.classes.get(name), move |c| {
            c.parent.as_deref().and_then(|p| self.classes.get(p))
        })
        .take(limit)
    }

    /// `sub` is `sup` or inherits from it
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        self.ancestors(sub).any(|c| c.name == sup)
    }

    pub fn is_related(&self, a: &str, b: &str) -> bool {
        self.is_subclass(a, b) || self.is_subclass(b, a)
    }

    /// Nearest common supertype
    pub fn join(&self, a: &str, b: &str) -> Option<String> {
        self.ancestors(a)
            .find(|c| self.is_subclass(b, &c.name))
            .map(|c| c.name.clone())
    }

    /// Direct variants of a sealed class; empty for any other class
    pub fn variant_set(&self, name: &str) -> &[String] {
        match self.classes.get(name) {
            Some(info) if info.is_sealed() => &info.children,
            _ => &[],
        }
    }

    pub fn field_type(&self, class: &str, field: &str) -> Option<&Type> {
        self.classes.get(class).and_then(|c| c.field(field))
    }

    /// Nearest declaration of `method` along the supertype chain
    pub fn lookup_method(&self, class: &str, method: &str) -> Option<&MethodSig> {
        self.ancestors(class).find_map(|c| c.own_method(method))
    }

    /// " hint: did you mean ..." for an unknown class name
    pub fn suggest(&self, name: &str) -> String {
        let mut candidates: Vec<&str> = self.order.iter().map(String::as_str).collect();
        candidates.extend(["Int", "Bool", "String", "Unit"]);
        format_suggestion_hint(find_similar_name(name, &candidates, 2))
    }

    /// Hierarchy as an indented tree, one root class per tree
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        for root in self.classes().filter(|c| c.parent.is_none()) {
            out.push_str(&self.describe(root));
            out.push('\n');
            self.render_children(root, "", &mut out);
        }
        out
    }

    fn render_children(&self, class: &ClassInfo, prefix: &str, out: &mut String) {
        let count = class.children.len();
        for (i, child) in class.children.iter().enumerate() {
            let Some(info) = self.classes.get(child) else { continue };
            let last = i + 1 == count;
            out.push_str(prefix);
            out.push_str(if last { "└── " } else { "├── " });
            out.push_str(&self.describe(info));
            out.push('\n');
            let next = format!("{prefix}{}", if last { "    " } else { "│   " });
            self.render_children(info, &next, out);
        }
    }

    fn describe(&self, class: &ClassInfo) -> String {
        let mut line = format!("{} {} [{}]", class.kind.keyword(), class.name, class.module_name());
        if class.is_sealed() {
            line.push_str(&format!(" closed {{{}}}", class.children.join(", ")));
        }
        line
    }
}
