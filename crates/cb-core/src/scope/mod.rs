use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::assign::Assignment;
use crate::backend::Backend;
use crate::call::{ClassTarget, FnCall};
use crate::error::{Error, Result};
use crate::path::VarPath;
use crate::settings::ReattachPolicy;
use crate::ty::Type;
use crate::value::Arg;
use crate::var::Variable;

pub mod block;
pub mod class;
pub mod cond;
pub mod file;
pub mod function;
pub mod iter;

pub use block::{Block, BracesMode};
pub use class::Class;
pub use cond::{If, Predicate};
pub use file::File;
pub use function::{Function, Parameter};
pub use iter::ListIterator;

pub(crate) struct FileData {
    pub(crate) name: Option<String>,
    pub(crate) classes: Vec<Class>,
}

pub(crate) struct FunctionData {
    pub(crate) name: Option<String>,
    pub(crate) params: Vec<Parameter>,
}

pub(crate) struct ClassData {
    pub(crate) name: String,
    pub(crate) extends: Option<ClassTarget>,
}

pub(crate) struct LoopData {
    pub(crate) list: Option<VarPath>,
    pub(crate) iterator: Option<Variable>,
    pub(crate) index: Option<Variable>,
}

pub(crate) enum ScopeKind {
    Block { naming: bool },
    File(FileData),
    Function(FunctionData),
    Class(ClassData),
    Loop(LoopData),
}

/// The code content of a scope. Classes have no block data; every other
/// scope kind does.
pub(crate) struct BlockData {
    pub(crate) braces: BracesMode,
    pub(crate) blocks: Vec<Scope>,
    pub(crate) ifs: Vec<If>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) ret: Option<Arg>,
    pub(crate) build_has_braces: bool,
}

impl BlockData {
    pub(crate) fn new(braces: BracesMode) -> BlockData {
        BlockData {
            braces,
            blocks: Vec::new(),
            ifs: Vec::new(),
            assignments: Vec::new(),
            ret: None,
            build_has_braces: false,
        }
    }
}

pub(crate) struct ScopeInner {
    pub(crate) kind: ScopeKind,
    pub(crate) parent: Option<WeakScope>,
    pub(crate) reattach: ReattachPolicy,
    pub(crate) inner_scopes: Vec<Scope>,
    pub(crate) vars: Vec<Variable>,
    pub(crate) fns: Vec<Function>,
    pub(crate) fn_calls: Vec<FnCall>,
    pub(crate) types: Vec<Type>,
    pub(crate) deps: Vec<String>,
    pub(crate) naming_vars: Vec<(String, Variable)>,
    pub(crate) naming_fns: Vec<(String, Function)>,
    pub(crate) naming_types: Vec<(String, Type)>,
    pub(crate) block: Option<BlockData>,
}

/// A lexical scope in the code graph: a block, file, function, class or
/// loop. Cheap to clone; clones share identity. Parent links are weak, so
/// the parent owns its children and not the other way around.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeInner>>);

/// A non-owning handle to a scope, used for parent links.
#[derive(Clone)]
pub struct WeakScope(Weak<RefCell<ScopeInner>>);

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(Scope)
    }
}

/// An item that lives in a scope and takes part in deferred naming.
pub(crate) trait ScopeItem: Clone {
    /// Prefix for generated names of unnamed items.
    const NAME_PREFIX: &'static str;

    fn item_name(&self) -> Option<String>;
    fn set_name_raw(&self, name: &str);
    fn item_parent(&self) -> Option<Scope>;
    fn set_parent_raw(&self, scope: &Scope);
    fn ptr_eq(&self, other: &Self) -> bool;
    fn registry(inner: &mut ScopeInner) -> &mut Vec<Self>;
    fn naming_registry(inner: &mut ScopeInner) -> &mut Vec<(String, Self)>;

    /// True if this item is the given scope itself. Only functions are both
    /// items and scopes.
    fn is_scope(&self, _scope: &Scope) -> bool {
        false
    }
}

impl ScopeItem for Variable {
    const NAME_PREFIX: &'static str = "tmp";

    fn item_name(&self) -> Option<String> {
        self.name()
    }

    fn set_name_raw(&self, name: &str) {
        Variable::set_name_raw(self, name);
    }

    fn item_parent(&self) -> Option<Scope> {
        self.parent_scope()
    }

    fn set_parent_raw(&self, scope: &Scope) {
        Variable::set_parent_raw(self, scope);
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        self.same(other)
    }

    fn registry(inner: &mut ScopeInner) -> &mut Vec<Self> {
        &mut inner.vars
    }

    fn naming_registry(inner: &mut ScopeInner) -> &mut Vec<(String, Self)> {
        &mut inner.naming_vars
    }
}

impl ScopeItem for Function {
    const NAME_PREFIX: &'static str = "tmp";

    fn item_name(&self) -> Option<String> {
        self.name()
    }

    fn set_name_raw(&self, name: &str) {
        Function::set_name_raw(self, name);
    }

    fn item_parent(&self) -> Option<Scope> {
        self.scope().parent_scope()
    }

    fn set_parent_raw(&self, scope: &Scope) {
        self.scope().set_parent_raw(scope);
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        self.same(other)
    }

    fn registry(inner: &mut ScopeInner) -> &mut Vec<Self> {
        &mut inner.fns
    }

    fn naming_registry(inner: &mut ScopeInner) -> &mut Vec<(String, Self)> {
        &mut inner.naming_fns
    }

    fn is_scope(&self, scope: &Scope) -> bool {
        self.scope().same(scope)
    }
}

impl ScopeItem for Type {
    const NAME_PREFIX: &'static str = "Tmp";

    fn item_name(&self) -> Option<String> {
        self.scope_name()
    }

    fn set_name_raw(&self, name: &str) {
        self.set_scope_name_raw(name);
    }

    fn item_parent(&self) -> Option<Scope> {
        self.parent_scope()
    }

    fn set_parent_raw(&self, scope: &Scope) {
        Type::set_parent_raw(self, scope);
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        self.same(other)
    }

    fn registry(inner: &mut ScopeInner) -> &mut Vec<Self> {
        &mut inner.types
    }

    fn naming_registry(inner: &mut ScopeInner) -> &mut Vec<(String, Self)> {
        &mut inner.naming_types
    }
}

fn gen_name<T>(registry: &[(String, T)], base: &str) -> String {
    let mut i = 1usize;
    loop {
        let candidate = format!("{}{}", base, i);
        if !registry.iter().any(|(key, _)| key == &candidate) {
            return candidate;
        }
        i += 1;
    }
}

impl Scope {
    pub(crate) fn new_kind(kind: ScopeKind, block: Option<BlockData>) -> Scope {
        Scope(Rc::new(RefCell::new(ScopeInner {
            kind,
            parent: None,
            reattach: ReattachPolicy::default(),
            inner_scopes: Vec::new(),
            vars: Vec::new(),
            fns: Vec::new(),
            fn_calls: Vec::new(),
            types: Vec::new(),
            deps: Vec::new(),
            naming_vars: Vec::new(),
            naming_fns: Vec::new(),
            naming_types: Vec::new(),
            block,
        })))
    }

    pub(crate) fn inner(&self) -> Ref<'_, ScopeInner> {
        self.0.borrow()
    }

    pub(crate) fn inner_mut(&self) -> RefMut<'_, ScopeInner> {
        self.0.borrow_mut()
    }

    pub fn same(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Rc::downgrade(&self.0))
    }

    pub fn parent_scope(&self) -> Option<Scope> {
        self.inner().parent.as_ref().and_then(WeakScope::upgrade)
    }

    pub(crate) fn set_parent_raw(&self, parent: &Scope) {
        self.inner_mut().parent = Some(parent.downgrade());
    }

    pub fn reattach_policy(&self) -> ReattachPolicy {
        self.inner().reattach
    }

    /// Chooses what happens when this scope, already attached to a parent,
    /// is attached somewhere else.
    pub fn set_reattach_policy(&self, policy: ReattachPolicy) {
        self.inner_mut().reattach = policy;
    }

    pub fn is_naming_scope(&self) -> bool {
        match &self.inner().kind {
            ScopeKind::Block { naming } => *naming,
            ScopeKind::File(_) | ScopeKind::Function(_) | ScopeKind::Class(_) => true,
            ScopeKind::Loop(_) => false,
        }
    }

    /// The nearest naming scope: this scope itself, or the first naming
    /// scope up the parent chain. None when the scope is still detached.
    pub fn naming_scope(&self) -> Option<Scope> {
        let mut current = self.clone();
        loop {
            if current.is_naming_scope() {
                return Some(current);
            }
            current = current.parent_scope()?;
        }
    }

    pub fn top_scope(&self) -> Scope {
        let mut current = self.clone();
        while let Some(parent) = current.parent_scope() {
            current = parent;
        }
        current
    }

    pub fn is_class(&self) -> bool {
        matches!(self.inner().kind, ScopeKind::Class(_))
    }

    pub(crate) fn is_loop(&self) -> bool {
        matches!(self.inner().kind, ScopeKind::Loop(_))
    }

    pub fn has_code(&self) -> bool {
        self.inner().block.is_some()
    }

    /// Attaches this scope under the given parent. When the attachment makes
    /// a naming scope reachable for the first time, every item in this scope
    /// and its inner scopes gets registered (and named, if still unnamed).
    pub fn set_parent_scope(&self, parent: &Scope) -> Result<()> {
        if let Some(existing) = self.parent_scope() {
            if existing.same(parent) {
                return Ok(());
            }
            match self.reattach_policy() {
                ReattachPolicy::Forbid => {
                    return Err(Error::Construction(
                        "This scope is already attached to a parent scope".to_string(),
                    ))
                }
                ReattachPolicy::Rehome => {
                    crate::warn!("rehoming a scope that was already attached to a parent");
                    self.detach_from(&existing);
                }
            }
        }

        let had_naming = self.naming_scope().is_some();

        self.set_parent_raw(parent);
        {
            let mut inner = parent.inner_mut();
            if !inner.inner_scopes.iter().any(|s| s.same(self)) {
                inner.inner_scopes.push(self.clone());
            }
        }

        // Dependencies always bubble up to the top scope
        for dep in self.dependencies() {
            parent.add_dependency(&dep);
        }

        if !had_naming && self.naming_scope().is_some() {
            self.add_all_items_to_naming_scope()?;
        }
        Ok(())
    }

    fn detach_from(&self, old_parent: &Scope) {
        {
            let mut inner = old_parent.inner_mut();
            inner.inner_scopes.retain(|s| !s.same(self));
            if let Some(block) = inner.block.as_mut() {
                block.blocks.retain(|s| !s.same(self));
            }
        }
        self.inner_mut().parent = None;
    }

    pub fn add_dependency(&self, dep: &str) {
        if let Some(parent) = self.parent_scope() {
            parent.add_dependency(dep);
            return;
        }
        let mut inner = self.inner_mut();
        if !inner.deps.iter().any(|d| d == dep) {
            inner.deps.push(dep.to_string());
        }
    }

    pub fn dependencies(&self) -> Vec<String> {
        self.inner().deps.clone()
    }

    fn add_item<T: ScopeItem>(&self, item: &T) -> Result<()> {
        {
            let mut inner = self.inner_mut();
            let registry = T::registry(&mut inner);
            if !registry.iter().any(|existing| existing.ptr_eq(item)) {
                registry.push(item.clone());
            }
        }
        let parented_here = item
            .item_parent()
            .map_or(false, |parent| parent.same(self));
        if !parented_here {
            item.set_parent_raw(self);
        }
        self.add_to_naming(item)
    }

    /// Registers an item at the nearest naming scope. An unnamed item gets a
    /// generated name; a name already taken by a different item gets a
    /// numeric suffix. No-op while no naming scope is reachable.
    fn add_to_naming<T: ScopeItem>(&self, item: &T) -> Result<()> {
        let naming = match self.naming_scope() {
            Some(scope) => scope,
            None => return Ok(()),
        };
        if item.is_scope(&naming) {
            return Ok(());
        }

        let current_name = item.item_name();
        let mut inner = naming.inner_mut();
        let registry = T::naming_registry(&mut inner);

        let existing_index = registry
            .iter()
            .position(|(_, registered)| registered.ptr_eq(item));
        if let Some(index) = existing_index {
            if Some(&registry[index].0) == current_name.as_ref() {
                return Ok(());
            }
        }

        let name = match current_name {
            None => {
                let generated = gen_name(registry, T::NAME_PREFIX);
                crate::trace!("generated name '{}' for an unnamed item", generated);
                item.set_name_raw(&generated);
                generated
            }
            Some(name) => {
                let taken_by_other = registry
                    .iter()
                    .any(|(key, registered)| key == &name && !registered.ptr_eq(item));
                if taken_by_other {
                    let generated = gen_name(registry, &name);
                    crate::debug!("name '{}' is already taken, using '{}'", name, generated);
                    item.set_name_raw(&generated);
                    generated
                } else {
                    name
                }
            }
        };

        if let Some(index) = existing_index {
            registry.remove(index);
        }
        registry.push((name, item.clone()));
        Ok(())
    }

    /// Walks every item of this scope and of all inner scopes and registers
    /// it at the naming scope. Used when attaching a detached subtree.
    pub(crate) fn add_all_items_to_naming_scope(&self) -> Result<()> {
        for var in self.vars() {
            self.add_to_naming(&var)?;
        }
        for function in self.fns() {
            self.add_to_naming(&function)?;
        }
        // Function calls carry no name of their own
        for ty in self.types() {
            self.add_to_naming(&ty)?;
        }
        for inner_scope in self.inner_scopes() {
            inner_scope.add_all_items_to_naming_scope()?;
        }
        Ok(())
    }

    pub fn add_var(&self, var: &Variable) -> Result<()> {
        self.add_item(var)?;
        // Values introduce their types into the graph
        if let Some(value) = var.let_value() {
            self.add_type(&value.ty())?;
        }
        Ok(())
    }

    /// Adds a variable that is usable in this scope but never declared in
    /// it, e.g. a function parameter.
    pub fn add_undeclared_var(&self, var: &Variable) -> Result<()> {
        self.add_var(var)?;
        var.set_declared(false);
        Ok(())
    }

    pub fn add_fn(&self, function: &Function) -> Result<()> {
        self.add_item(function)
    }

    pub fn add_fn_call(&self, call: &FnCall) {
        let mut inner = self.inner_mut();
        if !inner.fn_calls.iter().any(|existing| existing.same(call)) {
            inner.fn_calls.push(call.clone());
        }
    }

    /// Types are always kept at the top-most scope, so all types declared in
    /// one file get unique names.
    pub fn add_type(&self, ty: &Type) -> Result<()> {
        self.top_scope().add_item(ty)
    }

    pub fn vars(&self) -> Vec<Variable> {
        self.inner().vars.clone()
    }

    /// True if this is the direct parent scope of the variable. A variable
    /// contained in some parent scope is accessible from here, but this
    /// still returns false for it.
    pub fn contains_var(&self, var: &Variable) -> bool {
        self.inner().vars.iter().any(|v| v.same(var))
    }

    pub fn remove_var(&self, var: &Variable) {
        self.inner_mut().vars.retain(|v| !v.same(var));
    }

    pub fn fns(&self) -> Vec<Function> {
        self.inner().fns.clone()
    }

    pub fn get_fn_by_name(&self, name: &str) -> Option<Function> {
        self.inner()
            .fns
            .iter()
            .find(|function| function.name().as_deref() == Some(name))
            .cloned()
    }

    pub fn fn_calls(&self) -> Vec<FnCall> {
        self.inner().fn_calls.clone()
    }

    pub fn types(&self) -> Vec<Type> {
        self.inner().types.clone()
    }

    pub fn inner_scopes(&self) -> Vec<Scope> {
        self.inner().inner_scopes.clone()
    }

    /// Renders the accessor reaching the given variable from this scope.
    /// Walks up the parent chain; a variable owned by an enclosing class is
    /// reached through the object accessor.
    pub fn build_path_to_variable(
        &self,
        var: &Variable,
        backend: &dyn Backend,
    ) -> Result<String> {
        if var.is_super_global() || self.contains_var(var) {
            return backend.var_name(var);
        }

        let unreachable = || {
            Error::Construction(format!(
                "Variable '{}' is unreachable from this scope",
                var.name().unwrap_or_default()
            ))
        };

        let parent = self.parent_scope().ok_or_else(unreachable)?;
        if parent.is_class() {
            if parent.contains_var(var) {
                let name = var.name().ok_or_else(unreachable)?;
                return backend.build_this_field_access(&name);
            }
            return Err(unreachable());
        }
        parent.build_path_to_variable(var, backend)
    }

    fn block_data<R>(&self, op: impl FnOnce(&mut BlockData) -> R) -> Result<R> {
        let mut inner = self.inner_mut();
        match inner.block.as_mut() {
            Some(block) => Ok(op(block)),
            None => Err(Error::Construction(
                "This scope does not contain a code block".to_string(),
            )),
        }
    }

    /// Adds a child code block.
    pub fn add_block(&self, child: &Scope) -> Result<()> {
        if !child.has_code() {
            return Err(Error::Construction(
                "Only scopes that contain code can be added as child blocks".to_string(),
            ));
        }
        child.set_parent_scope(self)?;
        self.block_data(|block| {
            if !block.blocks.iter().any(|s| s.same(child)) {
                block.blocks.push(child.clone());
            }
        })
    }

    pub fn add_if(&self, cond: &If) -> Result<()> {
        let newly_added = self.block_data(|block| {
            if block.ifs.iter().any(|existing| existing.same(cond)) {
                false
            } else {
                block.ifs.push(cond.clone());
                true
            }
        })?;
        if newly_added {
            cond.then_block().set_parent_scope(self)?;
            cond.else_block().set_parent_scope(self)?;
        }
        Ok(())
    }

    pub fn add_mut_var_assignment(&self, assignment: &Assignment) -> Result<()> {
        self.block_data(|block| {
            if !block
                .assignments
                .iter()
                .any(|existing| existing.same(assignment))
            {
                block.assignments.push(assignment.clone());
            }
        })
    }

    pub fn set_return(&self, value: impl Into<Arg>) -> Result<()> {
        let value = value.into();
        self.block_data(|block| block.ret = Some(value))
    }

    pub fn set_braces_mode(&self, mode: BracesMode) -> Result<()> {
        self.block_data(|block| block.braces = mode)
    }

    /// Whether the last build of this block rendered surrounding braces.
    pub fn build_has_braces(&self) -> bool {
        self.inner()
            .block
            .as_ref()
            .map_or(false, |block| block.build_has_braces)
    }

    /// All variables that get a declaration line in this block: the naming
    /// registry of this scope (minus undeclared-and-uninitialized entries),
    /// plus directly contained initialized variables, minus superglobals.
    pub(crate) fn all_declared_vars(&self) -> Vec<Variable> {
        let mut declared: Vec<Variable> = Vec::new();
        for (_, var) in &self.inner().naming_vars {
            if var.is_declared() || var.is_initialized() {
                declared.push(var.clone());
            }
        }
        for var in &self.inner().vars {
            if var.is_initialized() && !declared.iter().any(|d| d.same(var)) {
                declared.push(var.clone());
            }
        }
        declared.retain(|var| !var.is_super_global());
        declared
    }

    fn build_variable_declaration(
        &self,
        var: &Variable,
        backend: &dyn Backend,
    ) -> Result<String> {
        let eol = &backend.settings().eol;
        let owned_here = var.parent_scope().map_or(false, |p| p.same(self));
        if !var.is_initialized() || !owned_here {
            // A comment line marks a variable that belongs to this naming
            // scope but is initialized elsewhere
            Ok(format!(
                "// {}{}{}",
                backend.var_name(var)?,
                backend.end_of_statement(),
                eol
            ))
        } else {
            Ok(format!("{}{}", var.build_declaration(self, backend)?, eol))
        }
    }

    /// Renders the statements of this block: declarations, child blocks,
    /// conditionals, calls, assignments and the return, in that order, with
    /// a blank line between nonempty parts. Wraps the result in braces per
    /// the braces mode (Auto braces appear from two statements up).
    pub(crate) fn build_block_body(&self, backend: &dyn Backend) -> Result<String> {
        let eol = backend.settings().eol.clone();
        let eos = backend.end_of_statement().to_string();
        let mut code = String::new();
        let mut sentences = 0usize;
        let mut split_next_part = false;

        let declared_vars = self.all_declared_vars();
        if !declared_vars.is_empty() {
            if split_next_part {
                code.push_str(&eol);
            }
            split_next_part = true;
            for var in &declared_vars {
                code.push_str(&self.build_variable_declaration(var, backend)?);
                sentences += 1;
            }
        }

        let child_blocks = self.block_data(|block| block.blocks.clone())?;
        if !child_blocks.is_empty() {
            let mut insert_newline_before_block = split_next_part;
            for child in &child_blocks {
                let child_code = build_child_scope(child, backend)?;
                if child_code.is_empty() {
                    continue;
                }
                if insert_newline_before_block {
                    code.push_str(&eol);
                    insert_newline_before_block = false;
                }
                split_next_part = true;
                code.push_str(&child_code);
                code.push_str(&eol);
                sentences += 1;
            }
        }

        let ifs = self.block_data(|block| block.ifs.clone())?;
        if !ifs.is_empty() {
            if split_next_part {
                code.push_str(&eol);
            }
            split_next_part = true;
            for cond in &ifs {
                code.push_str(&cond.build(self, backend)?);
                code.push_str(&eol);
                sentences += 1;
            }
        }

        let calls = self.fn_calls();
        if !calls.is_empty() {
            if split_next_part {
                code.push_str(&eol);
            }
            split_next_part = true;
            for call in &calls {
                code.push_str(&call.build(self, backend)?);
                code.push_str(&eos);
                code.push_str(&eol);
                sentences += 1;
            }
        }

        let assignments = self.block_data(|block| block.assignments.clone())?;
        if !assignments.is_empty() {
            if split_next_part {
                code.push_str(&eol);
            }
            split_next_part = true;
            for assignment in &assignments {
                code.push_str(&assignment.build(self, backend)?);
                code.push_str(&eos);
                code.push_str(&eol);
                sentences += 1;
            }
        }

        let ret = self.block_data(|block| block.ret.clone())?;
        if let Some(ret) = ret {
            if split_next_part {
                code.push_str(&eol);
            }
            let value = ret.build(self, backend).map_err(|err| {
                Error::Construction(format!("Trying to return a nonreachable value: {}", err))
            })?;
            code.push_str("return ");
            code.push_str(&value);
            code.push_str(&eos);
            code.push_str(&eol);
            sentences += 1;
        }

        let braces_mode = self.block_data(|block| block.braces)?;
        let braced = braces_mode == BracesMode::Always
            || (braces_mode == BracesMode::Auto && sentences > 1);
        if braced {
            if !code.is_empty() {
                code = backend.settings().indent(1, &code);
            }
            code = format!("{{{}{}}}", eol, code);
        } else if code.ends_with(&eol) {
            code.truncate(code.len() - eol.len());
        }
        self.block_data(|block| block.build_has_braces = braced)?;
        Ok(code)
    }
}

fn build_child_scope(child: &Scope, backend: &dyn Backend) -> Result<String> {
    if child.is_loop() {
        ListIterator::from_scope(child.clone()).build(backend)
    } else {
        child.build_block_body(backend)
    }
}
