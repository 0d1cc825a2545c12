use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use crate::backend::Backend;
use crate::call::ClassTarget;
use crate::error::{Error, Result};
use crate::value::Value;
use crate::var::Variable;

use super::{BlockData, BracesMode, FunctionData, Scope, ScopeKind};

/// A function parameter. Parameters are read-only unless made writable.
#[derive(Clone)]
pub struct Parameter(Rc<RefCell<ParameterInner>>);

struct ParameterInner {
    writable: bool,
    var: Variable,
}

impl Parameter {
    pub fn new(var: &Variable) -> Parameter {
        Parameter(Rc::new(RefCell::new(ParameterInner {
            writable: false,
            var: var.clone(),
        })))
    }

    pub fn var(&self) -> Variable {
        self.0.borrow().var.clone()
    }

    pub fn is_writable(&self) -> bool {
        self.0.borrow().writable
    }

    pub fn set_writable(&self, writable: bool) -> &Parameter {
        self.0.borrow_mut().writable = writable;
        self
    }

    pub fn build(&self, backend: &dyn Backend) -> Result<String> {
        let inner = self.0.borrow();
        let accessor = inner.var.build_accessor(backend)?;
        Ok(if inner.writable {
            format!("&{}", accessor)
        } else {
            accessor
        })
    }
}

/// A function definition. A function is a naming scope; its body always
/// gets braces, even with a single statement.
#[derive(Clone)]
pub struct Function(pub(crate) Scope);

impl Function {
    pub fn new() -> Function {
        Function(Scope::new_kind(
            ScopeKind::Function(FunctionData {
                name: None,
                params: Vec::new(),
            }),
            Some(BlockData::new(BracesMode::Always)),
        ))
    }

    pub fn named(name: &str) -> Function {
        let function = Function::new();
        function.set_name_raw(name);
        function
    }

    fn with_data<R>(&self, op: impl FnOnce(&mut FunctionData) -> R) -> R {
        let mut inner = self.0.inner_mut();
        match &mut inner.kind {
            ScopeKind::Function(data) => op(data),
            _ => unreachable!("a Function always wraps a function scope"),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.0
    }

    pub fn same(&self, other: &Function) -> bool {
        self.0.same(&other.0)
    }

    pub fn name(&self) -> Option<String> {
        self.with_data(|data| data.name.clone())
    }

    /// Renames the function. If it already belongs to a scope, the rename
    /// re-runs naming registration there.
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set_name_raw(name);
        if let Some(parent) = self.0.parent_scope() {
            parent.add_fn(self)?;
        }
        Ok(())
    }

    pub(crate) fn set_name_raw(&self, name: &str) {
        self.with_data(|data| data.name = Some(name.to_string()));
    }

    /// Adds a parameter. The parameter variable joins the function scope as
    /// an undeclared variable, so the name cannot clash with locals.
    pub fn add_param(&self, param: &Parameter) -> Result<()> {
        let already_added = self.with_data(|data| {
            if data.params.iter().any(|p| Rc::ptr_eq(&p.0, &param.0)) {
                true
            } else {
                data.params.push(param.clone());
                false
            }
        });
        if !already_added {
            self.0.add_undeclared_var(&param.var())?;
        }
        Ok(())
    }

    pub fn params(&self) -> Vec<Parameter> {
        self.with_data(|data| data.params.clone())
    }

    /// The value representing the current object. Only available in class
    /// instance methods.
    pub fn get_this(&self) -> Result<Value> {
        let class = match self.0.parent_scope() {
            Some(scope) if scope.is_class() => super::Class(scope),
            _ => {
                return Err(Error::Construction(
                    "This function cannot use this, because it is not in a class".to_string(),
                ))
            }
        };
        Ok(Value::this_object(Some(ClassTarget::Class(class))))
    }

    pub fn build(&self, backend: &dyn Backend) -> Result<String> {
        let params = self.params();
        let mut params_code = Vec::with_capacity(params.len());
        for param in &params {
            params_code.push(param.build(backend)?);
        }
        let name = self.name().ok_or_else(|| {
            Error::Construction("Trying to compile a function that has no name yet".to_string())
        })?;
        let mut code = format!(
            "function {}({}){}",
            name,
            params_code.join(", "),
            backend.settings().eol
        );
        code.push_str(&self.0.build_block_body(backend)?);
        Ok(code)
    }
}

impl Default for Function {
    fn default() -> Self {
        Function::new()
    }
}

impl Deref for Function {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.0
    }
}
