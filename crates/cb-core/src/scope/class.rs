use std::ops::Deref;

use crate::backend::Backend;
use crate::call::{ClassTarget, FnCall, FunctionRef};
use crate::error::{Error, Result};
use crate::value::Value;

use super::{ClassData, Scope, ScopeKind};

/// A class definition. A class contains no code of its own; it is a
/// container for properties and methods.
#[derive(Clone)]
pub struct Class(pub(crate) Scope);

impl Class {
    pub fn named(name: &str) -> Class {
        Class(Scope::new_kind(
            ScopeKind::Class(ClassData {
                name: name.to_string(),
                extends: None,
            }),
            None,
        ))
    }

    fn with_data<R>(&self, op: impl FnOnce(&mut ClassData) -> R) -> R {
        let mut inner = self.0.inner_mut();
        match &mut inner.kind {
            ScopeKind::Class(data) => op(data),
            _ => unreachable!("a Class always wraps a class scope"),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.0
    }

    pub fn same(&self, other: &Class) -> bool {
        self.0.same(&other.0)
    }

    pub fn name(&self) -> String {
        self.with_data(|data| data.name.clone())
    }

    pub fn extends(&self) -> Option<ClassTarget> {
        self.with_data(|data| data.extends.clone())
    }

    pub fn set_extends(&self, target: ClassTarget) {
        self.with_data(|data| data.extends = Some(target));
    }

    /// A new object value instantiating this class.
    pub fn new_object(&self) -> Value {
        Value::new_object(Some(ClassTarget::Class(self.clone())))
    }

    /// A call to a static method of this class. The method has to exist.
    pub fn call_fn(&self, name: &str, params: Vec<crate::value::Arg>) -> Result<FnCall> {
        let function = self.0.get_fn_by_name(name).ok_or_else(|| {
            Error::Construction(format!(
                "Trying to call a non-existing static function '{}::{}()'",
                self.name(),
                name
            ))
        })?;
        Ok(FnCall::on_class(
            ClassTarget::Class(self.clone()),
            FunctionRef::Function(function),
            params,
        ))
    }

    /// Renders the class definition: properties first, then methods, all
    /// indented one level.
    pub fn build(&self, backend: &dyn Backend) -> Result<String> {
        let settings = backend.settings();
        let eol = settings.eol.clone();
        let extends = match self.extends() {
            Some(target) => format!(" extends {}", target.class_name()),
            None => String::new(),
        };
        let mut code = format!("class {}{}{}{{{}", self.name(), extends, eol, eol);

        let vars = self.0.vars();
        for var in &vars {
            let declaration = format!("var {}", var.build_declaration(&self.0, backend)?);
            code.push_str(&settings.indent(1, &declaration));
            code.push_str(&eol);
        }

        let fns = self.0.fns();
        if !vars.is_empty() && !fns.is_empty() {
            code.push_str(&eol);
            code.push_str(&eol);
        }

        for (index, function) in fns.iter().enumerate() {
            code.push_str(&settings.indent(1, &function.build(backend)?));
            code.push_str(&eol);
            if index < fns.len() - 1 {
                code.push_str(&eol);
            }
        }

        code.push('}');
        Ok(code)
    }
}

impl Deref for Class {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.0
    }
}
