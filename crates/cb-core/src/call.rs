use std::rc::Rc;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::scope::{Class, Function, Scope};
use crate::ty::Type;
use crate::value::{Arg, Source, Value};
use crate::var::Variable;

/// A class a call or object instantiation is addressed to
#[derive(Clone)]
pub enum ClassTarget {
    /// A class known only by name, defined outside the graph
    Name(String),
    /// A class defined in the graph
    Class(Class),
}

impl ClassTarget {
    pub fn class_name(&self) -> String {
        match self {
            ClassTarget::Name(name) => name.clone(),
            ClassTarget::Class(class) => class.name(),
        }
    }
}

/// A reference to a class that is not defined in the graph
#[derive(Clone)]
pub struct ClassRef {
    name: String,
}

impl ClassRef {
    pub fn new(name: &str) -> ClassRef {
        ClassRef {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn new_object(&self) -> Value {
        Value::new_object(Some(ClassTarget::Name(self.name.clone())))
    }

    /// A static method call on the referenced class
    pub fn call_fn(&self, name: &str, params: Vec<Arg>) -> FnCall {
        FnCall::on_class(
            ClassTarget::Name(self.name.clone()),
            FunctionRef::Name(name.to_string()),
            params,
        )
    }
}

#[derive(Clone)]
pub enum FunctionRef {
    Name(String),
    Function(Function),
}

impl FunctionRef {
    fn fn_name(&self) -> Result<String> {
        match self {
            FunctionRef::Name(name) => Ok(name.clone()),
            FunctionRef::Function(function) => function.name().ok_or_else(|| {
                Error::Construction("Trying to call a function that has no name yet".to_string())
            }),
        }
    }
}

enum CallTarget {
    /// Static call addressed to a class
    Class(ClassTarget),
    /// Method call addressed to an object value
    Object(Value),
}

struct FnCallInner {
    target: Option<CallTarget>,
    function: FunctionRef,
    params: Vec<Arg>,
}

/// A function or method call. Immutable once constructed.
#[derive(Clone)]
pub struct FnCall(Rc<FnCallInner>);

impl FnCall {
    /// A call to a free function by name
    pub fn named(name: &str, params: Vec<Arg>) -> FnCall {
        FnCall(Rc::new(FnCallInner {
            target: None,
            function: FunctionRef::Name(name.to_string()),
            params,
        }))
    }

    /// A call to a function defined in the graph
    pub fn of(function: &Function, params: Vec<Arg>) -> FnCall {
        FnCall(Rc::new(FnCallInner {
            target: None,
            function: FunctionRef::Function(function.clone()),
            params,
        }))
    }

    pub(crate) fn on_class(target: ClassTarget, function: FunctionRef, params: Vec<Arg>) -> FnCall {
        FnCall(Rc::new(FnCallInner {
            target: Some(CallTarget::Class(target)),
            function,
            params,
        }))
    }

    pub(crate) fn on_object(object: Value, function: FunctionRef, params: Vec<Arg>) -> FnCall {
        FnCall(Rc::new(FnCallInner {
            target: Some(CallTarget::Object(object)),
            function,
            params,
        }))
    }

    pub fn same(&self, other: &FnCall) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The result of this call, usable as a value or call argument
    pub fn res(&self) -> FnCallResult {
        FnCallResult(self.clone())
    }

    /// Renders the call. A single parameter stays inline; two or more
    /// parameters go one per line with leading commas.
    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        let prefix = match &self.0.target {
            Some(CallTarget::Class(target)) => format!("{}::", target.class_name()),
            Some(CallTarget::Object(object)) => format!(
                "{}{}",
                object.build(scope, backend)?,
                backend.member_accessor()
            ),
            None => String::new(),
        };
        let eol = backend.settings().eol.clone();
        let params = &self.0.params;
        let mut code = format!("{}{}(", prefix, self.0.function.fn_name()?);
        if params.len() > 1 {
            code.push_str(&eol);
        }
        for (index, param) in params.iter().enumerate() {
            let built = param.build(scope, backend)?;
            if params.len() > 1 {
                let mut line = backend.settings().indent(1, &built);
                if index > 0 {
                    // The separator takes the place of the first two indent
                    // columns; a narrower indent keeps the separator intact
                    let tab = backend.settings().indent_str(1);
                    let kept: String = tab.chars().skip(2).collect();
                    line = format!("{}, {}", kept, &line[tab.len()..]);
                }
                code.push_str(&line);
                code.push_str(&eol);
            } else {
                code.push_str(&built);
            }
        }
        code.push(')');
        Ok(code)
    }
}

/// The result of a function call
#[derive(Clone)]
pub struct FnCallResult(FnCall);

impl FnCallResult {
    pub fn call(&self) -> FnCall {
        self.0.clone()
    }

    /// A value that refers to this call result. Its type is unknown until
    /// explicitly set.
    pub fn value(&self) -> Value {
        Value::from_parts(
            Type::unknown(),
            None,
            Some(Source::FnCallResult(self.clone())),
        )
    }

    /// The call result cast to an object value, so methods can be called on it
    pub fn to_object(&self) -> Value {
        self.value().to_object()
    }

    pub fn assign_to_new_var(&self) -> Variable {
        self.value().assign_to_new_var()
    }
}
