use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::scope::{Scope, WeakScope};
use crate::ty::Type;
use crate::value::{Source, Value};

enum VarKind {
    /// Single-assignment variable; the value, once set, never changes
    Let {
        value: Option<Value>,
        initialized: bool,
    },
    /// Mutable variable: it has a set-once initial value and can later be
    /// the target of assignments
    Mut { initial: Option<Value> },
}

struct VarInner {
    name: Option<String>,
    parent: Option<WeakScope>,
    kind: VarKind,
    declared: bool,
    super_global: bool,
    ref_val: Option<Value>,
}

/// A variable in the code graph. Cheap to clone; clones share identity.
#[derive(Clone)]
pub struct Variable(Rc<RefCell<VarInner>>);

impl Variable {
    fn from_kind(name: Option<&str>, kind: VarKind) -> Variable {
        Variable(Rc::new(RefCell::new(VarInner {
            name: name.map(str::to_string),
            parent: None,
            kind,
            declared: true,
            super_global: false,
            ref_val: None,
        })))
    }

    pub fn new() -> Variable {
        Variable::from_kind(
            None,
            VarKind::Let {
                value: None,
                initialized: false,
            },
        )
    }

    pub fn named(name: &str) -> Variable {
        Variable::from_kind(
            Some(name),
            VarKind::Let {
                value: None,
                initialized: false,
            },
        )
    }

    pub fn new_mut() -> Variable {
        Variable::from_kind(None, VarKind::Mut { initial: None })
    }

    pub fn named_mut(name: &str) -> Variable {
        Variable::from_kind(Some(name), VarKind::Mut { initial: None })
    }

    pub(crate) fn with_value(value: &Value) -> Variable {
        Variable::from_kind(
            None,
            VarKind::Let {
                value: Some(value.clone()),
                initialized: true,
            },
        )
    }

    pub(crate) fn with_initial(value: &Value) -> Variable {
        Variable::from_kind(
            None,
            VarKind::Mut {
                initial: Some(value.clone()),
            },
        )
    }

    pub fn same(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self.0.borrow().kind, VarKind::Mut { .. })
    }

    pub fn name(&self) -> Option<String> {
        self.0.borrow().name.clone()
    }

    /// Renames the variable. If the variable already belongs to a scope, the
    /// rename re-runs naming-scope registration, so a colliding name gets a
    /// numeric suffix.
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set_name_raw(name);
        if let Some(parent) = self.parent_scope() {
            parent.add_var(self)?;
        }
        Ok(())
    }

    pub(crate) fn set_name_raw(&self, name: &str) {
        self.0.borrow_mut().name = Some(name.to_string());
    }

    pub fn parent_scope(&self) -> Option<Scope> {
        self.0.borrow().parent.as_ref().and_then(WeakScope::upgrade)
    }

    /// Moves this variable into the given scope. Membership in the previous
    /// scope, if any, is dropped.
    pub fn set_parent_scope(&self, scope: &Scope) -> Result<()> {
        if let Some(old) = self.parent_scope() {
            if !old.same(scope) {
                old.remove_var(self);
            }
        }
        self.set_parent_raw(scope);
        scope.add_var(self)
    }

    pub(crate) fn set_parent_raw(&self, scope: &Scope) {
        self.0.borrow_mut().parent = Some(scope.downgrade());
    }

    /// Assigns the value of an immutable variable. Errors if the variable is
    /// mutable or already holds a value.
    pub fn set_value(&self, value: &Value) -> Result<()> {
        let mut inner = self.0.borrow_mut();
        match &mut inner.kind {
            VarKind::Let {
                value: slot,
                initialized,
            } => {
                if slot.is_some() {
                    return Err(Error::Construction(
                        "This variable is already assigned a value - cannot change it, \
                         because immutable variables only take one value"
                            .to_string(),
                    ));
                }
                *slot = Some(value.clone());
                *initialized = true;
                Ok(())
            }
            VarKind::Mut { .. } => Err(Error::Construction(
                "Use set_initial_value() to give a mutable variable its initial value"
                    .to_string(),
            )),
        }
    }

    /// Sets the initial value of a mutable variable. Set-once.
    pub fn set_initial_value(&self, value: &Value) -> Result<()> {
        let mut inner = self.0.borrow_mut();
        match &mut inner.kind {
            VarKind::Mut { initial } => {
                if initial.is_some() {
                    return Err(Error::Construction(
                        "Initial value of this mutable variable is already set, cannot change it"
                            .to_string(),
                    ));
                }
                *initial = Some(value.clone());
                Ok(())
            }
            VarKind::Let { .. } => Err(Error::Construction(
                "Only mutable variables take an initial value; use set_value() instead"
                    .to_string(),
            )),
        }
    }

    /// The value this variable holds: the assigned value for immutable
    /// variables, the initial value for mutable ones.
    pub fn value(&self) -> Option<Value> {
        match &self.0.borrow().kind {
            VarKind::Let { value, .. } => value.clone(),
            VarKind::Mut { initial } => initial.clone(),
        }
    }

    /// The assigned value of an immutable variable, None for mutable ones.
    pub(crate) fn let_value(&self) -> Option<Value> {
        match &self.0.borrow().kind {
            VarKind::Let { value, .. } => value.clone(),
            VarKind::Mut { .. } => None,
        }
    }

    pub fn ty(&self) -> Result<Type> {
        match &self.0.borrow().kind {
            VarKind::Let { value, .. } => match value {
                Some(value) => Ok(value.ty()),
                None => Err(Error::Construction(format!(
                    "Variable '{}' has no type information yet, because its value is not set",
                    self.0.borrow().name.clone().unwrap_or_default()
                ))),
            },
            VarKind::Mut { initial } => match initial {
                Some(initial) => Ok(initial.ty()),
                None => Err(Error::Construction(
                    "Initial value of this mutable variable is not set. \
                     Call set_initial_value()."
                        .to_string(),
                )),
            },
        }
    }

    pub fn is_initialized(&self) -> bool {
        match &self.0.borrow().kind {
            VarKind::Let { initialized, .. } => *initialized,
            VarKind::Mut { initial } => initial.is_some(),
        }
    }

    /// Marks an immutable variable as (un)initialized without touching its
    /// value. Loop iterator variables carry a value for type information but
    /// are initialized by the loop itself, not by a declaration.
    pub fn set_is_initialized(&self, initialized: bool) -> &Variable {
        if let VarKind::Let {
            initialized: slot, ..
        } = &mut self.0.borrow_mut().kind
        {
            *slot = initialized;
        }
        self
    }

    pub fn is_declared(&self) -> bool {
        self.0.borrow().declared
    }

    pub(crate) fn set_declared(&self, declared: bool) {
        self.0.borrow_mut().declared = declared;
    }

    pub fn is_super_global(&self) -> bool {
        self.0.borrow().super_global
    }

    /// Superglobals are reachable from any scope by name and are never
    /// declared in generated code.
    pub fn set_super_global(&self, super_global: bool) -> &Variable {
        self.0.borrow_mut().super_global = super_global;
        self
    }

    /// A value that refers to this variable. Memoized: repeated calls return
    /// the same value node.
    pub fn ref_val(&self) -> Value {
        if let Some(existing) = &self.0.borrow().ref_val {
            return existing.clone();
        }
        let (ty, payload) = match self.value() {
            Some(value) => (value.ty(), value.payload_clone()),
            None => (Type::unknown(), None),
        };
        let val = Value::from_parts(ty, payload, Some(Source::Variable(self.clone())));
        self.0.borrow_mut().ref_val = Some(val.clone());
        val
    }

    /// Renders this variable's declaration statement.
    pub fn build_declaration(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        self.check_buildable()?;
        backend.build_var_declaration_statement(self, scope)
    }

    /// Renders a bare accessor for this variable (e.g. a parameter name).
    pub fn build_accessor(&self, backend: &dyn Backend) -> Result<String> {
        self.check_buildable()?;
        backend.var_name(self)
    }

    fn check_buildable(&self) -> Result<()> {
        if self.name().is_none() {
            return Err(Error::Construction(
                "Trying to compile a variable that is not given any name".to_string(),
            ));
        }
        if self.is_super_global() {
            return Err(Error::Construction(
                "Super globals should not be built".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Variable {
    fn default() -> Self {
        Variable::new()
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Variable({})",
            self.name().unwrap_or_else(|| "<unnamed>".to_string())
        )
    }
}
