use std::cell::RefCell;
use std::rc::Rc;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::path::VarPath;
use crate::scope::Scope;
use crate::value::Value;
use crate::var::Variable;

common_enum! {
    #[derive(Copy, Eq)]
    pub enum AssignKind {
        Assign,
        Add,
        Subtract,
        ListAppend,
        ListMerge,
    }
}

struct AssignmentInner {
    target: VarPath,
    kind: AssignKind,
    value: Option<Value>,
}

/// An assignment into a mutable variable (or a path into one)
#[derive(Clone)]
pub struct Assignment(Rc<RefCell<AssignmentInner>>);

impl Assignment {
    pub fn to_var(var: &Variable) -> Result<Assignment> {
        if !var.is_mutable() {
            return Err(Error::Construction(
                "Only mutable variables can be the target of an assignment".to_string(),
            ));
        }
        Assignment::to_path(VarPath::new(var, &[])?)
    }

    pub fn to_path(path: VarPath) -> Result<Assignment> {
        if !path.var().is_mutable() {
            return Err(Error::Construction(
                "If a var path is given as the assignment target - it has to be a path \
                 into a mutable variable"
                    .to_string(),
            ));
        }
        Ok(Assignment(Rc::new(RefCell::new(AssignmentInner {
            target: path,
            kind: AssignKind::Assign,
            value: None,
        }))))
    }

    pub fn same(&self, other: &Assignment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn target(&self) -> VarPath {
        self.0.borrow().target.clone()
    }

    pub fn kind(&self) -> AssignKind {
        self.0.borrow().kind
    }

    pub fn value(&self) -> Option<Value> {
        self.0.borrow().value.clone()
    }

    fn set(&self, kind: AssignKind, value: &Value) {
        let mut inner = self.0.borrow_mut();
        inner.kind = kind;
        inner.value = Some(value.clone());
    }

    pub fn set_assign_value(&self, value: &Value) -> Result<()> {
        self.set(AssignKind::Assign, value);
        Ok(())
    }

    pub fn set_add_value(&self, value: &Value) -> Result<()> {
        self.set(AssignKind::Add, value);
        Ok(())
    }

    pub fn set_subtract_value(&self, value: &Value) -> Result<()> {
        self.set(AssignKind::Subtract, value);
        Ok(())
    }

    pub fn set_list_append_value(&self, value: &Value) -> Result<()> {
        let target_ty = self.target().ty();
        if !target_ty.is_list() {
            return Err(Error::Construction(format!(
                "A list append assignment expects the result variable to contain a list, \
                 instead it contains {}",
                target_ty
            )));
        }
        self.set(AssignKind::ListAppend, value);
        Ok(())
    }

    pub fn set_list_merge_with_value(&self, value: &Value) -> Result<()> {
        if !value.ty().is_list() {
            return Err(Error::Construction(format!(
                "A list merging assignment expects the merged value to be a list, \
                 instead got {}",
                value.ty()
            )));
        }
        let target_ty = self.target().ty();
        if !target_ty.is_list() {
            return Err(Error::Construction(format!(
                "A list merge assignment expects the result variable to contain a list, \
                 instead it contains {}",
                target_ty
            )));
        }
        self.set(AssignKind::ListMerge, value);
        Ok(())
    }

    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        let inner = self.0.borrow();
        let left = inner.target.build(scope, backend)?;
        let value = inner.value.as_ref().ok_or_else(|| {
            Error::Construction("The right side value of this assignment is not set".to_string())
        })?;
        let right = value.build(scope, backend)?;
        Ok(match inner.kind {
            AssignKind::Assign => backend.build_assignment(&left, &right),
            AssignKind::Add => backend.build_add_assignment(&left, &right),
            AssignKind::Subtract => backend.build_subtract_assignment(&left, &right),
            AssignKind::ListAppend => backend.build_add_to_list(&left, &right)?,
            AssignKind::ListMerge => backend.build_merge_lists(&left, &right)?,
        })
    }
}
