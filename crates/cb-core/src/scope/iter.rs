use std::ops::Deref;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::path::VarPath;
use crate::value::Value;
use crate::var::Variable;

use super::{BlockData, BracesMode, LoopData, Scope, ScopeKind};

/// A loop over a list. The iterator variable takes each list item in turn;
/// an index variable is only rendered once one is requested.
#[derive(Clone)]
pub struct ListIterator(pub(crate) Scope);

impl ListIterator {
    pub fn new() -> ListIterator {
        ListIterator(Scope::new_kind(
            ScopeKind::Loop(LoopData {
                list: None,
                iterator: None,
                index: None,
            }),
            Some(BlockData::new(BracesMode::Auto)),
        ))
    }

    /// A loop over the list the given path points at, with a fresh unnamed
    /// iterator variable of the list's item type.
    pub fn over_path(list: &VarPath) -> Result<ListIterator> {
        let iterator = Value::of_type(&list.ty().item_type()?)?.assign_to_new_var();
        iterator.set_is_initialized(false);
        let this = ListIterator::new();
        this.set_list_var_path(list)?;
        this.set_iterator_var(&iterator)?;
        Ok(this)
    }

    /// A loop over the list held by the given variable.
    pub fn over_var(list: &Variable) -> Result<ListIterator> {
        ListIterator::over_path(&VarPath::new(list, &[])?)
    }

    pub(crate) fn from_scope(scope: Scope) -> ListIterator {
        ListIterator(scope)
    }

    fn with_data<R>(&self, op: impl FnOnce(&mut LoopData) -> R) -> R {
        let mut inner = self.0.inner_mut();
        match &mut inner.kind {
            ScopeKind::Loop(data) => op(data),
            _ => unreachable!("a ListIterator always wraps a loop scope"),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.0
    }

    pub fn list_var_path(&self) -> Option<VarPath> {
        self.with_data(|data| data.list.clone())
    }

    pub fn set_list_var_path(&self, list: &VarPath) -> Result<()> {
        if self.list_var_path().is_some() {
            return Err(Error::Construction(
                "List to iterate over is already set".to_string(),
            ));
        }
        let list_ty = list.ty();
        if !list_ty.is_list() {
            return Err(Error::Construction(
                "Variable to iterate over must contain a list".to_string(),
            ));
        }
        if let Some(iterator) = self.iterator_var() {
            self.check_iterator_matches(&iterator)?;
        }
        self.with_data(|data| data.list = Some(list.clone()));
        Ok(())
    }

    pub fn iterator_var(&self) -> Option<Variable> {
        self.with_data(|data| data.iterator.clone())
    }

    pub fn set_iterator_var(&self, iterator: &Variable) -> Result<()> {
        if self.iterator_var().is_some() {
            return Err(Error::Construction(
                "Iterator variable is already set".to_string(),
            ));
        }
        if iterator.ty()?.is_unknown() {
            return Err(Error::Construction(
                "Iterator variable must have a type set".to_string(),
            ));
        }
        if self.list_var_path().is_some() {
            self.check_iterator_matches(iterator)?;
        }
        self.with_data(|data| data.iterator = Some(iterator.clone()));
        if iterator.parent_scope().is_none() {
            self.0.add_var(iterator)?;
        }
        Ok(())
    }

    fn check_iterator_matches(&self, iterator: &Variable) -> Result<()> {
        let list = match self.list_var_path() {
            Some(list) => list,
            None => return Ok(()),
        };
        let item_ty = list.ty().item_type()?;
        let iterator_ty = iterator.ty()?;
        if !item_ty.matches_or_is_super_type_of(&iterator_ty) {
            return Err(Error::Construction(format!(
                "Iterator variable type \"{}\" does not match list type \"{}\"",
                iterator_ty,
                list.ty()
            )));
        }
        Ok(())
    }

    /// The index variable of this loop. Requesting it creates one, which
    /// makes the loop render with an index.
    pub fn get_index_var(&self) -> Result<Variable> {
        if let Some(index) = self.with_data(|data| data.index.clone()) {
            return Ok(index);
        }
        let index = Value::of_type(&crate::ty::Type::int())?.assign_to_new_var();
        index.set_is_initialized(false);
        self.set_index_var(&index)?;
        Ok(index)
    }

    pub fn set_index_var(&self, index: &Variable) -> Result<()> {
        if self.with_data(|data| data.index.is_some()) {
            return Err(Error::Construction(
                "Index variable is already set".to_string(),
            ));
        }
        if index.ty()?.is_unknown() {
            return Err(Error::Construction(
                "Index variable must have a type set".to_string(),
            ));
        }
        if !index.ty()?.is_type_identical(&crate::ty::Type::int()) {
            return Err(Error::Construction(
                "Iterator index variable type must be int".to_string(),
            ));
        }
        self.with_data(|data| data.index = Some(index.clone()));
        if index.parent_scope().is_none() {
            self.0.add_var(index)?;
        }
        Ok(())
    }

    pub fn build(&self, backend: &dyn Backend) -> Result<String> {
        let list = self.list_var_path().ok_or_else(|| {
            Error::Construction("List to iterate over is not set".to_string())
        })?;
        let iterator = self.iterator_var().ok_or_else(|| {
            Error::Construction("Iterator variable is not set".to_string())
        })?;
        self.check_iterator_matches(&iterator)?;

        let parent = self.0.parent_scope().ok_or_else(|| {
            Error::Construction(
                "List is unreachable from the block in which this foreach is defined"
                    .to_string(),
            )
        })?;
        let path_to_list = list.build(&parent, backend)?;

        let index = self.with_data(|data| data.index.clone());
        let path_to_index = match &index {
            Some(index) => Some(self.0.build_path_to_variable(index, backend)?),
            None => None,
        };
        let path_to_item = self.0.build_path_to_variable(&iterator, backend)?;

        let mut code =
            backend.build_list_iterator(&path_to_list, &path_to_item, path_to_index.as_deref())?;
        code.push_str(&backend.settings().eol);

        let mut body = self.0.build_block_body(backend)?;
        if !self.0.build_has_braces() {
            body = backend.settings().indent(1, &body);
        }
        code.push_str(&body);
        Ok(code)
    }
}

impl Default for ListIterator {
    fn default() -> Self {
        ListIterator::new()
    }
}

impl Deref for ListIterator {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.0
    }
}
