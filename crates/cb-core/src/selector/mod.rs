use std::cell::Cell;

use crate::assign::Assignment;
use crate::error::{Error, Result};
use crate::path::{PathSeg, VarPath};
use crate::scope::{ListIterator, Scope};
use crate::ty::Type;
use crate::value::Value;
use crate::var::Variable;

pub mod parser;

pub use parser::SelectorToken;

enum Implementation {
    /// The selector needs no loops; the result is a direct reference
    Trivial,
    /// The top-level loop; it may contain nested loops
    Loop(ListIterator),
}

/// A high-level accessor that selects inner items of lists and structs out
/// of a variable, e.g. `[].inner[].int`. Compiling a selector produces the
/// loops and accumulator variables needed to collect the selected items.
///
/// The generated code is only attached to the parent block once the result
/// variable is taken; an unused selector leaves no trace in the output.
pub struct Selector {
    parent_block: Scope,
    result_var: Variable,
    result_type: Type,
    should_merge: bool,
    implementation: Implementation,
    result_used: Cell<bool>,
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector").finish_non_exhaustive()
    }
}

impl Selector {
    /// Parses the selector and builds its implementation against the type
    /// of `from_var`.
    pub fn new(parent_block: &Scope, from_var: &Variable, selector: &str) -> Result<Selector> {
        let tokens = parser::parse(selector)?;
        Selector::build(parent_block, from_var, &tokens)
    }

    fn build(parent_block: &Scope, from_var: &Variable, tokens: &[SelectorToken]) -> Result<Selector> {
        let mut result_var = from_var.clone();
        let mut pending_path: Vec<PathSeg> = Vec::new();
        let mut root_iterator: Option<ListIterator> = None;
        let mut current_iterator: Option<ListIterator> = None;

        for (index, token) in tokens.iter().enumerate() {
            match token {
                SelectorToken::List => {
                    // Probe the path so type checking happens even when the
                    // list token ends the selector and builds no loop
                    let list_path = VarPath::new(&result_var, &pending_path)?;
                    if !list_path.ty().is_list() {
                        return Err(Error::Selector(format!(
                            "Trying to loop over a value of type {}, which is not a list",
                            list_path.ty()
                        )));
                    }
                    // A trailing list token only merges results, it iterates
                    // nothing itself
                    if index < tokens.len() - 1 {
                        let iterator = ListIterator::over_path(&list_path)?;
                        if let Some(parent) = &current_iterator {
                            parent.add_block(iterator.scope())?;
                        }
                        if root_iterator.is_none() {
                            root_iterator = Some(iterator.clone());
                        }
                        result_var = iterator.iterator_var().ok_or_else(|| {
                            Error::Construction("Iterator variable is not set".to_string())
                        })?;
                        pending_path.clear();
                        current_iterator = Some(iterator);
                    }
                }
                SelectorToken::Field(name) => {
                    pending_path.push(PathSeg::Field(name.clone()));
                }
            }
        }

        let result_path = VarPath::new(&result_var, &pending_path)?;
        let mut result_type = result_path.ty();

        let list_tokens = tokens
            .iter()
            .filter(|t| matches!(t, SelectorToken::List))
            .count();
        let should_merge = list_tokens > 1 && matches!(tokens.last(), Some(SelectorToken::List));

        let (result_var, implementation) = match (root_iterator, current_iterator) {
            (Some(root), Some(innermost)) => {
                let accumulator;
                let final_assignment;
                if should_merge {
                    accumulator = new_result_mut_var(&result_type)?;
                    final_assignment = Assignment::to_var(&accumulator)?;
                    final_assignment.set_list_merge_with_value(&result_path.ref_val())?;
                } else {
                    result_type = Type::list(result_type);
                    accumulator = new_result_mut_var(&result_type)?;
                    final_assignment = Assignment::to_var(&accumulator)?;
                    final_assignment.set_list_append_value(&result_path.ref_val())?;
                }
                innermost.add_mut_var_assignment(&final_assignment)?;
                (accumulator, Implementation::Loop(root))
            }
            _ => (
                result_path.ref_val().assign_to_new_var(),
                Implementation::Trivial,
            ),
        };

        Ok(Selector {
            parent_block: parent_block.clone(),
            result_var,
            result_type,
            should_merge,
            implementation,
            result_used: Cell::new(false),
        })
    }

    /// The type of the selector result.
    pub fn result_type(&self) -> Type {
        self.result_type.clone()
    }

    /// True when the innermost loops merge their lists into the result
    /// instead of appending single items.
    pub fn should_merge(&self) -> bool {
        self.should_merge
    }

    /// The variable holding the selector result. Taking it attaches the
    /// generated loops and the result variable to the parent block.
    pub fn res_var(&self) -> Result<Variable> {
        if !self.result_used.get() {
            self.result_used.set(true);
            if let Implementation::Loop(root) = &self.implementation {
                crate::debug!("selector result taken, attaching its loops to the parent block");
                self.parent_block.add_block(root.scope())?;
            }
            self.result_var.set_parent_scope(&self.parent_block)?;
        }
        Ok(self.result_var.clone())
    }
}

fn new_result_mut_var(ty: &Type) -> Result<Variable> {
    let value = if ty.is_list() {
        Value::empty_list(ty)?
    } else {
        Value::of_type(ty)?
    };
    Ok(value.assign_to_new_mut_var())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Block;
    use crate::value::PlainValue;

    fn rows_var() -> Variable {
        let item_ty = Type::struct_of(vec![
            ("foo".to_string(), Type::string()),
            ("bar".to_string(), Type::list(Type::int())),
        ]);
        let ty = Type::list(item_ty.clone());
        Value::empty_list(&ty).unwrap().assign_to_new_var()
    }

    #[test]
    fn trailing_list_token_keeps_the_list_type() {
        let block = Block::naming();
        let var = rows_var();
        var.set_parent_scope(block.scope()).unwrap();
        let selector = Selector::new(block.scope(), &var, "[]").unwrap();
        assert!(selector.result_type().is_list());
        assert!(!selector.should_merge());
    }

    #[test]
    fn field_selection_inside_a_loop_collects_into_a_list() {
        let block = Block::naming();
        let var = rows_var();
        var.set_parent_scope(block.scope()).unwrap();
        let selector = Selector::new(block.scope(), &var, "[].foo").unwrap();
        let result_ty = selector.result_type();
        assert!(result_ty.is_list());
        assert!(result_ty
            .item_type()
            .unwrap()
            .is_type_identical(&Type::string()));
    }

    #[test]
    fn nested_lists_ending_in_a_list_merge() {
        let block = Block::naming();
        let var = rows_var();
        var.set_parent_scope(block.scope()).unwrap();
        let selector = Selector::new(block.scope(), &var, "[].bar[]").unwrap();
        assert!(selector.should_merge());
        assert!(selector
            .result_type()
            .is_type_identical(&Type::list(Type::int())));
    }

    #[test]
    fn unused_selector_adds_nothing_to_the_block() {
        let block = Block::naming();
        let var = rows_var();
        var.set_parent_scope(block.scope()).unwrap();
        let _selector = Selector::new(block.scope(), &var, "[].foo").unwrap();
        // One inner scope would appear if the selector attached its loop
        assert!(block.scope().inner_scopes().is_empty());
    }

    #[test]
    fn taking_the_result_attaches_the_loop() {
        let block = Block::naming();
        let var = rows_var();
        var.set_parent_scope(block.scope()).unwrap();
        let selector = Selector::new(block.scope(), &var, "[].foo").unwrap();
        let first = selector.res_var().unwrap();
        let second = selector.res_var().unwrap();
        assert!(first.same(&second));
        assert_eq!(block.scope().inner_scopes().len(), 1);
    }

    #[test]
    fn looping_over_a_non_list_is_an_error() {
        let block = Block::naming();
        let ty = Type::struct_of(vec![("n".to_string(), Type::int())]);
        let value = Value::container_from_plain(
            &PlainValue::Struct(vec![("n".to_string(), PlainValue::Int(1))]),
            &ty,
        )
        .unwrap();
        let var = value.assign_to_new_var();
        var.set_parent_scope(block.scope()).unwrap();
        let err = Selector::new(block.scope(), &var, "[]").unwrap_err();
        assert!(err
            .to_string()
            .contains("Trying to loop over a value of type {n: int}, which is not a list"));
    }
}
