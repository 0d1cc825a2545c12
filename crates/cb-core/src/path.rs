use std::rc::Rc;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::ty::{Type, TypeKind};
use crate::value::{Source, Value};
use crate::var::Variable;

/// One input step of a var path
#[derive(Clone)]
pub enum PathSeg {
    /// Struct field access
    Field(String),
    /// List access by integer constant
    Index(i64),
    /// List access by an int-typed value
    IndexValue(Value),
}

impl From<&str> for PathSeg {
    fn from(name: &str) -> Self {
        PathSeg::Field(name.to_string())
    }
}

impl From<String> for PathSeg {
    fn from(name: String) -> Self {
        PathSeg::Field(name)
    }
}

impl From<i64> for PathSeg {
    fn from(index: i64) -> Self {
        PathSeg::Index(index)
    }
}

impl From<Value> for PathSeg {
    fn from(value: Value) -> Self {
        PathSeg::IndexValue(value)
    }
}

enum Step {
    Field(String),
    ConstIndex(i64),
    ValueIndex(Value),
}

struct VarPathInner {
    var: Variable,
    steps: Vec<Step>,
    ty: Type,
}

/// An access path into a variable (struct fields and list indexes),
/// validated against the variable's type at construction. Immutable.
#[derive(Clone)]
pub struct VarPath(Rc<VarPathInner>);

impl std::fmt::Debug for VarPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarPath").finish_non_exhaustive()
    }
}

impl VarPath {
    /// Validates the path left to right against the variable's type.
    pub fn new(var: &Variable, path: &[PathSeg]) -> Result<VarPath> {
        let mut current = var.ty()?;
        let mut steps = Vec::with_capacity(path.len());
        for seg in path {
            match current.kind() {
                TypeKind::Struct(_) => match seg {
                    PathSeg::Field(name) => {
                        let field_ty = current.field_type(name).ok_or_else(|| {
                            Error::Construction(format!(
                                "At this point the selector path contains a struct that has \
                                 no such field \"{}\". Struct type: {}",
                                name, current
                            ))
                        })?;
                        steps.push(Step::Field(name.clone()));
                        current = field_ty;
                    }
                    _ => {
                        return Err(Error::Construction(
                            "At this point the selector path contains a struct, \
                             so only field names are allowed as a selector path item"
                                .to_string(),
                        ))
                    }
                },
                TypeKind::List(item_ty) => match seg {
                    PathSeg::Index(index) => {
                        steps.push(Step::ConstIndex(*index));
                        current = item_ty;
                    }
                    PathSeg::IndexValue(value) => {
                        if !value.ty().is_type_identical(&Type::int()) {
                            return Err(Error::Construction(format!(
                                "Path item is a value of type \"{}\" but at this point the \
                                 selector path contains a list, so only variables of type int \
                                 are allowed to work as an index for that list",
                                value.ty()
                            )));
                        }
                        steps.push(Step::ValueIndex(value.clone()));
                        current = item_ty;
                    }
                    PathSeg::Field(_) => {
                        return Err(Error::Construction(
                            "At this point the selector path contains a list so only integer \
                             constants and values of type int are allowed as a selector path item"
                                .to_string(),
                        ))
                    }
                },
                _ => {
                    return Err(Error::Construction(format!(
                        "Path is invalid - at this point in the selector path the accessed \
                         variable contains something of type \"{}\", which cannot be used to \
                         continue selector path access and has to be used directly instead",
                        current
                    )))
                }
            }
        }
        Ok(VarPath(Rc::new(VarPathInner {
            var: var.clone(),
            steps,
            ty: current,
        })))
    }

    pub fn var(&self) -> Variable {
        self.0.var.clone()
    }

    /// The type at the end of the path
    pub fn ty(&self) -> Type {
        self.0.ty.clone()
    }

    /// A value that refers to the location this path points at
    pub fn ref_val(&self) -> Value {
        Value::from_parts(self.ty(), None, Some(Source::VarPath(self.clone())))
    }

    pub fn assign_to_new_var(&self) -> Variable {
        self.ref_val().assign_to_new_var()
    }

    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        let mut out = scope.build_path_to_variable(&self.0.var, backend)?;
        for step in &self.0.steps {
            match step {
                Step::Field(name) => out.push_str(&backend.build_struct_field_accessor(name)),
                Step::ConstIndex(index) => {
                    out.push_str(&backend.build_list_index_accessor(&index.to_string()))
                }
                Step::ValueIndex(value) => out
                    .push_str(&backend.build_list_index_accessor(&value.build(scope, backend)?)),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PlainValue;

    fn source_var() -> Variable {
        let ty = Type::struct_of(vec![
            ("foo".to_string(), Type::list(Type::int())),
            ("bar".to_string(), Type::string()),
        ]);
        let value = Value::container_from_plain(
            &PlainValue::Struct(vec![
                (
                    "foo".to_string(),
                    PlainValue::List(vec![PlainValue::Int(1)]),
                ),
                ("bar".to_string(), PlainValue::Str("x".to_string())),
            ]),
            &ty,
        )
        .unwrap();
        value.assign_to_new_var()
    }

    #[test]
    fn path_types_are_resolved_left_to_right() {
        let var = source_var();
        let path = VarPath::new(&var, &["foo".into(), 0.into()]).unwrap();
        assert!(path.ty().is_type_identical(&Type::int()));
    }

    #[test]
    fn missing_struct_field_is_reported_with_the_type() {
        let var = source_var();
        let err = VarPath::new(&var, &["nope".into()]).unwrap_err();
        assert!(err.to_string().contains("no such field \"nope\""));
        assert!(err.to_string().contains("{foo: [int], bar: string}"));
    }

    #[test]
    fn list_index_must_be_an_int() {
        let var = source_var();
        let err =
            VarPath::new(&var, &["foo".into(), Value::string("i").into()]).unwrap_err();
        assert!(err
            .to_string()
            .contains("only variables of type int are allowed"));

        let err = VarPath::new(&var, &["foo".into(), "inner".into()]).unwrap_err();
        assert!(err.to_string().contains("only integer constants"));
    }

    #[test]
    fn atomic_types_cannot_be_descended_into() {
        let var = source_var();
        let err = VarPath::new(&var, &["bar".into(), "deeper".into()]).unwrap_err();
        assert!(err.to_string().contains("has to be used directly instead"));
    }
}
