use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::scope::{Scope, WeakScope};

common_enum! {
    #[derive(Copy, Eq)]
    pub enum AtomicKind {
        Str,
        Int,
        Float,
        Bool,
    }
}

impl AtomicKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            AtomicKind::Str => "string",
            AtomicKind::Int => "int",
            AtomicKind::Float => "float",
            AtomicKind::Bool => "bool",
        }
    }
}

#[derive(Clone)]
pub enum TypeKind {
    /// Type information is not available (yet)
    Unknown,
    Atomic(AtomicKind),
    /// Homogeneous list with the given item type
    List(Type),
    /// Ordered field map
    Struct(Vec<(String, Type)>),
    /// An object of some class; classes are tracked on values, not types
    Object,
}

struct TypeInner {
    kind: TypeKind,
    /// Name assigned by the naming scope this type is registered in
    scope_name: Option<String>,
    /// TRUE once a user explicitly named this type; only then the scope
    /// name becomes part of the type identity and typedef emission
    has_type_name: bool,
    /// Name of a type native to the target language, takes precedence
    /// over any scope name
    external_name: Option<String>,
    parent: Option<WeakScope>,
}

/// A handle to a type node. Handles are cheap to clone and share identity:
/// two handles are the same type node iff they point at the same allocation.
#[derive(Clone)]
pub struct Type(Rc<RefCell<TypeInner>>);

impl Type {
    fn from_kind(kind: TypeKind) -> Type {
        Type(Rc::new(RefCell::new(TypeInner {
            kind,
            scope_name: None,
            has_type_name: false,
            external_name: None,
            parent: None,
        })))
    }

    pub fn unknown() -> Type {
        Type::from_kind(TypeKind::Unknown)
    }

    pub fn string() -> Type {
        Type::from_kind(TypeKind::Atomic(AtomicKind::Str))
    }

    pub fn int() -> Type {
        Type::from_kind(TypeKind::Atomic(AtomicKind::Int))
    }

    pub fn float() -> Type {
        Type::from_kind(TypeKind::Atomic(AtomicKind::Float))
    }

    pub fn boolean() -> Type {
        Type::from_kind(TypeKind::Atomic(AtomicKind::Bool))
    }

    pub fn object() -> Type {
        Type::from_kind(TypeKind::Object)
    }

    pub fn list(item: Type) -> Type {
        Type::from_kind(TypeKind::List(item))
    }

    pub fn struct_of(fields: Vec<(String, Type)>) -> Type {
        Type::from_kind(TypeKind::Struct(fields))
    }

    /// Node identity: TRUE iff both handles point at the same type node
    pub fn same(&self, other: &Type) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> TypeKind {
        self.0.borrow().kind.clone()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.0.borrow().kind, TypeKind::Unknown)
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.0.borrow().kind, TypeKind::Atomic(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.0.borrow().kind, TypeKind::List(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.0.borrow().kind, TypeKind::Struct(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.0.borrow().kind, TypeKind::Object)
    }

    pub fn atomic_kind(&self) -> Option<AtomicKind> {
        match &self.0.borrow().kind {
            TypeKind::Atomic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn item_type(&self) -> Result<Type> {
        match &self.0.borrow().kind {
            TypeKind::List(item) => Ok(item.clone()),
            _ => Err(Error::UnexpectedType(format!(
                "type {} is not a list and has no item type",
                self
            ))),
        }
    }

    pub fn fields(&self) -> Result<Vec<(String, Type)>> {
        match &self.0.borrow().kind {
            TypeKind::Struct(fields) => Ok(fields.clone()),
            _ => Err(Error::UnexpectedType(format!(
                "type {} is not a struct and has no fields",
                self
            ))),
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        match &self.0.borrow().kind {
            TypeKind::Struct(fields) => fields.iter().any(|(field, _)| field == name),
            _ => false,
        }
    }

    pub fn field_type(&self, name: &str) -> Option<Type> {
        match &self.0.borrow().kind {
            TypeKind::Struct(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, ty)| ty.clone()),
            _ => None,
        }
    }

    /// Adds a field to a struct type, replacing the field type if the field
    /// already exists.
    pub fn add_field(&self, name: &str, ty: Type) -> Result<()> {
        match &mut self.0.borrow_mut().kind {
            TypeKind::Struct(fields) => {
                if let Some(slot) = fields.iter_mut().find(|(field, _)| field == name) {
                    slot.1 = ty;
                } else {
                    fields.push((name.to_string(), ty));
                }
                Ok(())
            }
            _ => Err(Error::TypeSystem(
                "cannot add a field to a non-struct type".to_string(),
            )),
        }
    }

    /// The name this type should be referred to by in generated code:
    /// external name wins, then the user-assigned type name.
    pub fn type_name(&self) -> Option<String> {
        let inner = self.0.borrow();
        if let Some(external) = &inner.external_name {
            return Some(external.clone());
        }
        if inner.has_type_name {
            return inner.scope_name.clone();
        }
        None
    }

    pub fn scope_name(&self) -> Option<String> {
        self.0.borrow().scope_name.clone()
    }

    pub fn has_type_name(&self) -> bool {
        self.0.borrow().has_type_name
    }

    pub fn external_name(&self) -> Option<String> {
        self.0.borrow().external_name.clone()
    }

    pub fn set_external_type_name(&self, name: &str) {
        self.0.borrow_mut().external_name = Some(name.to_string());
    }

    /// Explicitly named types become part of type identity and are emitted
    /// as type definitions by backends that declare types.
    pub fn set_type_name(&self, name: &str) -> Result<()> {
        {
            let mut inner = self.0.borrow_mut();
            inner.scope_name = Some(name.to_string());
            inner.has_type_name = true;
        }
        if let Some(parent) = self.parent_scope() {
            parent.add_type(self)?;
        }
        Ok(())
    }

    /// TRUE if a backend that emits type definitions has to declare this type
    pub fn has_to_be_declared(&self) -> bool {
        self.0.borrow().has_type_name
    }

    pub fn parent_scope(&self) -> Option<Scope> {
        self.0.borrow().parent.as_ref().and_then(WeakScope::upgrade)
    }

    pub(crate) fn set_parent_raw(&self, scope: &Scope) {
        self.0.borrow_mut().parent = Some(scope.downgrade());
    }

    pub(crate) fn set_scope_name_raw(&self, name: &str) {
        self.0.borrow_mut().scope_name = Some(name.to_string());
    }

    /// Structural type identity. Explicit names (external or user-assigned)
    /// are part of the identity; scope-generated names are not.
    pub fn is_type_identical(&self, other: &Type) -> bool {
        if self.same(other) {
            return true;
        }
        if self.external_name() != other.external_name() {
            return false;
        }
        if self.has_type_name() != other.has_type_name() {
            return false;
        }
        if self.has_type_name() && self.scope_name() != other.scope_name() {
            return false;
        }
        match (&self.kind(), &other.kind()) {
            (TypeKind::Unknown, TypeKind::Unknown) => true,
            (TypeKind::Object, TypeKind::Object) => true,
            (TypeKind::Atomic(a), TypeKind::Atomic(b)) => a == b,
            (TypeKind::List(a), TypeKind::List(b)) => a.is_type_identical(b),
            (TypeKind::Struct(a), TypeKind::Struct(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(name, ty)| {
                        b.iter()
                            .any(|(other_name, other_ty)| {
                                name == other_name && ty.is_type_identical(other_ty)
                            })
                    })
            }
            _ => false,
        }
    }

    /// Supertype matching is currently plain identity. Structural subtyping
    /// of structs would go here if it is ever needed.
    pub fn matches_or_is_super_type_of(&self, other: &Type) -> bool {
        self.is_type_identical(other)
    }

    pub fn validate_type_is_identical(&self, other: &Type) -> Result<()> {
        if self.is_type_identical(other) {
            Ok(())
        } else {
            Err(Error::TypeSystem(format!(
                "Type {} is not identical to type {}",
                self, other
            )))
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.borrow().kind {
            TypeKind::Unknown => write!(f, "unknown"),
            TypeKind::Object => write!(f, "object"),
            TypeKind::Atomic(kind) => write!(f, "{}", kind.keyword()),
            TypeKind::List(item) => write!(f, "[{}]", item),
            TypeKind::Struct(fields) => write!(
                f,
                "{{{}}}",
                fields
                    .iter()
                    .map(|(name, ty)| format!("{}: {}", name, ty))
                    .join(", ")
            ),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_nested_types() {
        let ty = Type::struct_of(vec![
            ("foo".to_string(), Type::list(Type::int())),
            ("bar".to_string(), Type::string()),
        ]);
        assert_eq!(ty.to_string(), "{foo: [int], bar: string}");
    }

    #[test]
    fn structural_identity() {
        let a = Type::list(Type::struct_of(vec![("x".to_string(), Type::int())]));
        let b = Type::list(Type::struct_of(vec![("x".to_string(), Type::int())]));
        assert!(a.is_type_identical(&b));
        assert!(!a.is_type_identical(&Type::list(Type::int())));
        assert!(!Type::int().is_type_identical(&Type::float()));
        assert!(!Type::unknown().is_type_identical(&Type::int()));
        assert!(Type::unknown().is_type_identical(&Type::unknown()));
    }

    #[test]
    fn field_order_does_not_affect_identity() {
        let a = Type::struct_of(vec![
            ("x".to_string(), Type::int()),
            ("y".to_string(), Type::string()),
        ]);
        let b = Type::struct_of(vec![
            ("y".to_string(), Type::string()),
            ("x".to_string(), Type::int()),
        ]);
        assert!(a.is_type_identical(&b));
    }

    #[test]
    fn explicit_names_are_part_of_identity() {
        let a = Type::struct_of(vec![("x".to_string(), Type::int())]);
        let b = Type::struct_of(vec![("x".to_string(), Type::int())]);
        a.set_type_name("Point").unwrap();
        assert!(!a.is_type_identical(&b));
        b.set_type_name("Point").unwrap();
        assert!(a.is_type_identical(&b));

        let external = Type::struct_of(vec![("x".to_string(), Type::int())]);
        external.set_external_type_name("SomeNativeStruct");
        assert!(!external.is_type_identical(&Type::struct_of(vec![(
            "x".to_string(),
            Type::int()
        )])));
    }

    #[test]
    fn validate_reports_both_types() {
        let err = Type::int()
            .validate_type_is_identical(&Type::string())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type system error: Type int is not identical to type string"
        );
    }
}
