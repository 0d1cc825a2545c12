use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::backend::Backend;
use crate::call::{ClassTarget, FnCall, FnCallResult, FunctionRef};
use crate::error::{Error, Result};
use crate::path::VarPath;
use crate::scope::Scope;
use crate::ty::{AtomicKind, Type, TypeKind};
use crate::var::Variable;

/// An atomic literal
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::Str(s.to_string())
    }
}

impl From<String> for Atom {
    fn from(s: String) -> Self {
        Atom::Str(s)
    }
}

impl From<i64> for Atom {
    fn from(i: i64) -> Self {
        Atom::Int(i)
    }
}

impl From<f64> for Atom {
    fn from(x: f64) -> Self {
        Atom::Float(x)
    }
}

impl From<bool> for Atom {
    fn from(b: bool) -> Self {
        Atom::Bool(b)
    }
}

/// Untyped input data for the plain-value factories. By construction it can
/// only hold plain data, never already-typed values.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<PlainValue>),
    Struct(Vec<(String, PlainValue)>),
}

impl PlainValue {
    fn kind_name(&self) -> &'static str {
        match self {
            PlainValue::Null => "NULL",
            PlainValue::Str(_) => "string",
            PlainValue::Int(_) => "int",
            PlainValue::Float(_) => "float",
            PlainValue::Bool(_) => "bool",
            PlainValue::List(_) | PlainValue::Struct(_) => "array",
        }
    }

    /// Determines the type of plain input data. Lists take the type of their
    /// first item; an empty list is ambiguous.
    pub fn determine_type(&self) -> Result<Type> {
        match self {
            PlainValue::Null => Err(Error::AmbiguousType(
                "NULL value given, cannot determine type. \
                 You have to manually set the type of this value"
                    .to_string(),
            )),
            PlainValue::Str(_) => Ok(Type::string()),
            PlainValue::Int(_) => Ok(Type::int()),
            PlainValue::Float(_) => Ok(Type::float()),
            PlainValue::Bool(_) => Ok(Type::boolean()),
            PlainValue::List(items) => match items.first() {
                None => Err(Error::AmbiguousType(
                    "An empty array value is given, cannot determine type. \
                     You will have to manually set the type for this value."
                        .to_string(),
                )),
                Some(first) => Ok(Type::list(first.determine_type()?)),
            },
            PlainValue::Struct(fields) => {
                let mut field_types = Vec::with_capacity(fields.len());
                for (name, item) in fields {
                    field_types.push((name.clone(), item.determine_type()?));
                }
                Ok(Type::struct_of(field_types))
            }
        }
    }
}

impl From<&str> for PlainValue {
    fn from(s: &str) -> Self {
        PlainValue::Str(s.to_string())
    }
}

impl From<i64> for PlainValue {
    fn from(i: i64) -> Self {
        PlainValue::Int(i)
    }
}

impl From<f64> for PlainValue {
    fn from(x: f64) -> Self {
        PlainValue::Float(x)
    }
}

impl From<bool> for PlainValue {
    fn from(b: bool) -> Self {
        PlainValue::Bool(b)
    }
}

/// Typed input for the container factories
pub enum ContainerValues {
    List(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

/// Where a value comes from. A value with a source is not a constant but a
/// reference to something else in the graph.
#[derive(Clone)]
pub enum Source {
    Variable(Variable),
    VarPath(VarPath),
    Value(Value),
    FnCallResult(FnCallResult),
    NewObject(Option<ClassTarget>),
    This,
    /// A field projected out of a foreign struct value
    StructField { from: Value, key: String },
}

impl Source {
    /// Foreign values come from outside the current expression: their
    /// contents are not known at build time, only their type is.
    pub fn is_foreign(&self) -> bool {
        matches!(
            self,
            Source::Variable(_) | Source::Value(_) | Source::FnCallResult(_)
        )
    }

    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        match self {
            Source::Variable(var) => scope.build_path_to_variable(var, backend),
            Source::VarPath(path) => path.build(scope, backend),
            Source::Value(value) => value.build(scope, backend),
            Source::FnCallResult(res) => res.call().build(scope, backend),
            Source::NewObject(class) => {
                let class_name = class.as_ref().map(ClassTarget::class_name);
                backend.build_new_object(class_name.as_deref())
            }
            Source::This => backend.build_this(),
            Source::StructField { from, key } => Ok(format!(
                "{}{}",
                from.build(scope, backend)?,
                backend.build_struct_field_accessor(key)
            )),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Payload {
    Atom(Atom),
    List(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

struct ObjectData {
    class: Option<ClassTarget>,
    dynamic_props: Vec<Variable>,
}

struct ValueInner {
    ty: Type,
    payload: Option<Payload>,
    source: Option<Source>,
    object: Option<ObjectData>,
}

/// A typed value node. Cheap to clone; clones share identity.
#[derive(Clone)]
pub struct Value(Rc<RefCell<ValueInner>>);

impl Value {
    pub(crate) fn from_parts(ty: Type, payload: Option<Payload>, source: Option<Source>) -> Value {
        Value(Rc::new(RefCell::new(ValueInner {
            ty,
            payload,
            source,
            object: None,
        })))
    }

    pub fn same(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn ty(&self) -> Type {
        self.0.borrow().ty.clone()
    }

    pub fn set_type(&self, ty: &Type) {
        self.0.borrow_mut().ty = ty.clone();
    }

    pub fn source(&self) -> Option<Source> {
        self.0.borrow().source.clone()
    }

    pub(crate) fn payload_clone(&self) -> Option<Payload> {
        self.0.borrow().payload.clone()
    }

    // ------------------------------------------------------------------
    // Construction

    pub fn string(s: &str) -> Value {
        Value::from_parts(
            Type::string(),
            Some(Payload::Atom(Atom::Str(s.to_string()))),
            None,
        )
    }

    pub fn int(i: i64) -> Value {
        Value::from_parts(Type::int(), Some(Payload::Atom(Atom::Int(i))), None)
    }

    pub fn float(x: f64) -> Value {
        Value::from_parts(Type::float(), Some(Payload::Atom(Atom::Float(x))), None)
    }

    pub fn boolean(b: bool) -> Value {
        Value::from_parts(Type::boolean(), Some(Payload::Atom(Atom::Bool(b))), None)
    }

    /// A value of the given type with no payload; it renders as the target
    /// language's null literal.
    pub fn null_of(ty: &Type) -> Value {
        Value::from_parts(ty.clone(), None, None)
    }

    /// An empty value of the given atomic or container type.
    pub fn of_type(ty: &Type) -> Result<Value> {
        match ty.kind() {
            TypeKind::Atomic(_) | TypeKind::List(_) | TypeKind::Struct(_) => {
                Ok(Value::null_of(ty))
            }
            _ => Err(Error::UnexpectedType(format!("Unknown type: {}", ty))),
        }
    }

    /// An atomic value, coercing the input to the given atomic type the way
    /// literal input is expected to coerce (e.g. `"5"` to an int type).
    pub fn atomic(val: impl Into<Atom>, ty: &Type) -> Result<Value> {
        let kind = ty
            .atomic_kind()
            .ok_or_else(|| Error::WrongType(format!("type {} is not atomic", ty)))?;
        let atom = coerce_atom(val.into(), kind)?;
        Ok(Value::from_parts(
            ty.clone(),
            Some(Payload::Atom(atom)),
            None,
        ))
    }

    pub fn empty_list(ty: &Type) -> Result<Value> {
        if !ty.is_list() {
            return Err(Error::WrongType(format!("type {} is not a list", ty)));
        }
        Ok(Value::from_parts(
            ty.clone(),
            Some(Payload::List(Vec::new())),
            None,
        ))
    }

    /// A list value whose type is inferred from the first item. All items
    /// must share the first item's type.
    pub fn list_from_values(values: Vec<Value>) -> Result<Value> {
        let first = values.first().ok_or_else(|| {
            Error::AmbiguousType(
                "An empty array value is given, cannot determine type. \
                 You will have to manually set the type for this value."
                    .to_string(),
            )
        })?;
        let ty = Type::list(first.ty());
        Value::container_from_values(ContainerValues::List(values.clone()), &ty)
    }

    /// A struct value whose type is built from the field value types.
    pub fn struct_from_values(fields: Vec<(String, Value)>) -> Value {
        let ty = Type::struct_of(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), value.ty()))
                .collect(),
        );
        Value::from_parts(ty, Some(Payload::Struct(fields)), None)
    }

    /// A container value from already-typed inner values, validated against
    /// the given container type.
    pub fn container_from_values(values: ContainerValues, ty: &Type) -> Result<Value> {
        match (values, ty.kind()) {
            (ContainerValues::List(items), TypeKind::List(item_ty)) => {
                for item in &items {
                    if !item.ty().is_type_identical(&item_ty) {
                        return Err(Error::TypeSystem(format!(
                            "List item is of type {}, expected type: {}",
                            item.ty(),
                            item_ty
                        )));
                    }
                }
                Ok(Value::from_parts(
                    ty.clone(),
                    Some(Payload::List(items)),
                    None,
                ))
            }
            (ContainerValues::Struct(fields), TypeKind::Struct(field_types)) => {
                for (name, field_ty) in &field_types {
                    if !fields.iter().any(|(field, _)| field == name) {
                        return Err(Error::TypeSystem(format!(
                            "No value was given for struct field \"{}\". \
                             This struct expects a value of type {} for this field.",
                            name, field_ty
                        )));
                    }
                }
                for (name, value) in &fields {
                    let expected = field_types
                        .iter()
                        .find(|(field, _)| field == name)
                        .map(|(_, ty)| ty)
                        .ok_or_else(|| {
                            Error::TypeSystem(format!(
                                "An unexpected value was set for struct field \"{}\"",
                                name
                            ))
                        })?;
                    if !value.ty().is_type_identical(expected) {
                        return Err(Error::TypeSystem(format!(
                            "Structure item for field \"{}\" is of type {}, expected type: {}",
                            name,
                            value.ty(),
                            expected
                        )));
                    }
                }
                Ok(Value::from_parts(
                    ty.clone(),
                    Some(Payload::Struct(fields)),
                    None,
                ))
            }
            (_, _) => Err(Error::UnexpectedType(format!(
                "Could not create a container value for type {}, \
                 probably the type is not a container",
                ty
            ))),
        }
    }

    /// A container value from plain input data, validated against the given
    /// container type.
    pub fn container_from_plain(values: &PlainValue, ty: &Type) -> Result<Value> {
        if !ty.is_list() && !ty.is_struct() {
            return Err(Error::UnexpectedType(format!(
                "Could not create a container value for type {}, \
                 probably the type is not a container",
                ty
            )));
        }
        match values {
            PlainValue::Null => Ok(Value::null_of(ty)),
            PlainValue::List(items) if ty.is_list() => {
                let item_ty = ty.item_type()?;
                let mut inner = Vec::with_capacity(items.len());
                for item in items {
                    inner.push(Value::inner_from_plain(item, &item_ty)?);
                }
                Value::container_from_values(ContainerValues::List(inner), ty)
            }
            PlainValue::Struct(fields) if ty.is_struct() => {
                let mut inner = Vec::with_capacity(fields.len());
                for (name, item) in fields {
                    let field_ty = ty.field_type(name).ok_or_else(|| {
                        Error::TypeSystem(format!(
                            "An unexpected value was set for struct field \"{}\"",
                            name
                        ))
                    })?;
                    inner.push((name.clone(), Value::inner_from_plain(item, &field_ty)?));
                }
                Value::container_from_values(ContainerValues::Struct(inner), ty)
            }
            PlainValue::List(_) | PlainValue::Struct(_) => Err(Error::TypeSystem(format!(
                "The given input data does not have the shape of a {}",
                ty
            ))),
            other => Err(Error::TypeSystem(format!(
                "Expected an array, but a {} was encountered instead",
                other.kind_name()
            ))),
        }
    }

    fn inner_from_plain(plain: &PlainValue, ty: &Type) -> Result<Value> {
        if ty.is_atomic() {
            match plain {
                PlainValue::List(_) | PlainValue::Struct(_) => Err(Error::TypeSystem(format!(
                    "Expected an {}, but an array was encountered instead",
                    ty
                ))),
                PlainValue::Null => Ok(Value::null_of(ty)),
                PlainValue::Str(s) => Value::atomic(s.as_str(), ty),
                PlainValue::Int(i) => Value::atomic(*i, ty),
                PlainValue::Float(x) => Value::atomic(*x, ty),
                PlainValue::Bool(b) => Value::atomic(*b, ty),
            }
        } else {
            Value::container_from_plain(plain, ty)
        }
    }

    /// A typed value from plain input data, with the type inferred.
    pub fn from_plain(plain: &PlainValue) -> Result<Value> {
        let ty = plain.determine_type()?;
        Value::inner_from_plain(plain, &ty)
    }

    /// A fresh object value, optionally of a known class.
    pub fn new_object(class: Option<ClassTarget>) -> Value {
        let value = Value::from_parts(
            Type::object(),
            None,
            Some(Source::NewObject(class.clone())),
        );
        value.0.borrow_mut().object = Some(ObjectData {
            class,
            dynamic_props: Vec::new(),
        });
        value
    }

    /// The object value a class method refers to as itself.
    pub(crate) fn this_object(class: Option<ClassTarget>) -> Value {
        let value = Value::from_parts(Type::object(), None, Some(Source::This));
        value.0.borrow_mut().object = Some(ObjectData {
            class,
            dynamic_props: Vec::new(),
        });
        value
    }

    // ------------------------------------------------------------------
    // Derived values

    /// A new value of the same type with no payload.
    pub fn new_val(&self) -> Value {
        Value::from_parts(self.ty(), None, None)
    }

    /// A new value that refers to this one.
    pub fn assign_to_new_value(&self) -> Value {
        Value::from_parts(self.ty(), None, Some(Source::Value(self.clone())))
    }

    /// A new unnamed immutable variable holding this value.
    pub fn assign_to_new_var(&self) -> Variable {
        Variable::with_value(self)
    }

    /// A new unnamed mutable variable with this value as its initial value.
    pub fn assign_to_new_mut_var(&self) -> Variable {
        Variable::with_initial(self)
    }

    // ------------------------------------------------------------------
    // Struct values

    pub fn struct_fields(&self) -> Result<Vec<(String, Value)>> {
        match self.payload_clone() {
            Some(Payload::Struct(fields)) => Ok(fields),
            _ => Err(Error::TypeSystem(
                "this value does not hold struct fields".to_string(),
            )),
        }
    }

    pub fn items(&self) -> Result<Vec<Value>> {
        match self.payload_clone() {
            Some(Payload::List(items)) => Ok(items),
            _ => Err(Error::TypeSystem(
                "this value does not hold list items".to_string(),
            )),
        }
    }

    /// Field access on a struct value. Foreign values produce a typed
    /// projection; local values return the stored field value.
    pub fn value_for_key(&self, key: &str) -> Result<Value> {
        let foreign = self.source().map_or(false, |s| s.is_foreign());
        if foreign {
            let field_ty = self.ty().field_type(key).ok_or_else(|| {
                Error::TypeSystem(format!(
                    "The type of this struct value does not have a value set for key '{}'",
                    key
                ))
            })?;
            return Ok(Value::from_parts(
                field_ty,
                None,
                Some(Source::StructField {
                    from: self.clone(),
                    key: key.to_string(),
                }),
            ));
        }
        match self.payload_clone() {
            Some(Payload::Struct(fields)) => fields
                .iter()
                .find(|(field, _)| field == key)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    Error::Construction(format!(
                        "This struct value does not have a value set for key '{}'",
                        key
                    ))
                }),
            _ => Err(Error::Construction(format!(
                "This struct value does not have a value set for key '{}'",
                key
            ))),
        }
    }

    /// Adds a field to a struct value, extending the struct type with the
    /// value's type. The field must not exist yet.
    pub fn set_value_for_key(&self, key: &str, value: &Value) -> Result<()> {
        let ty = self.ty();
        if ty.has_field(key) {
            return Err(Error::TypeSystem(format!(
                "This struct value already has a value set for key '{}'",
                key
            )));
        }
        ty.add_field(key, value.ty())?;
        let mut inner = self.0.borrow_mut();
        match &mut inner.payload {
            Some(Payload::Struct(fields)) => fields.push((key.to_string(), value.clone())),
            None => inner.payload = Some(Payload::Struct(vec![(key.to_string(), value.clone())])),
            _ => {
                return Err(Error::TypeSystem(
                    "a struct value cannot hold a non-struct payload".to_string(),
                ))
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Object values

    pub fn is_object_value(&self) -> bool {
        self.0.borrow().object.is_some()
    }

    pub fn class_target(&self) -> Option<ClassTarget> {
        self.0
            .borrow()
            .object
            .as_ref()
            .and_then(|obj| obj.class.clone())
    }

    /// Casts this value to an object value, keeping type, payload and source.
    pub fn to_object(&self) -> Value {
        if self.is_object_value() {
            return self.clone();
        }
        let value = Value::from_parts(self.ty(), self.payload_clone(), self.source());
        value.0.borrow_mut().object = Some(ObjectData {
            class: None,
            dynamic_props: Vec::new(),
        });
        value
    }

    /// Declares a dynamically assigned property on an object value.
    pub fn dynamic_prop(&self, name: &str) -> Result<Variable> {
        let mut inner = self.0.borrow_mut();
        let object = inner.object.as_mut().ok_or_else(|| {
            Error::Construction("this value is not an object value".to_string())
        })?;
        let prop = Variable::named(name);
        object.dynamic_props.push(prop.clone());
        Ok(prop)
    }

    pub fn dynamic_props(&self) -> Vec<Variable> {
        self.0
            .borrow()
            .object
            .as_ref()
            .map(|obj| obj.dynamic_props.clone())
            .unwrap_or_default()
    }

    /// A method call on this object value.
    pub fn call_fn(&self, name: &str, params: Vec<Arg>) -> Result<FnCall> {
        if !self.is_object_value() {
            return Err(Error::Construction(
                "this value is not an object value".to_string(),
            ));
        }
        Ok(FnCall::on_object(
            self.clone(),
            FunctionRef::Name(name.to_string()),
            params,
        ))
    }

    // ------------------------------------------------------------------
    // Rendering

    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        if let Some(source) = self.source() {
            return source.build(scope, backend);
        }
        match self.payload_clone() {
            None => Ok("NULL".to_string()),
            Some(Payload::Atom(atom)) => Arg::from(atom).build(scope, backend),
            Some(Payload::List(items)) => backend.build_list_initializer(&items, scope),
            Some(Payload::Struct(fields)) => backend.build_struct_initializer(&fields, scope),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.ty())
    }
}

fn coerce_atom(atom: Atom, kind: AtomicKind) -> Result<Atom> {
    fn cast_err() -> Error {
        Error::UnexpectedType("Don't know how to correctly typecast this value".to_string())
    }
    Ok(match (atom, kind) {
        (Atom::Str(s), AtomicKind::Str) => Atom::Str(s),
        (Atom::Str(s), AtomicKind::Int) => Atom::Int(s.trim().parse().map_err(|_| cast_err())?),
        (Atom::Str(s), AtomicKind::Float) => {
            Atom::Float(s.trim().parse().map_err(|_| cast_err())?)
        }
        (Atom::Int(i), AtomicKind::Int) => Atom::Int(i),
        (Atom::Int(i), AtomicKind::Float) => Atom::Float(i as f64),
        (Atom::Int(i), AtomicKind::Str) => Atom::Str(i.to_string()),
        (Atom::Float(x), AtomicKind::Float) => Atom::Float(x),
        (Atom::Float(x), AtomicKind::Int) => Atom::Int(x as i64),
        (Atom::Float(x), AtomicKind::Str) => Atom::Str(x.to_string()),
        (Atom::Bool(b), AtomicKind::Bool) => Atom::Bool(b),
        (_, _) => return Err(cast_err()),
    })
}

/// A polymorphic argument: plain data, typed values, variables or call
/// results. Used for call parameters, predicates and return values.
#[derive(Clone)]
pub enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Arg>),
    Struct(Vec<(String, Arg)>),
    Value(Value),
    Var(Variable),
    CallResult(FnCallResult),
}

impl Arg {
    /// Converts the argument into a typed value, inferring types of plain
    /// data and taking reference values of variables.
    pub fn to_value(&self) -> Result<Value> {
        match self {
            Arg::Null => Err(Error::AmbiguousType(
                "NULL value given, cannot determine type. \
                 You have to manually set the type of this value"
                    .to_string(),
            )),
            Arg::Bool(b) => Ok(Value::boolean(*b)),
            Arg::Int(i) => Ok(Value::int(*i)),
            Arg::Float(x) => Ok(Value::float(*x)),
            Arg::Str(s) => Ok(Value::string(s)),
            Arg::Value(value) => Ok(value.clone()),
            Arg::Var(var) => Ok(var.ref_val()),
            Arg::CallResult(res) => Ok(res.value()),
            Arg::List(items) => {
                let values = items
                    .iter()
                    .map(Arg::to_value)
                    .collect::<Result<Vec<_>>>()?;
                Value::list_from_values(values)
            }
            Arg::Struct(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, item) in fields {
                    values.push((name.clone(), item.to_value()?));
                }
                Ok(Value::struct_from_values(values))
            }
        }
    }

    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        match self {
            Arg::Null => Ok("NULL".to_string()),
            Arg::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Arg::Int(i) => Ok(i.to_string()),
            Arg::Float(x) => Ok(x.to_string()),
            Arg::Str(s) => Ok(backend.build_string_val(s)),
            Arg::Value(value) => value.build(scope, backend),
            Arg::Var(var) => scope.build_path_to_variable(var, backend),
            Arg::CallResult(res) => res.call().build(scope, backend),
            Arg::List(_) | Arg::Struct(_) => self.to_value()?.build(scope, backend),
        }
    }
}

impl From<Atom> for Arg {
    fn from(atom: Atom) -> Self {
        match atom {
            Atom::Str(s) => Arg::Str(s),
            Atom::Int(i) => Arg::Int(i),
            Atom::Float(x) => Arg::Float(x),
            Atom::Bool(b) => Arg::Bool(b),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_string())
    }
}

impl From<i64> for Arg {
    fn from(i: i64) -> Self {
        Arg::Int(i)
    }
}

impl From<f64> for Arg {
    fn from(x: f64) -> Self {
        Arg::Float(x)
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Bool(b)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&Value> for Arg {
    fn from(value: &Value) -> Self {
        Arg::Value(value.clone())
    }
}

impl From<Variable> for Arg {
    fn from(var: Variable) -> Self {
        Arg::Var(var)
    }
}

impl From<&Variable> for Arg {
    fn from(var: &Variable) -> Self {
        Arg::Var(var.clone())
    }
}

impl From<FnCallResult> for Arg {
    fn from(res: FnCallResult) -> Self {
        Arg::CallResult(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_type() -> Type {
        Type::struct_of(vec![
            ("x".to_string(), Type::int()),
            ("y".to_string(), Type::int()),
        ])
    }

    #[test]
    fn atomic_coercion_casts_numeric_strings() {
        let v = Value::atomic("5", &Type::int()).unwrap();
        assert!(v.ty().is_type_identical(&Type::int()));
        assert!(Value::atomic("abc", &Type::int()).is_err());
        assert!(Value::atomic("1.5", &Type::float()).is_ok());
    }

    #[test]
    fn empty_list_inference_is_ambiguous() {
        let err = PlainValue::List(vec![]).determine_type().unwrap_err();
        assert!(matches!(err, Error::AmbiguousType(_)));
    }

    #[test]
    fn plain_struct_factory_validates_fields() {
        let ty = point_type();

        let ok = Value::container_from_plain(
            &PlainValue::Struct(vec![
                ("x".to_string(), PlainValue::Int(1)),
                ("y".to_string(), PlainValue::Int(2)),
            ]),
            &ty,
        );
        assert!(ok.is_ok());

        let missing = Value::container_from_plain(
            &PlainValue::Struct(vec![("x".to_string(), PlainValue::Int(1))]),
            &ty,
        )
        .unwrap_err();
        assert!(missing
            .to_string()
            .contains("No value was given for struct field \"y\""));

        let extra = Value::container_from_plain(
            &PlainValue::Struct(vec![
                ("x".to_string(), PlainValue::Int(1)),
                ("y".to_string(), PlainValue::Int(2)),
                ("z".to_string(), PlainValue::Int(3)),
            ]),
            &ty,
        )
        .unwrap_err();
        assert!(extra
            .to_string()
            .contains("An unexpected value was set for struct field \"z\""));

        let shape = Value::container_from_plain(
            &PlainValue::Struct(vec![
                ("x".to_string(), PlainValue::List(vec![PlainValue::Int(1)])),
                ("y".to_string(), PlainValue::Int(2)),
            ]),
            &ty,
        )
        .unwrap_err();
        assert!(shape
            .to_string()
            .contains("Expected an int, but an array was encountered instead"));
    }

    #[test]
    fn typed_list_factory_validates_item_types() {
        let ty = Type::list(Type::int());
        let err = Value::container_from_values(
            ContainerValues::List(vec![Value::int(1), Value::string("x")]),
            &ty,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type system error: List item is of type string, expected type: int"
        );
    }

    #[test]
    fn container_factory_rejects_non_container_types() {
        let err =
            Value::container_from_plain(&PlainValue::List(vec![PlainValue::Int(1)]), &Type::int())
                .unwrap_err();
        assert!(matches!(err, Error::UnexpectedType(_)));
    }

    #[test]
    fn foreign_struct_projection_is_typed() {
        let var = Variable::named("payload");
        var.set_super_global(true);
        let foreign = Value::from_parts(point_type(), None, Some(Source::Variable(var)));
        let x = foreign.value_for_key("x").unwrap();
        assert!(x.ty().is_type_identical(&Type::int()));
        assert!(matches!(x.source(), Some(Source::StructField { .. })));

        let err = foreign.value_for_key("nope").unwrap_err();
        assert!(err
            .to_string()
            .contains("does not have a value set for key 'nope'"));
    }

    #[test]
    fn derived_values_share_the_type_but_not_the_payload() {
        let original = Value::int(7);

        let blank = original.new_val();
        assert!(blank.ty().is_type_identical(&Type::int()));
        assert!(blank.source().is_none());

        let reference = original.assign_to_new_value();
        assert!(reference.ty().is_type_identical(&Type::int()));
        match reference.source() {
            Some(Source::Value(inner)) => assert!(inner.same(&original)),
            _ => panic!("expected a value source"),
        }
    }

    #[test]
    fn set_value_for_key_extends_the_type_once() {
        let value = Value::struct_from_values(vec![("x".to_string(), Value::int(1))]);
        value
            .set_value_for_key("y", &Value::string("two"))
            .unwrap();
        assert!(value.ty().has_field("y"));
        assert!(value.set_value_for_key("y", &Value::int(3)).is_err());
    }
}
