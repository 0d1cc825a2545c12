//! A statically typed intermediate representation for imperative code,
//! rendered to text by pluggable backends.
//!
//! The graph is built out of scopes (files, functions, classes, blocks and
//! loops), variables, values and types. Naming is deferred: items may stay
//! unnamed until they become reachable from a naming scope, at which point
//! they get deterministic generated names and colliding names get numeric
//! suffixes. Rendering never mutates the graph semantics; a [`Backend`]
//! only supplies target syntax.

#[macro_use]
pub mod macros;

pub mod assign;
pub mod backend;
pub mod call;
pub mod error;
pub mod path;
pub mod scope;
pub mod selector;
pub mod settings;
pub mod ty;
pub mod value;
pub mod var;

pub use tracing;

pub use assign::{AssignKind, Assignment};
pub use backend::{build_var_initializer, Backend};
pub use call::{ClassRef, ClassTarget, FnCall, FnCallResult};
pub use error::{Error, Result};
pub use path::{PathSeg, VarPath};
pub use scope::{
    Block, BracesMode, Class, File, Function, If, ListIterator, Parameter, Predicate, Scope,
    WeakScope,
};
pub use selector::Selector;
pub use settings::{ReattachPolicy, Settings};
pub use ty::{AtomicKind, Type, TypeKind};
pub use value::{Arg, Atom, ContainerValues, PlainValue, Source, Value};
pub use var::Variable;
