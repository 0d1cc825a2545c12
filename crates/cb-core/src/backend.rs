use crate::error::{Error, Result};
use crate::scope::{File, Scope};
use crate::settings::Settings;
use crate::ty::Type;
use crate::value::Value;
use crate::var::Variable;

/// A target language renderer. The graph drives the rendering; a backend
/// only supplies the target syntax for each construct.
///
/// All methods that a target language may not support return a `Result`, so
/// a backend can answer with [`Error::Unimplemented`] instead of panicking.
pub trait Backend {
    fn settings(&self) -> &Settings;

    fn end_of_statement(&self) -> &str;

    fn build_file_header(&self, file: &File) -> String;

    /// An import statement pulling in one named dependency.
    fn build_dependency_import(&self, dependency: &str) -> String;

    /// Wraps the top-level statements of a file into whatever entry point
    /// the target language requires.
    fn build_main_function(&self, code: &str) -> String;

    /// A type definition statement for languages that declare types.
    /// Backends of dynamic languages return an empty string.
    fn build_type_definition(&self, ty: &Type) -> Result<String>;

    fn build_var_uninitialized_declaration(&self, var: &Variable) -> Result<String>;

    fn build_var_initialized_declaration(&self, var: &Variable, scope: &Scope) -> Result<String>;

    fn build_string_val(&self, val: &str) -> String;

    fn build_list_initializer(&self, items: &[Value], scope: &Scope) -> Result<String>;

    fn build_list_index_accessor(&self, index: &str) -> String;

    /// The loop header iterating over a list; the loop body is rendered by
    /// the caller.
    fn build_list_iterator(
        &self,
        path_to_list: &str,
        path_to_item: &str,
        path_to_index: Option<&str>,
    ) -> Result<String>;

    fn build_add_to_list(&self, list: &str, item: &str) -> Result<String>;

    fn build_merge_lists(&self, list: &str, merged: &str) -> Result<String>;

    fn build_struct_initializer(&self, fields: &[(String, Value)], scope: &Scope)
        -> Result<String>;

    fn build_struct_field_accessor(&self, field: &str) -> String;

    /// The expression referring to the current object inside a method.
    fn build_this(&self) -> Result<String>;

    /// The expression instantiating an object of the named class, or of the
    /// language's default object class when no name is given.
    fn build_new_object(&self, class_name: Option<&str>) -> Result<String>;

    /// The name a variable goes by in the generated code.
    fn var_name(&self, var: &Variable) -> Result<String> {
        var.name().ok_or_else(|| {
            Error::Construction(
                "Trying to compile a variable that is not given any name".to_string(),
            )
        })
    }

    /// The operator accessing a member of an object.
    fn member_accessor(&self) -> &str {
        "->"
    }

    fn build_assignment(&self, left: &str, right: &str) -> String {
        format!("{} = {}", left, right)
    }

    fn build_add_assignment(&self, left: &str, right: &str) -> String {
        format!("{} += {}", left, right)
    }

    fn build_subtract_assignment(&self, left: &str, right: &str) -> String {
        format!("{} -= {}", left, right)
    }

    fn build_this_field_access(&self, field: &str) -> Result<String> {
        Ok(format!("{}{}{}", self.build_this()?, self.member_accessor(), field))
    }

    /// A full variable declaration statement, with the trailing statement
    /// terminator for initialized variables.
    fn build_var_declaration_statement(&self, var: &Variable, scope: &Scope) -> Result<String> {
        if var.is_initialized() {
            Ok(format!(
                "{}{}",
                self.build_var_initialized_declaration(var, scope)?,
                self.end_of_statement()
            ))
        } else {
            self.build_var_uninitialized_declaration(var)
        }
    }
}

/// Renders the right side of an initialized variable declaration: the value
/// expression, followed by property assignments when the value is an object
/// that got dynamic properties.
pub fn build_var_initializer(
    var: &Variable,
    scope: &Scope,
    backend: &dyn Backend,
) -> Result<String> {
    let value = var.value().ok_or_else(|| {
        Error::Construction(
            "Trying to build an initializer for a variable that has no value".to_string(),
        )
    })?;
    let mut code = value.build(scope, backend)?;
    for prop in value.dynamic_props() {
        let prop_value = match prop.value() {
            Some(v) => v,
            None => continue,
        };
        let prop_name = prop.name().ok_or_else(|| {
            Error::Construction("An object property is not given any name".to_string())
        })?;
        code.push_str(backend.end_of_statement());
        code.push_str(&backend.settings().eol);
        let left = format!(
            "{}{}{}",
            backend.var_name(var)?,
            backend.member_accessor(),
            prop_name
        );
        code.push_str(&backend.build_assignment(&left, &prop_value.build(scope, backend)?));
    }
    Ok(code)
}
