//! C rendering backend.
//!
//! C is statically typed, so declarations carry a type prefix and named
//! struct types are emitted as typedefs. Top-level statements get wrapped
//! into `int main()`. List iteration and object support are not implemented
//! yet; the affected methods answer with an error instead.

use cb_core::{
    build_var_initializer, AtomicKind, Backend, Error, File, Result, Scope, Settings, Type,
    TypeKind, Value, Variable,
};

pub struct CBackend {
    settings: Settings,
}

impl CBackend {
    pub fn new() -> CBackend {
        CBackend {
            settings: Settings::default(),
        }
    }

    pub fn with_settings(settings: Settings) -> CBackend {
        CBackend { settings }
    }

    /// The declaration left side: `const <type> <name>`, with the array
    /// suffix after the name for lists of unnamed type.
    fn build_var_declaration_with_type(&self, var: &Variable) -> Result<String> {
        let name = self.var_name(var)?;
        let ty = var.ty()?;
        let (prefix, suffix) = match ty.type_name() {
            Some(type_name) => (type_name, ""),
            None => match ty.kind() {
                TypeKind::List(item) => (self.build_type(&item)?, "[]"),
                TypeKind::Struct(_) | TypeKind::Atomic(_) => (self.build_type(&ty)?, ""),
                _ => {
                    return Err(Error::UnexpectedType(format!(
                        "cannot declare a variable of type {}",
                        ty
                    )))
                }
            },
        };
        Ok(format!("const {} {}{}", prefix, name, suffix))
    }

    fn build_type(&self, ty: &Type) -> Result<String> {
        if let Some(name) = ty.type_name() {
            return Ok(name);
        }
        match ty.kind() {
            TypeKind::List(item) => Ok(format!("{}*", self.build_type(&item)?)),
            TypeKind::Atomic(AtomicKind::Str) => Ok("char*".to_string()),
            TypeKind::Atomic(AtomicKind::Int) => Ok("int".to_string()),
            TypeKind::Atomic(AtomicKind::Float) => Ok("double".to_string()),
            TypeKind::Atomic(AtomicKind::Bool) => Ok("bool".to_string()),
            TypeKind::Struct(_) => Err(Error::Unimplemented(
                "a struct type can only be rendered through its typedef name".to_string(),
            )),
            _ => Err(Error::UnexpectedType(format!("Unknown type: {}", ty))),
        }
    }
}

impl Default for CBackend {
    fn default() -> Self {
        CBackend::new()
    }
}

impl Backend for CBackend {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn end_of_statement(&self) -> &str {
        ";"
    }

    fn build_file_header(&self, _file: &File) -> String {
        String::new()
    }

    fn build_dependency_import(&self, dependency: &str) -> String {
        format!("#include {}", dependency)
    }

    fn build_main_function(&self, code: &str) -> String {
        let eol = &self.settings.eol;
        let body = format!("{}{}{}return 0;", code, eol, eol);
        [
            "int main()".to_string(),
            "{".to_string(),
            self.settings.indent(1, &body),
            "}".to_string(),
        ]
        .join(eol)
    }

    fn build_type_definition(&self, ty: &Type) -> Result<String> {
        if !ty.has_to_be_declared() || !ty.is_struct() {
            return Ok(String::new());
        }
        let name = ty.scope_name().ok_or_else(|| {
            Error::Construction("Trying to declare a type that has no name".to_string())
        })?;
        let eol = &self.settings.eol;
        let mut code = format!("typedef struct _{} {{{}", name, eol);
        for (field, field_ty) in ty.fields()? {
            let line = format!("{} {};", self.build_type(&field_ty)?, field);
            code.push_str(&self.settings.indent(1, &line));
            code.push_str(eol);
        }
        code.push_str(&format!("}} {}", name));
        Ok(code)
    }

    fn build_var_uninitialized_declaration(&self, var: &Variable) -> Result<String> {
        self.build_var_declaration_with_type(var)
    }

    fn build_var_initialized_declaration(&self, var: &Variable, scope: &Scope) -> Result<String> {
        Ok(self.build_assignment(
            &self.build_var_declaration_with_type(var)?,
            &build_var_initializer(var, scope, self)?,
        ))
    }

    fn build_string_val(&self, val: &str) -> String {
        format!("\"{}\"", val.replace('"', "\\\""))
    }

    fn build_list_initializer(&self, items: &[Value], scope: &Scope) -> Result<String> {
        let eol = &self.settings.eol;
        let mut code = format!("{{{}", eol);
        for item in items {
            let item_code = format!("{},{}", item.build(scope, self)?, eol);
            code.push_str(&self.settings.indent(1, &item_code));
        }
        code.push('}');
        Ok(code)
    }

    fn build_list_index_accessor(&self, index: &str) -> String {
        format!("[{}]", index)
    }

    fn build_list_iterator(
        &self,
        _path_to_list: &str,
        _path_to_item: &str,
        _path_to_index: Option<&str>,
    ) -> Result<String> {
        Err(Error::Unimplemented(
            "list iteration is not implemented for C yet".to_string(),
        ))
    }

    fn build_add_to_list(&self, _list: &str, _item: &str) -> Result<String> {
        Err(Error::Unimplemented(
            "list append is not implemented for C yet".to_string(),
        ))
    }

    fn build_merge_lists(&self, _list: &str, _merged: &str) -> Result<String> {
        Err(Error::Unimplemented(
            "list merging is not implemented for C yet".to_string(),
        ))
    }

    fn build_struct_initializer(
        &self,
        fields: &[(String, Value)],
        scope: &Scope,
    ) -> Result<String> {
        let eol = &self.settings.eol;
        let mut code = format!("{{{}", eol);
        for (key, value) in fields {
            let field_code = format!(".{} = {},{}", key, value.build(scope, self)?, eol);
            code.push_str(&self.settings.indent(1, &field_code));
        }
        code.push('}');
        Ok(code)
    }

    fn build_struct_field_accessor(&self, field: &str) -> String {
        format!(".{}", field)
    }

    fn build_this(&self) -> Result<String> {
        Err(Error::Unimplemented(
            "objects are not implemented for C yet".to_string(),
        ))
    }

    fn build_new_object(&self, _class_name: Option<&str>) -> Result<String> {
        Err(Error::Unimplemented(
            "objects are not implemented for C yet".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_values_escape_double_quotes() {
        let backend = CBackend::new();
        assert_eq!(backend.build_string_val("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn unnamed_struct_types_cannot_be_rendered_inline() {
        let backend = CBackend::new();
        let ty = Type::struct_of(vec![("x".to_string(), Type::int())]);
        let var = Value::of_type(&ty).unwrap().assign_to_new_var();
        var.set_name("point").unwrap();
        let err = backend.build_var_uninitialized_declaration(&var).unwrap_err();
        assert!(matches!(err, Error::Unimplemented(_)));
    }

    #[test]
    fn iteration_is_not_supported() {
        let backend = CBackend::new();
        let err = backend.build_list_iterator("list", "item", None).unwrap_err();
        assert!(matches!(err, Error::Unimplemented(_)));
        assert!(matches!(
            backend.build_this().unwrap_err(),
            Error::Unimplemented(_)
        ));
    }

    #[test]
    fn object_instantiation_is_not_supported() {
        let backend = CBackend::new();
        assert!(matches!(
            backend.build_new_object(Some("Point")).unwrap_err(),
            Error::Unimplemented(_)
        ));
        assert!(matches!(
            backend.build_new_object(None).unwrap_err(),
            Error::Unimplemented(_)
        ));
    }
}
