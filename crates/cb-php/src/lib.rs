//! PHP rendering backend.
//!
//! PHP needs no entry point wrapper (top-level statements are the program)
//! and no type definitions: structural types all render as plain arrays,
//! which keeps the backend simple while type safety is still guaranteed by
//! the graph itself. Perhaps later structs should use objects (StdClass)
//! instead.

use cb_core::{
    build_var_initializer, Backend, Error, File, Result, Scope, Settings, Type, Value, Variable,
};

pub struct PhpBackend {
    settings: Settings,
}

impl PhpBackend {
    pub fn new() -> PhpBackend {
        PhpBackend {
            settings: Settings::default(),
        }
    }

    pub fn with_settings(settings: Settings) -> PhpBackend {
        PhpBackend { settings }
    }
}

impl Default for PhpBackend {
    fn default() -> Self {
        PhpBackend::new()
    }
}

impl Backend for PhpBackend {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn end_of_statement(&self) -> &str {
        ";"
    }

    fn build_file_header(&self, _file: &File) -> String {
        format!("<?php{0}{0}", self.settings.eol)
    }

    fn build_dependency_import(&self, dependency: &str) -> String {
        format!("require_once '{}';", dependency)
    }

    fn build_main_function(&self, code: &str) -> String {
        code.to_string()
    }

    fn build_type_definition(&self, _ty: &Type) -> Result<String> {
        Ok(String::new())
    }

    fn build_var_uninitialized_declaration(&self, var: &Variable) -> Result<String> {
        Ok(format!("//{}", self.var_name(var)?))
    }

    fn build_var_initialized_declaration(&self, var: &Variable, scope: &Scope) -> Result<String> {
        Ok(self.build_assignment(
            &self.var_name(var)?,
            &build_var_initializer(var, scope, self)?,
        ))
    }

    fn build_string_val(&self, val: &str) -> String {
        format!("'{}'", val.replace('\'', "\\'"))
    }

    fn build_list_initializer(&self, items: &[Value], scope: &Scope) -> Result<String> {
        let eol = &self.settings.eol;
        let mut code = String::from("Array(");
        if !items.is_empty() {
            code.push_str(eol);
            for item in items {
                let item_code = format!("{},{}", item.build(scope, self)?, eol);
                code.push_str(&self.settings.indent(1, &item_code));
            }
        }
        code.push(')');
        Ok(code)
    }

    fn build_list_index_accessor(&self, index: &str) -> String {
        format!("[{}]", index)
    }

    fn build_list_iterator(
        &self,
        path_to_list: &str,
        path_to_item: &str,
        path_to_index: Option<&str>,
    ) -> Result<String> {
        let index = match path_to_index {
            Some(index) => format!("{} => ", index),
            None => String::new(),
        };
        Ok(format!(
            "foreach ({} as {}{})",
            path_to_list, index, path_to_item
        ))
    }

    fn build_add_to_list(&self, list: &str, item: &str) -> Result<String> {
        Ok(self.build_assignment(&format!("{}[]", list), item))
    }

    fn build_merge_lists(&self, list: &str, merged: &str) -> Result<String> {
        Ok(self.build_assignment(list, &format!("array_merge({}, {})", list, merged)))
    }

    fn build_struct_initializer(
        &self,
        fields: &[(String, Value)],
        scope: &Scope,
    ) -> Result<String> {
        let eol = &self.settings.eol;
        let mut code = format!("Array({}", eol);
        for (key, value) in fields {
            // PHP coerces numeric-string array keys to ints, so they render
            // without quotes
            let key_code = if key.parse::<i64>().is_ok() {
                key.clone()
            } else {
                self.build_string_val(key)
            };
            let field_code = format!("{} => {},{}", key_code, value.build(scope, self)?, eol);
            code.push_str(&self.settings.indent(1, &field_code));
        }
        code.push(')');
        Ok(code)
    }

    fn build_struct_field_accessor(&self, field: &str) -> String {
        format!("['{}']", field)
    }

    fn build_this(&self) -> Result<String> {
        Ok("$this".to_string())
    }

    fn build_new_object(&self, class_name: Option<&str>) -> Result<String> {
        Ok(format!("new {}()", class_name.unwrap_or("StdClass")))
    }

    fn var_name(&self, var: &Variable) -> Result<String> {
        let name = var.name().ok_or_else(|| {
            Error::Construction(
                "Trying to compile a variable that is not given any name".to_string(),
            )
        })?;
        Ok(format!("${}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_values_escape_single_quotes() {
        let backend = PhpBackend::new();
        assert_eq!(
            backend.build_string_val("String with 'quoted text'"),
            "'String with \\'quoted text\\''"
        );
    }

    #[test]
    fn numeric_struct_keys_render_unquoted() {
        let backend = PhpBackend::new();
        let block = cb_core::Block::naming();
        let fields = vec![
            ("0".to_string(), Value::string("a")),
            ("key".to_string(), Value::int(1)),
        ];
        let code = backend
            .build_struct_initializer(&fields, block.scope())
            .unwrap();
        assert_eq!(code, "Array(\n    0 => 'a',\n    'key' => 1,\n)");
    }

    #[test]
    fn foreach_renders_the_index_only_when_present() {
        let backend = PhpBackend::new();
        assert_eq!(
            backend.build_list_iterator("$list", "$item", None).unwrap(),
            "foreach ($list as $item)"
        );
        assert_eq!(
            backend
                .build_list_iterator("$list", "$item", Some("$i"))
                .unwrap(),
            "foreach ($list as $i => $item)"
        );
    }
}
