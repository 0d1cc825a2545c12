use std::ops::Deref;

use crate::backend::Backend;
use crate::error::Result;

use super::{BlockData, BracesMode, Class, FileData, Scope, ScopeKind};

/// A source file: the top-level scope. Holds dependencies, type
/// definitions, functions, classes and the main block of statements.
#[derive(Clone)]
pub struct File(pub(crate) Scope);

impl File {
    pub fn new() -> File {
        File(Scope::new_kind(
            ScopeKind::File(FileData {
                name: None,
                classes: Vec::new(),
            }),
            Some(BlockData::new(BracesMode::Never)),
        ))
    }

    pub fn named(name: &str) -> File {
        let file = File::new();
        file.with_data(|data| data.name = Some(name.to_string()));
        file
    }

    fn with_data<R>(&self, op: impl FnOnce(&mut FileData) -> R) -> R {
        let mut inner = self.0.inner_mut();
        match &mut inner.kind {
            ScopeKind::File(data) => op(data),
            _ => unreachable!("a File always wraps a file scope"),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.0
    }

    pub fn name(&self) -> Option<String> {
        self.with_data(|data| data.name.clone())
    }

    pub fn set_name(&self, name: &str) {
        self.with_data(|data| data.name = Some(name.to_string()));
    }

    pub fn add_class(&self, class: &Class) -> Result<()> {
        class.scope().set_parent_scope(&self.0)?;
        self.with_data(|data| {
            if !data.classes.iter().any(|c| c.scope().same(class.scope())) {
                data.classes.push(class.clone());
            }
        });
        Ok(())
    }

    pub fn classes(&self) -> Vec<Class> {
        self.with_data(|data| data.classes.clone())
    }

    /// Renders the whole file: header, dependency imports, type
    /// definitions, functions, classes, then the main statements. Parts are
    /// split by a blank line and the file always ends in a newline.
    pub fn build(&self, backend: &dyn Backend) -> Result<String> {
        let eol = backend.settings().eol.clone();
        let mut code = backend.build_file_header(self);
        let mut split_next_part = false;

        let deps = self.0.dependencies();
        if !deps.is_empty() {
            split_next_part = true;
            for dep in &deps {
                code.push_str(&backend.build_dependency_import(dep));
                code.push_str(&eol);
            }
        }

        let mut split_next_typedef = false;
        for ty in self.0.types() {
            let typedef = backend.build_type_definition(&ty)?;
            if typedef.is_empty() {
                continue;
            }
            if split_next_part || split_next_typedef {
                code.push_str(&eol);
                code.push_str(&eol);
            }
            code.push_str(&typedef);
            code.push_str(backend.end_of_statement());
            split_next_typedef = true;
            split_next_part = true;
        }

        let fns = self.0.fns();
        if !fns.is_empty() {
            if split_next_part {
                code.push_str(&eol);
                code.push_str(&eol);
            }
            split_next_part = true;
            for (index, function) in fns.iter().enumerate() {
                code.push_str(&function.build(backend)?);
                if index < fns.len() - 1 {
                    code.push_str(&eol);
                    code.push_str(&eol);
                }
            }
        }

        let classes = self.classes();
        if !classes.is_empty() {
            if split_next_part {
                code.push_str(&eol);
                code.push_str(&eol);
            }
            split_next_part = true;
            for (index, class) in classes.iter().enumerate() {
                code.push_str(&class.build(backend)?);
                if index < classes.len() - 1 {
                    code.push_str(&eol);
                    code.push_str(&eol);
                }
            }
        }

        let block_code = self.0.build_block_body(backend)?;
        if !block_code.is_empty() {
            if split_next_part {
                code.push_str(&eol);
                code.push_str(&eol);
            }
            code.push_str(&backend.build_main_function(&block_code));
        }

        // Make sure the file ends in a newline
        code.push_str(&eol);
        Ok(code)
    }
}

impl Default for File {
    fn default() -> Self {
        File::new()
    }
}

impl Deref for File {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.0
    }
}
