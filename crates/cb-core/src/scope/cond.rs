use std::cell::RefCell;
use std::rc::Rc;

use crate::backend::Backend;
use crate::error::Result;
use crate::value::Arg;

use super::{Block, Scope};

/// One comparison in an if condition.
#[derive(Clone)]
pub struct Predicate {
    pub left: Arg,
    pub operator: String,
    pub right: Arg,
}

impl Predicate {
    pub fn new(left: impl Into<Arg>, operator: &str, right: impl Into<Arg>) -> Predicate {
        Predicate {
            left: left.into(),
            operator: operator.to_string(),
            right: right.into(),
        }
    }

    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        Ok(format!(
            "{} {} {}",
            self.left.build(scope, backend)?,
            self.operator,
            self.right.build(scope, backend)?
        ))
    }
}

enum PredPart {
    Predicate(Predicate),
    /// Boolean operator joining two predicates (and/or)
    Operator(String),
}

struct IfInner {
    predicates: Vec<PredPart>,
    then_block: Block,
    else_block: Block,
}

/// An if statement with an optional else part. The else part appears in the
/// output only when its block holds any code.
#[derive(Clone)]
pub struct If(Rc<RefCell<IfInner>>);

impl If {
    pub fn new() -> If {
        If(Rc::new(RefCell::new(IfInner {
            predicates: Vec::new(),
            then_block: Block::new(),
            else_block: Block::new(),
        })))
    }

    pub fn same(&self, other: &If) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn add_predicate(&self, predicate: Predicate) -> &If {
        self.0
            .borrow_mut()
            .predicates
            .push(PredPart::Predicate(predicate));
        self
    }

    pub fn add_operator(&self, operator: &str) -> &If {
        self.0
            .borrow_mut()
            .predicates
            .push(PredPart::Operator(operator.to_string()));
        self
    }

    pub fn then_block(&self) -> Block {
        self.0.borrow().then_block.clone()
    }

    pub fn else_block(&self) -> Block {
        self.0.borrow().else_block.clone()
    }

    pub fn build(&self, scope: &Scope, backend: &dyn Backend) -> Result<String> {
        let eol = backend.settings().eol.clone();
        let then_block = self.then_block();
        let else_block = self.else_block();
        let then_code = then_block.build(backend)?;
        let else_code = else_block.build(backend)?;

        if then_code.is_empty() && else_code.is_empty() {
            return Ok(String::new());
        }

        let mut code = String::from("if (");
        for part in &self.0.borrow().predicates {
            match part {
                PredPart::Predicate(predicate) => {
                    code.push_str(&predicate.build(scope, backend)?)
                }
                PredPart::Operator(operator) => {
                    code.push_str(&format!(" {} ", operator));
                }
            }
        }
        code.push(')');
        code.push_str(&eol);

        if then_code.is_empty() {
            // There is an else part, so an empty then part still needs its
            // braces
            code.push('{');
            code.push_str(&eol);
            code.push('}');
        } else if then_block.build_has_braces() {
            code.push_str(&then_code);
        } else {
            code.push_str(&backend.settings().indent(1, &then_code));
        }

        if !else_code.is_empty() {
            code.push_str(&eol);
            code.push_str("else");
            code.push_str(&eol);
            if else_block.build_has_braces() {
                code.push_str(&else_code);
                code.push_str(&eol);
            } else {
                code.push_str(&backend.settings().indent(1, &else_code));
            }
        }

        Ok(code)
    }
}

impl Default for If {
    fn default() -> Self {
        If::new()
    }
}
