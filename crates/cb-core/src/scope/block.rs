use std::ops::Deref;

use crate::backend::Backend;
use crate::error::Result;

use super::{BlockData, Scope, ScopeKind};

common_enum! {
    #[derive(Copy, Eq)]
    /// Whether a block surrounds its statements with braces.
    pub enum BracesMode {
        /// Braces appear once the block holds more than one statement
        Auto,
        Always,
        Never,
    }
}

impl Default for BracesMode {
    fn default() -> Self {
        BracesMode::Auto
    }
}

/// A plain code block. Blocks inherit naming from the enclosing file,
/// function or class; a standalone naming block names its own items.
#[derive(Clone)]
pub struct Block(pub(crate) Scope);

impl Block {
    pub fn new() -> Block {
        Block(Scope::new_kind(
            ScopeKind::Block { naming: false },
            Some(BlockData::new(BracesMode::Auto)),
        ))
    }

    /// A block that acts as its own naming scope. Useful for rendering a
    /// snippet of code outside any file or function.
    pub fn naming() -> Block {
        Block(Scope::new_kind(
            ScopeKind::Block { naming: true },
            Some(BlockData::new(BracesMode::Auto)),
        ))
    }

    pub fn scope(&self) -> &Scope {
        &self.0
    }

    pub fn build(&self, backend: &dyn Backend) -> Result<String> {
        self.0.build_block_body(backend)
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::new()
    }
}

impl Deref for Block {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.0
    }
}
