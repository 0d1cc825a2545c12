use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Text layout configuration. This belongs to a backend, not to the code
/// graph: the same graph can be rendered with different settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// End-of-line sequence used by all rendered output
    pub eol: String,
    /// A single unit of indentation
    pub tab: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            eol: "\n".to_string(),
            tab: "    ".to_string(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Settings> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Settings> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn indent_str(&self, amount: usize) -> String {
        self.tab.repeat(amount)
    }

    /// Indents every non-empty line of `code` by `amount` tab units.
    pub fn indent(&self, amount: usize, code: &str) -> String {
        let prefix = self.indent_str(amount);
        code.split(self.eol.as_str())
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", prefix, line)
                }
            })
            .collect::<Vec<_>>()
            .join(&self.eol)
    }
}

common_enum! {
    /// What happens when a scope that already has a parent is attached to
    /// another one.
    #[derive(Copy, Eq)]
    pub enum ReattachPolicy {
        /// Attaching an already-attached scope is an error
        Forbid,
        /// Detach from the old parent first, then attach to the new one
        Rehome,
    }
}

impl Default for ReattachPolicy {
    fn default() -> Self {
        ReattachPolicy::Forbid
    }
}
