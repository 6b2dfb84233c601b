//! Screen snapshot handed over by the host: a tree of view nodes per window.

use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const AUTOFILL_TYPE_NONE: i32 = 0;
pub const AUTOFILL_TYPE_TEXT: i32 = 1;
pub const AUTOFILL_TYPE_TOGGLE: i32 = 2;
pub const AUTOFILL_TYPE_LIST: i32 = 3;
pub const AUTOFILL_TYPE_DATE: i32 = 4;

/// Host-assigned identifier of a fillable view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AutofillId(pub String);

impl AutofillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AutofillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value currently shown by a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawValue {
    Text(String),
    Toggle(bool),
    /// Selected option index.
    List(usize),
    /// Milliseconds since the epoch.
    Date(i64),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewNode {
    pub autofill_id: Option<AutofillId>,
    pub id_entry: Option<String>,
    /// Placeholder text shown by the view.
    pub hint: Option<String>,
    pub text: Option<String>,
    pub class_name: Option<String>,
    pub autofill_hints: Vec<String>,
    pub autofill_type: i32,
    pub autofill_options: Option<Vec<String>>,
    pub autofill_value: Option<RawValue>,
    pub focused: bool,
    pub web_domain: Option<String>,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    pub fn has_hints(&self) -> bool {
        !self.autofill_hints.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenStructure {
    pub package_name: String,
    #[serde(default)]
    pub windows: Vec<ViewNode>,
}

impl ScreenStructure {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse screen structure")
    }

    /// Depth-first, pre-order walk over every window's view tree.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a ViewNode)) {
        let mut stack: Vec<&ViewNode> = self.windows.iter().rev().collect();
        while let Some(node) = stack.pop() {
            visit(node);
            stack.extend(node.children.iter().rev());
        }
    }

    /// Fallible variant of [`walk`](Self::walk); stops at the first error.
    pub fn try_walk<'a>(&'a self, mut visit: impl FnMut(&'a ViewNode) -> Result<()>) -> Result<()> {
        let mut stack: Vec<&ViewNode> = self.windows.iter().rev().collect();
        while let Some(node) = stack.pop() {
            visit(node)?;
            stack.extend(node.children.iter().rev());
        }
        Ok(())
    }
}
