// SPDX-License-Identifier: MIT OR Apache-2.0
//! The language-neutral file structure.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What kind of element a [`CodeElement`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Free function.
    Function,
    /// Class (or PHP trait).
    Class,
    /// Interface.
    Interface,
    /// Type alias.
    Type,
    /// Module-level binding.
    Variable,
    /// Enum declaration.
    Enum,
    /// Method inside a class.
    Method,
    /// Property / field inside a class.
    Property,
    /// Constructor.
    Constructor,
    /// Getter accessor.
    Getter,
    /// Setter accessor.
    Setter,
}

impl ElementKind {
    /// Kinds that live inside a class's `children` rather than at the top
    /// level.
    #[must_use]
    pub fn is_member(self) -> bool {
        matches!(
            self,
            Self::Method | Self::Property | Self::Constructor | Self::Getter | Self::Setter
        )
    }
}

/// Declared visibility of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible everywhere.
    Public,
    /// Visible only inside the declaring scope.
    Private,
    /// Visible to subclasses.
    Protected,
}

/// One named element of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CodeElement {
    /// Declared name.
    pub name: String,
    /// Element kind.
    pub kind: ElementKind,
    /// 1-based first line of the declaration.
    pub start_line: u32,
    /// 1-based last line of the element body.
    pub end_line: u32,
    /// The declaration line, trimmed.
    pub signature: String,
    /// Adjacent documentation block, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    /// Decorators / annotations attached above the declaration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    /// Modifier keywords (`export`, `static`, `abstract`, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    /// Declared visibility, when the language expresses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Generic parameter list (`<T, U>`), when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_parameters: Option<String>,
    /// Parameter declarations, one entry per parameter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    /// Declared return type, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Nested elements (class members).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CodeElement>,
}

impl CodeElement {
    /// Minimal element with the fields every analyzer fills in.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: ElementKind,
        start_line: u32,
        end_line: u32,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            start_line,
            end_line,
            signature: signature.into(),
            documentation: None,
            decorators: Vec::new(),
            modifiers: Vec::new(),
            visibility: None,
            type_parameters: None,
            parameters: Vec::new(),
            return_type: None,
            children: Vec::new(),
        }
    }
}

/// One import statement with the names it brings into scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImportEntry {
    /// 1-based source line.
    pub line: u32,
    /// The raw import line.
    pub text: String,
    /// Names bound by this import.
    pub names: Vec<String>,
    /// Module / path imported from, when the syntax names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// Uniform summary of a source file, identical across languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileStructure {
    /// Analyzer that produced the structure (empty when none matched).
    pub language: String,
    /// Import statements, in source order.
    pub imports: Vec<ImportEntry>,
    /// Free functions.
    pub functions: Vec<CodeElement>,
    /// Classes with their members as children.
    pub classes: Vec<CodeElement>,
    /// Interfaces.
    pub interfaces: Vec<CodeElement>,
    /// Type aliases.
    pub types: Vec<CodeElement>,
    /// Module-level variables.
    pub variables: Vec<CodeElement>,
    /// Enums.
    pub enums: Vec<CodeElement>,
}

impl FileStructure {
    /// Empty structure tagged with a language name.
    #[must_use]
    pub fn empty(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Whether parsing produced nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.functions.is_empty()
            && self.classes.is_empty()
            && self.interfaces.is_empty()
            && self.types.is_empty()
            && self.variables.is_empty()
            && self.enums.is_empty()
    }

    /// All top-level elements in structural order.
    pub fn top_level(&self) -> impl Iterator<Item = &CodeElement> {
        self.functions
            .iter()
            .chain(&self.classes)
            .chain(&self.interfaces)
            .chain(&self.types)
            .chain(&self.variables)
            .chain(&self.enums)
    }
}
