use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense ordinal of a unit; ids follow ascending source position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub usize);

impl UnitId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural kind of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Function,
    Method,
    /// Class (or Rust type/impl) header; members are separate `Method` units
    Class,
    /// Run of consecutive top-level statements (imports, assignments, ...)
    ModuleStatement,
    /// Whole file kept verbatim because it could not be parsed
    Opaque,
}

impl UnitKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::ModuleStatement => "module",
            Self::Opaque => "opaque",
        }
    }
}

/// How one unit refers to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Function or method call
    Call,
    /// Superclass, implemented trait, or implemented type
    Inherit,
    /// Use of a module-level name, imported name, or type
    Import,
    /// Class header owning a method (graph-only, never declared by the parser)
    Contains,
}

impl ReferenceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Inherit => "inherit",
            Self::Import => "import",
            Self::Contains => "contains",
        }
    }
}

/// Outgoing reference declared by a unit, resolved later by the graph builder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Last path segment (`process` for `self.process()`)
    pub name: String,
    /// Full path when the reference was written qualified (`DataProcessor.process`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified: Option<String>,
    pub kind: ReferenceKind,
}

impl Reference {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            name: name.into(),
            qualified: None,
            kind,
        }
    }

    #[must_use]
    pub fn qualified(mut self, path: impl Into<String>) -> Self {
        self.qualified = Some(path.into());
        self
    }
}

/// Byte and 1-based line range of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }
}

/// A named, contiguous structural span of source code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub name: String,
    pub qualified_name: String,
    /// Owning class header for methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<UnitId>,
    pub span: Span,
    pub text: String,
    pub references: Vec<Reference>,
    /// Names bound at module level by this unit (imports, assignments)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
    /// Closing delimiter line of a container header whose members are
    /// separate units (the `}` of a Rust `impl` or `trait`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing: Option<Span>,
}

impl Unit {
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.span.line_count()
    }

    #[must_use]
    pub fn references_of(&self, kind: ReferenceKind) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(move |r| r.kind == kind)
    }
}
