//! # HASTE Code Chunker
//!
//! Structural parsing of source files into [`Unit`]s: functions, methods,
//! class headers and runs of module-level statements, each with a byte/line
//! span and the names it references.
//!
//! ## Example
//!
//! ```
//! use haste_code_chunker::{parse_source, Language, UnitKind};
//!
//! let units = parse_source("def add(a, b):\n    return a + b\n", Language::Python).unwrap();
//! assert_eq!(units.len(), 1);
//! assert_eq!(units[0].kind, UnitKind::Function);
//! assert_eq!(units[0].name, "add");
//! ```
//!
//! Input with syntax errors is not rejected; it comes back as a single
//! [`UnitKind::Opaque`] unit covering the whole file.

mod error;
mod language;
mod parser;
mod python;
mod rust;
mod unit;

pub use error::{ChunkerError, Result};
pub use language::Language;
pub use parser::{parse_source, SourceParser};
pub use unit::{Reference, ReferenceKind, Span, Unit, UnitId, UnitKind};
