use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::unit::{Reference, ReferenceKind, Span, Unit, UnitId, UnitKind};
use crate::{python, rust};
use std::collections::HashSet;
use tree_sitter::{Node, Parser};

/// Structural parser producing [`Unit`]s for one source language
pub struct SourceParser {
    language: Language,
    parser: Parser,
}

impl SourceParser {
    pub fn new(language: Language) -> Result<Self> {
        let ts_lang = language.tree_sitter_language()?;

        let mut parser = Parser::new();
        parser
            .set_language(&ts_lang)
            .map_err(|e| ChunkerError::parse_error(format!("Failed to set language: {e}")))?;

        Ok(Self { language, parser })
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Parse source into units ordered by source position.
    ///
    /// Syntactically broken input is not an error: the whole file becomes one
    /// [`UnitKind::Opaque`] unit so callers can still work with it.
    pub fn parse(&mut self, source: &str) -> Result<Vec<Unit>> {
        if source.trim().is_empty() {
            return Err(ChunkerError::EmptyInput);
        }

        let Some(tree) = self.parser.parse(source, None) else {
            log::warn!(
                "tree-sitter produced no tree for {} source, keeping it opaque",
                self.language
            );
            return Ok(vec![whole_file_unit(source, UnitKind::Opaque)]);
        };

        let root = tree.root_node();
        if root.has_error() {
            log::warn!(
                "{} source has syntax errors, keeping it as one opaque unit",
                self.language
            );
            return Ok(vec![whole_file_unit(source, UnitKind::Opaque)]);
        }

        let drafts = match self.language {
            Language::Python => python::extract(root, source),
            Language::Rust => rust::extract(root, source),
            Language::Unknown => {
                return Err(ChunkerError::unsupported_language(self.language.as_str()))
            }
        };

        if drafts.is_empty() {
            return Ok(vec![whole_file_unit(source, UnitKind::ModuleStatement)]);
        }

        let units = finalize(drafts, source);
        log::debug!("Parsed {} {} units", units.len(), self.language);
        Ok(units)
    }
}

/// Parse `source` with a fresh parser
pub fn parse_source(source: &str, language: Language) -> Result<Vec<Unit>> {
    SourceParser::new(language)?.parse(source)
}

fn whole_file_unit(source: &str, kind: UnitKind) -> Unit {
    let lines = LineIndex::new(source);
    Unit {
        id: UnitId(0),
        kind,
        name: "<source>".to_string(),
        qualified_name: "<source>".to_string(),
        parent: None,
        span: Span {
            start_byte: 0,
            end_byte: source.len(),
            start_line: 1,
            end_line: lines.line_of(source.len().saturating_sub(1)),
        },
        text: source.to_string(),
        references: Vec::new(),
        defines: Vec::new(),
        closing: None,
    }
}

/// Unit under construction; `parent` indexes into the draft list
#[derive(Debug)]
pub(crate) struct UnitDraft {
    pub kind: UnitKind,
    pub name: String,
    pub qualified_name: String,
    pub parent: Option<usize>,
    pub start_byte: usize,
    pub end_byte: usize,
    pub references: Vec<Reference>,
    pub defines: Vec<String>,
    /// Byte range of the closing delimiter when members are split out
    pub closing: Option<(usize, usize)>,
}

/// Turn drafts into units: widen spans to line starts, sort, assign ids
pub(crate) fn finalize(drafts: Vec<UnitDraft>, source: &str) -> Vec<Unit> {
    let lines = LineIndex::new(source);

    let mut order: Vec<usize> = (0..drafts.len()).collect();
    order.sort_by_key(|&i| (drafts[i].start_byte, i));

    let mut new_ids = vec![0usize; drafts.len()];
    for (id, &draft_idx) in order.iter().enumerate() {
        new_ids[draft_idx] = id;
    }

    let mut slots: Vec<Option<UnitDraft>> = drafts.into_iter().map(Some).collect();
    let mut units = Vec::with_capacity(slots.len());

    for (id, &draft_idx) in order.iter().enumerate() {
        let Some(draft) = slots[draft_idx].take() else {
            continue;
        };
        let start_byte = widen_to_line_start(source, draft.start_byte);
        let end_byte = draft.end_byte.max(start_byte);
        units.push(Unit {
            id: UnitId(id),
            kind: draft.kind,
            name: draft.name,
            qualified_name: draft.qualified_name,
            parent: draft.parent.map(|p| UnitId(new_ids[p])),
            span: Span {
                start_byte,
                end_byte,
                start_line: lines.line_of(start_byte),
                end_line: lines.line_of(end_byte.saturating_sub(1).max(start_byte)),
            },
            text: source[start_byte..end_byte].to_string(),
            references: draft.references,
            defines: draft.defines,
            closing: draft.closing.map(|(start, end)| {
                let start = widen_to_line_start(source, start);
                Span {
                    start_byte: start,
                    end_byte: end,
                    start_line: lines.line_of(start),
                    end_line: lines.line_of(end.saturating_sub(1).max(start)),
                }
            }),
        });
    }

    units
}

/// Start of the line containing `byte` when only indentation precedes it
fn widen_to_line_start(source: &str, byte: usize) -> usize {
    let line_start = source[..byte].rfind('\n').map_or(0, |pos| pos + 1);
    if source[line_start..byte].chars().all(|c| c == ' ' || c == '\t') {
        line_start
    } else {
        byte
    }
}

pub(crate) struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(pos, _)| pos + 1));
        Self { line_starts }
    }

    /// 1-based line of a byte offset
    pub fn line_of(&self, byte: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= byte).max(1)
    }
}

/// Deduplicating reference collector
#[derive(Default)]
pub(crate) struct RefSink {
    refs: Vec<Reference>,
    seen: HashSet<Reference>,
    skip: HashSet<String>,
}

impl RefSink {
    /// Names that are never recorded as references (own name, receivers, ...)
    pub fn skipping<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, reference: Reference) {
        if reference.name.is_empty() || self.skip.contains(&reference.name) {
            return;
        }
        if self.seen.insert(reference.clone()) {
            self.refs.push(reference);
        }
    }

    pub fn push_name(&mut self, name: &str, kind: ReferenceKind) {
        self.push(Reference::new(name, kind));
    }

    pub fn into_vec(self) -> Vec<Reference> {
        self.refs
    }
}

/// Queue the named children of `node` so they pop in source order
pub(crate) fn push_children<'t>(stack: &mut Vec<Node<'t>>, node: Node<'t>) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    stack.extend(children.into_iter().rev());
}

pub(crate) fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

/// Text of a path expression with all whitespace removed
pub(crate) fn compact_text(node: Node, source: &str) -> String {
    node_text(node, source).split_whitespace().collect()
}

/// Classification of a top-level (or member-level) syntax node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemClass {
    /// Comments and attributes that belong to whatever follows them
    Trivia,
    Definition,
    Statement,
}

/// A definition or a run of plain statements at one nesting level
pub(crate) enum Segment<'t> {
    Definition {
        node: Node<'t>,
        /// Start of adjacent leading comments/attributes, if any
        leading_start: Option<usize>,
    },
    Statements(Vec<Node<'t>>),
}

/// Split the named children of `parent` into definitions and statement runs.
///
/// Trivia directly above a definition (no blank line between) is glued to it;
/// any other trivia joins the surrounding statement run.
pub(crate) fn segment_children<'t>(
    parent: Node<'t>,
    classify: impl Fn(Node<'t>) -> ItemClass,
) -> Vec<Segment<'t>> {
    let mut segments = Vec::new();
    let mut run: Vec<Node<'t>> = Vec::new();
    let mut trivia: Vec<Node<'t>> = Vec::new();

    let mut cursor = parent.walk();
    for child in parent.named_children(&mut cursor) {
        match classify(child) {
            ItemClass::Trivia => trivia.push(child),
            ItemClass::Statement => {
                run.append(&mut trivia);
                run.push(child);
            }
            ItemClass::Definition => {
                let split = glued_trivia_split(&trivia, child.start_position().row);
                let glued: Vec<Node<'t>> = trivia.split_off(split);
                run.append(&mut trivia);
                if !run.is_empty() {
                    segments.push(Segment::Statements(std::mem::take(&mut run)));
                }
                segments.push(Segment::Definition {
                    node: child,
                    leading_start: glued.first().map(Node::start_byte),
                });
            }
        }
    }

    run.append(&mut trivia);
    if !run.is_empty() {
        segments.push(Segment::Statements(run));
    }

    segments
}

/// Index of the first trivia node in the contiguous block ending right above `row`
pub(crate) fn glued_trivia_split(trivia: &[Node], row: usize) -> usize {
    let mut next_row = row;
    let mut split = trivia.len();
    while split > 0 {
        let candidate = trivia[split - 1];
        if candidate.end_position().row + 1 < next_row {
            break;
        }
        next_row = candidate.start_position().row;
        split -= 1;
    }
    split
}
